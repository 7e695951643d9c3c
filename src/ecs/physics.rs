use crate::tilemap::{AuthoredCollider, MapObject, ObjectShape};
use crate::units::UnitScale;
use bevy_ecs::prelude::{Component, Entity, Resource};
use glam::Vec2;
use rapier2d::pipeline::ActiveEvents;
use rapier2d::prelude::{
    CCDSolver, Collider, ColliderBuilder, ColliderHandle, ColliderSet, DefaultBroadPhase,
    ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet, NarrowPhase,
    PhysicsPipeline, QueryPipeline, Real, RigidBody, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
    Vector,
};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
}

/// Body creation parameters; `position` is in physics units.
#[derive(Debug, Clone, Copy)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
}

/// A collision shape in physics units, derived once from an authored shape.
/// Center offsets are relative to the owning body's translation. Authored
/// Polygon/Polyline/Point/Text shapes have no runtime counterpart and convert
/// to `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Cuboid { half_extents: Vec2, center: Vec2 },
    Ball { center: Vec2, radius: f32 },
}

impl ColliderShape {
    /// Converts a tile-local authored collider. Offsets are relative to the
    /// tile's top-left corner, which is where tile bodies are placed.
    pub fn from_authored(collider: &AuthoredCollider, scale: UnitScale) -> Option<Self> {
        Self::from_shape(
            collider.shape,
            Vec2::new(collider.x, collider.y),
            Vec2::new(collider.width, collider.height),
            scale,
        )
    }

    /// Converts a free-shape object's own geometry, relative to its top-left
    /// anchor.
    pub fn from_object(object: &MapObject, scale: UnitScale) -> Option<Self> {
        Self::from_shape(object.shape, Vec2::ZERO, Vec2::new(object.width, object.height), scale)
    }

    fn from_shape(shape: ObjectShape, offset_px: Vec2, size_px: Vec2, scale: UnitScale) -> Option<Self> {
        let center = scale.to_physics(offset_px + size_px * 0.5);
        match shape {
            ObjectShape::Rectangle => {
                Some(ColliderShape::Cuboid { half_extents: scale.to_physics(size_px * 0.5), center })
            }
            ObjectShape::Ellipse => {
                // Circle containing the ellipse bounds; the engine has no
                // ellipse primitive.
                let radius = scale.length_to_physics(size_px.x.max(size_px.y) * 0.5);
                Some(ColliderShape::Ball { center, radius })
            }
            ObjectShape::Polygon | ObjectShape::Polyline | ObjectShape::Point | ObjectShape::Text => None,
        }
    }
}

/// Non-owning back-reference to a body owned by `PhysicsWorld`.
#[derive(Component, Clone, Copy)]
pub struct RigidBodyRef {
    pub handle: RigidBodyHandle,
}

#[derive(Resource)]
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    body_entities: HashMap<RigidBodyHandle, Entity>,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec2) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector::new(gravity.x, gravity.y),
            integration_parameters: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            body_entities: HashMap::new(),
        }
    }

    pub fn create_body(&mut self, def: &BodyDef, entity: Entity) -> RigidBodyHandle {
        let builder = match def.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let body = builder.translation(Vector::new(def.position.x, def.position.y)).build();
        let handle = self.bodies.insert(body);
        self.body_entities.insert(handle, entity);
        handle
    }

    /// Attaches one fixture to a body. Sensors report overlap only and never
    /// generate contact response.
    pub fn attach_fixture(
        &mut self,
        body: RigidBodyHandle,
        shape: &ColliderShape,
        density: f32,
        sensor: bool,
    ) -> ColliderHandle {
        let builder = match shape {
            ColliderShape::Cuboid { half_extents, center } => {
                ColliderBuilder::cuboid(half_extents.x, half_extents.y)
                    .translation(Vector::new(center.x, center.y))
            }
            ColliderShape::Ball { center, radius } => {
                ColliderBuilder::ball(*radius).translation(Vector::new(center.x, center.y))
            }
        };
        let collider = builder
            .density(density)
            .restitution(0.0)
            .sensor(sensor)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.colliders.insert_with_parent(collider, body, &mut self.bodies)
    }

    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        let hooks = ();
        let events = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );
        self.query_pipeline.update(&self.colliders);
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|body| {
            let t = body.translation();
            Vec2::new(t.x, t.y)
        })
    }

    pub fn fixtures(&self, handle: RigidBodyHandle) -> Vec<ColliderHandle> {
        self.bodies.get(handle).map(|body| body.colliders().to_vec()).unwrap_or_default()
    }

    pub fn entity_of(&self, handle: RigidBodyHandle) -> Option<Entity> {
        self.body_entities.get(&handle).copied()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.body_entities.remove(&handle);
        let _ = self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    /// Drops every body and fixture. Used on map close; the pipeline and
    /// gravity settings survive.
    pub fn clear(&mut self) {
        self.island_manager = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.query_pipeline = QueryPipeline::new();
        self.body_entities.clear();
    }
}
