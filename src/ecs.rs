use crate::animation::{self, Facing};
use crate::config::RuntimeConfig;
use crate::tilemap::{MapObject, Property, TextureRect, TileMap};
use crate::units::UnitScale;
use anyhow::{anyhow, Result};
use bevy_ecs::prelude::*;
use glam::Vec2;
use std::collections::HashMap;
use std::sync::Arc;

pub mod physics;

pub use physics::{BodyDef, BodyKind, ColliderShape, PhysicsWorld, RigidBodyRef};

// ---------- Components ----------

/// Stable identifier assigned to an object by the map editor.
#[derive(Component, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ObjectId(pub u32);

/// Resolved tile reference: tileset index within the active map plus the
/// tileset-local tile id. Immutable once attached.
#[derive(Component, Clone, Copy, PartialEq, Eq, Debug)]
pub struct TileRef {
    pub tileset: usize,
    pub tile: u32,
}

#[derive(Component, Clone, Debug)]
pub struct Sprite {
    /// Texture cache key; the path the tileset image was loaded under.
    pub texture: String,
    pub rect: TextureRect,
    /// Pixel-space top-left of the sprite.
    pub position: Vec2,
    /// Draw order; the unpacked layer index.
    pub depth: usize,
    pub visible: bool,
}

#[derive(Component, Clone, Copy, Default, Debug)]
pub struct Velocity(pub Vec2);

#[derive(Component, Clone, Debug)]
pub struct Name(pub String);

/// The object's authored type string. Drives behavior-tree selection and
/// general queries.
#[derive(Component, Clone, Debug)]
pub struct Kind(pub String);

/// Ordered property bag copied from the authoring record.
#[derive(Component, Clone, Debug, Default)]
pub struct Properties(pub Vec<Property>);

/// Read-only reference to the raw authoring record, kept for diagnostics and
/// patching tools.
#[derive(Component, Clone)]
pub struct RawObject {
    pub record: Arc<MapObject>,
}

/// Time-varying animation bookkeeping, advanced every tick.
#[derive(Component, Clone, Debug)]
pub struct AnimationState {
    /// Wall-clock seconds accumulated since attach; frame selection depends
    /// only on this value.
    pub elapsed: f64,
    pub class: String,
    pub facing: Facing,
    /// Class-selected tile the frame sampler runs on top of.
    pub base_tile: u32,
    /// Tile currently displayed.
    pub resolved_tile: u32,
}

impl AnimationState {
    pub fn new(base_tile: u32) -> Self {
        Self {
            elapsed: 0.0,
            class: String::new(),
            facing: Facing::default(),
            base_tile,
            resolved_tile: base_tile,
        }
    }
}

/// Deferred-destroy mark; an external collaborator consumes it at a safe
/// point via `MapWorld::drain_despawns`.
#[derive(Component, Clone, Copy, Default)]
pub struct PendingDespawn;

// ---------- Resources ----------

#[derive(Resource, Clone, Copy)]
pub struct TimeDelta(pub f32);

#[derive(Resource, Clone, Copy)]
pub struct AnimationSettings {
    pub idle_epsilon: f32,
    pub run_threshold: f32,
}

/// The currently open map, shared with the per-tick systems.
#[derive(Resource, Clone)]
pub struct ActiveMap(pub Arc<TileMap>);

// ---------- World container ----------

pub struct MapWorld {
    pub world: World,
    schedule_var: Schedule,
    schedule_fixed: Schedule,
    authoring: HashMap<ObjectId, Entity>,
}

impl MapWorld {
    pub fn new(config: &RuntimeConfig) -> Self {
        let mut world = World::new();
        world.insert_resource(TimeDelta(0.0));
        world.insert_resource(UnitScale::new(config.units.pixels_per_meter));
        world.insert_resource(AnimationSettings {
            idle_epsilon: config.animation.idle_epsilon,
            run_threshold: config.animation.run_threshold,
        });
        world.insert_resource(PhysicsWorld::new(Vec2::new(
            config.physics.gravity_x,
            config.physics.gravity_y,
        )));

        let mut schedule_var = Schedule::default();
        schedule_var.add_systems(sys_advance_animations);

        let mut schedule_fixed = Schedule::default();
        schedule_fixed.add_systems((sys_step_physics, sys_sync_bodies).chain());

        Self { world, schedule_var, schedule_fixed, authoring: HashMap::new() }
    }

    pub fn update(&mut self, dt: f32) {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        self.schedule_var.run(&mut self.world);
    }

    pub fn fixed_step(&mut self, dt: f32) {
        self.world.resource_mut::<TimeDelta>().0 = dt;
        self.schedule_fixed.run(&mut self.world);
    }

    /// Reserves a live, empty entity for an authoring identifier. Every
    /// reservation must happen before any transient spawn of the same load,
    /// so a transient entity can never alias a pending identifier. A
    /// duplicate identifier, or one leaked from a prior load, is a
    /// data-integrity violation.
    pub fn reserve_object_entity(&mut self, id: ObjectId) -> Result<Entity> {
        if self.authoring.contains_key(&id) {
            return Err(anyhow!("Authoring identifier {} is already reserved", id.0));
        }
        let entity = self.world.spawn(id).id();
        self.authoring.insert(id, entity);
        Ok(entity)
    }

    pub fn entity_for(&self, id: ObjectId) -> Option<Entity> {
        self.authoring.get(&id).copied()
    }

    pub fn reserved_ids(&self) -> impl Iterator<Item = (ObjectId, Entity)> + '_ {
        self.authoring.iter().map(|(&id, &entity)| (id, entity))
    }

    pub fn reserved_count(&self) -> usize {
        self.authoring.len()
    }

    pub fn valid(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    pub fn live_entity_count(&self) -> usize {
        self.world.entities().len() as usize
    }

    pub fn attach_map(&mut self, map: Arc<TileMap>) {
        self.world.insert_resource(ActiveMap(map));
    }

    /// Destroys every map entity en masse and resets the physics and
    /// authoring bookkeeping. Resources and registered systems survive.
    pub fn clear_map_entities(&mut self) {
        self.world.clear_entities();
        self.world.remove_resource::<ActiveMap>();
        self.world.resource_mut::<PhysicsWorld>().clear();
        self.authoring.clear();
    }

    pub fn mark_for_despawn(&mut self, entity: Entity) -> bool {
        if self.valid(entity) {
            self.world.entity_mut(entity).insert(PendingDespawn);
            true
        } else {
            false
        }
    }

    /// Consumes deferred-destroy marks: removes the physics body, drops the
    /// authoring-index entry and despawns. Returns the destroyed entities.
    pub fn drain_despawns(&mut self) -> Vec<Entity> {
        let marked: Vec<(Entity, Option<RigidBodyRef>, Option<ObjectId>)> = {
            let mut query = self
                .world
                .query_filtered::<(Entity, Option<&RigidBodyRef>, Option<&ObjectId>), With<PendingDespawn>>();
            query.iter(&self.world).map(|(e, body, id)| (e, body.copied(), id.copied())).collect()
        };
        let mut out = Vec::with_capacity(marked.len());
        for (entity, body, id) in marked {
            if let Some(body) = body {
                self.world.resource_mut::<PhysicsWorld>().remove_body(body.handle);
            }
            if let Some(id) = id {
                self.authoring.remove(&id);
            }
            self.world.despawn(entity);
            out.push(entity);
        }
        out
    }

    pub fn physics(&self) -> &PhysicsWorld {
        self.world.resource::<PhysicsWorld>()
    }

    pub fn physics_mut(&mut self) -> Mut<'_, PhysicsWorld> {
        self.world.resource_mut::<PhysicsWorld>()
    }

    /// Sets an entity's velocity, mirroring it onto the physics body when one
    /// is attached.
    pub fn set_velocity(&mut self, entity: Entity, velocity: Vec2) -> bool {
        let Some(mut component) = self.world.get_mut::<Velocity>(entity) else {
            return false;
        };
        component.0 = velocity;
        if let Some(body_ref) = self.world.get::<RigidBodyRef>(entity).copied() {
            if let Some(body) = self.world.resource_mut::<PhysicsWorld>().body_mut(body_ref.handle) {
                body.set_linvel(rapier2d::prelude::Vector::new(velocity.x, velocity.y), true);
            }
        }
        true
    }
}

// ---------- Systems ----------

/// Advances animation clocks and re-resolves displayed tiles. The class layer
/// only applies to entities carrying a `Velocity`; a class with no matching
/// tile keeps the previous base.
fn sys_advance_animations(
    map: Option<Res<ActiveMap>>,
    dt: Res<TimeDelta>,
    settings: Res<AnimationSettings>,
    mut query: Query<(&TileRef, &mut AnimationState, &mut Sprite, Option<&Velocity>)>,
) {
    let Some(map) = map else {
        return;
    };
    for (tile_ref, mut state, mut sprite, velocity) in &mut query {
        let Some(tileset) = map.0.tilesets.get(tile_ref.tileset) else {
            continue;
        };
        state.elapsed += f64::from(dt.0);
        if let Some(velocity) = velocity {
            if let Some(facing) = Facing::from_velocity(velocity.0) {
                state.facing = facing;
            }
            let class = animation::motion_class(
                velocity.0.length(),
                state.facing,
                settings.idle_epsilon,
                settings.run_threshold,
            );
            if class != state.class {
                if let Some(base) = tileset.tile_with_class(&class) {
                    state.base_tile = base;
                }
                state.class = class;
            }
        }
        let elapsed_ms = (state.elapsed * 1000.0) as u64;
        let resolved =
            animation::sample(tileset.animation_frames(state.base_tile), elapsed_ms).unwrap_or(state.base_tile);
        if resolved != state.resolved_tile {
            state.resolved_tile = resolved;
            sprite.rect = tileset.texture_rect(resolved);
        }
    }
}

fn sys_step_physics(mut physics: ResMut<PhysicsWorld>, dt: Res<TimeDelta>) {
    physics.step(dt.0);
}

/// Mirrors dynamic body transforms back onto sprites and velocities. Runs
/// after the step, so readers only ever observe completed states.
fn sys_sync_bodies(
    physics: Res<PhysicsWorld>,
    scale: Res<UnitScale>,
    mut query: Query<(&RigidBodyRef, Option<&mut Sprite>, Option<&mut Velocity>)>,
) {
    for (body_ref, sprite, velocity) in &mut query {
        let Some(body) = physics.body(body_ref.handle) else {
            continue;
        };
        if !body.is_dynamic() {
            continue;
        }
        let translation = body.translation();
        if let Some(mut sprite) = sprite {
            sprite.position = scale.to_pixels(Vec2::new(translation.x, translation.y));
        }
        if let Some(mut velocity) = velocity {
            let linvel = body.linvel();
            velocity.0 = Vec2::new(linvel.x, linvel.y);
        }
    }
}
