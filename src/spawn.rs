use crate::assets::AssetManager;
use crate::behavior::{Behavior, BehaviorRegistry, Blackboard};
use crate::ecs::{
    AnimationState, BodyDef, BodyKind, ColliderShape, Kind, MapWorld, Name, ObjectId, PhysicsWorld,
    Properties, RawObject, RigidBodyRef, Sprite, TileRef, Velocity,
};
use crate::tilemap::{
    self, LeafLayer, MapObject, ObjectLayer, PropertyValue, TileLayer, TileMap, EMPTY_TILE,
};
use crate::units::{self, UnitScale};
use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use smallvec::SmallVec;
use std::sync::Arc;

/// Runs the whole map-open pipeline: unpack the layer tree, reserve every
/// authoring identifier, then materialize each leaf layer in order. The
/// reservation pass must complete for all object layers before the first
/// transient spawn; materialization order doubles as draw depth.
pub(crate) fn instantiate_map(
    ecs: &mut MapWorld,
    assets: &mut AssetManager,
    behaviors: &BehaviorRegistry,
    map: &TileMap,
) -> Result<()> {
    let layers = tilemap::unpack_layers(&map.layers);

    for leaf in &layers {
        if let LeafLayer::Objects(layer) = leaf {
            reserve_layer(ecs, layer)
                .with_context(|| format!("Reserving object identifiers of layer '{}'", layer.name))?;
        }
    }

    let scale = *ecs.world.resource::<UnitScale>();
    for (depth, leaf) in layers.iter().enumerate() {
        match leaf {
            LeafLayer::Tiles(layer) => spawn_tile_layer(ecs, assets, map, layer, depth, scale)
                .with_context(|| format!("Materializing tile layer '{}'", layer.name))?,
            LeafLayer::Objects(layer) => {
                spawn_object_layer(ecs, assets, behaviors, map, layer, depth, scale)
                    .with_context(|| format!("Materializing object layer '{}'", layer.name))?
            }
        }
    }
    Ok(())
}

fn reserve_layer(ecs: &mut MapWorld, layer: &ObjectLayer) -> Result<()> {
    for object in &layer.objects {
        ecs.reserve_object_entity(ObjectId(object.id))?;
    }
    Ok(())
}

/// Materializes one tile layer: a transient entity per occupied cell, row by
/// row. Cells are pixel-positioned at their top-left corner; tiles carrying
/// locally authored colliders get a static zero-density body.
fn spawn_tile_layer(
    ecs: &mut MapWorld,
    assets: &mut AssetManager,
    map: &TileMap,
    layer: &TileLayer,
    depth: usize,
    scale: UnitScale,
) -> Result<()> {
    let tile_size = map.tile_size();
    for row in 0..map.height {
        for col in 0..map.width {
            let gid = layer.gid_at(map.width, col, row);
            if gid == EMPTY_TILE {
                continue;
            }
            let (tileset_index, tileset) = map
                .tileset_for_gid(gid)
                .ok_or_else(|| anyhow!("No tileset covers global tile id {gid} at cell ({col}, {row})"))?;
            let local = tileset.local_id(gid);
            let _ = assets.load_or_get(&tileset.image);

            let position = units::cell_origin(col, row, tile_size);
            let entity = ecs
                .world
                .spawn((
                    TileRef { tileset: tileset_index, tile: local },
                    Sprite {
                        texture: tileset.image.clone(),
                        rect: tileset.texture_rect(local),
                        position,
                        depth,
                        visible: layer.visible,
                    },
                ))
                .id();
            if !tileset.animation_frames(local).is_empty() {
                ecs.world.entity_mut(entity).insert(AnimationState::new(local));
            }

            if let Some(def) = tileset.tile(local) {
                if !def.colliders.is_empty() {
                    let shapes: SmallVec<[ColliderShape; 2]> = def
                        .colliders
                        .iter()
                        .filter_map(|collider| ColliderShape::from_authored(collider, scale))
                        .collect();
                    let mut physics = ecs.world.resource_mut::<PhysicsWorld>();
                    let body = physics.create_body(
                        &BodyDef { kind: BodyKind::Static, position: scale.to_physics(position) },
                        entity,
                    );
                    for shape in &shapes {
                        physics.attach_fixture(body, shape, 0.0, false);
                    }
                    ecs.world.entity_mut(entity).insert(RigidBodyRef { handle: body });
                }
            }
        }
    }
    Ok(())
}

/// Populates the pre-reserved entity of every object in a layer. Tile objects
/// become sprites with dynamic solid bodies; free shapes become static sensor
/// volumes with no sprite.
fn spawn_object_layer(
    ecs: &mut MapWorld,
    assets: &mut AssetManager,
    behaviors: &BehaviorRegistry,
    map: &TileMap,
    layer: &ObjectLayer,
    depth: usize,
    scale: UnitScale,
) -> Result<()> {
    for object in &layer.objects {
        let entity = ecs
            .entity_for(ObjectId(object.id))
            .ok_or_else(|| anyhow!("Object {} was never reserved", object.id))?;

        ecs.world.entity_mut(entity).insert(RawObject { record: Arc::new(object.clone()) });

        if behaviors.exists(&object.kind) {
            let mut blackboard = Blackboard::from_properties(&object.properties);
            blackboard.set("name", PropertyValue::String(object.name.clone()));
            blackboard.set("type", PropertyValue::String(object.kind.clone()));
            match behaviors.instantiate(&object.kind, blackboard, entity) {
                Ok(tree) => {
                    ecs.world.entity_mut(entity).insert(Behavior { tree });
                }
                Err(err) => {
                    eprintln!(
                        "[behavior] object {} ('{}'): failed to build tree for type '{}': {err:#}. Continuing without one.",
                        object.id, object.name, object.kind
                    );
                }
            }
        }

        if let Some(gid) = object.gid {
            spawn_tile_object(ecs, assets, map, object, gid, entity, depth, layer.visible, scale)?;
        } else {
            spawn_shape_object(ecs, object, entity, scale);
        }

        ecs.world.entity_mut(entity).insert((
            Name(object.name.clone()),
            Kind(object.kind.clone()),
            Properties(object.properties.clone()),
        ));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn spawn_tile_object(
    ecs: &mut MapWorld,
    assets: &mut AssetManager,
    map: &TileMap,
    object: &MapObject,
    gid: u32,
    entity: bevy_ecs::prelude::Entity,
    depth: usize,
    layer_visible: bool,
    scale: UnitScale,
) -> Result<()> {
    // Tile objects are bottom-left anchored; the authored AABB is not.
    let position = units::tile_object_anchor(
        Vec2::new(object.x, object.y),
        Vec2::new(object.width, object.height),
    );
    let (tileset_index, tileset) = map.tileset_for_gid(gid).ok_or_else(|| {
        anyhow!("Object {} ('{}') references global tile id {gid} not covered by any tileset", object.id, object.name)
    })?;
    let local = tileset.local_id(gid);
    let _ = assets.load_or_get(&tileset.image);

    ecs.world.entity_mut(entity).insert((
        TileRef { tileset: tileset_index, tile: local },
        Sprite {
            texture: tileset.image.clone(),
            rect: tileset.texture_rect(local),
            position,
            depth,
            visible: layer_visible && object.visible,
        },
        Velocity::default(),
        AnimationState::new(local),
    ));

    // Colliders come from the tile itself, tile-relative, and stay solid on a
    // dynamic body.
    let shapes: SmallVec<[ColliderShape; 2]> = tileset
        .tile(local)
        .map(|def| {
            def.colliders
                .iter()
                .filter_map(|collider| ColliderShape::from_authored(collider, scale))
                .collect()
        })
        .unwrap_or_default();
    let mut physics = ecs.world.resource_mut::<PhysicsWorld>();
    let body = physics
        .create_body(&BodyDef { kind: BodyKind::Dynamic, position: scale.to_physics(position) }, entity);
    for shape in &shapes {
        physics.attach_fixture(body, shape, 1.0, false);
    }
    ecs.world.entity_mut(entity).insert(RigidBodyRef { handle: body });
    Ok(())
}

/// Free-shape objects carry no sprite; their own shape becomes the sole
/// collider, a sensor on a static body. This is how trigger volumes are
/// authored.
fn spawn_shape_object(
    ecs: &mut MapWorld,
    object: &MapObject,
    entity: bevy_ecs::prelude::Entity,
    scale: UnitScale,
) {
    let position = Vec2::new(object.x, object.y);
    let shape = ColliderShape::from_object(object, scale);
    let mut physics = ecs.world.resource_mut::<PhysicsWorld>();
    let body = physics
        .create_body(&BodyDef { kind: BodyKind::Static, position: scale.to_physics(position) }, entity);
    if let Some(shape) = shape {
        physics.attach_fixture(body, &shape, 0.0, true);
    }
    ecs.world.entity_mut(entity).insert(RigidBodyRef { handle: body });
}
