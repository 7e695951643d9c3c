use glam::Vec2;
use tessera_engine::assets::Texture;
use tessera_engine::config::RuntimeConfig;
use tessera_engine::ecs::{ColliderShape, ObjectId, RigidBodyRef, Sprite};
use tessera_engine::tilemap::{
    AuthoredCollider, Layer, MapObject, ObjectLayer, ObjectShape, TileDef, TileLayer, TileMap, Tileset,
};
use tessera_engine::units::UnitScale;
use tessera_engine::MapRuntime;

const PPM: f32 = 32.0;

fn crate_tileset() -> Tileset {
    Tileset {
        name: "crates".to_string(),
        first_gid: 1,
        tile_width: 32,
        tile_height: 32,
        columns: 2,
        tile_count: 4,
        image: "images/crates.png".to_string(),
        tiles: vec![
            // Tile 0: two authored collider shapes.
            TileDef {
                id: 0,
                class: None,
                colliders: vec![
                    AuthoredCollider {
                        shape: ObjectShape::Rectangle,
                        x: 0.0,
                        y: 16.0,
                        width: 32.0,
                        height: 16.0,
                    },
                    AuthoredCollider {
                        shape: ObjectShape::Ellipse,
                        x: 8.0,
                        y: 0.0,
                        width: 16.0,
                        height: 16.0,
                    },
                ],
                animation: Vec::new(),
            },
            // Tile 1: a single full-square collider.
            TileDef {
                id: 1,
                class: None,
                colliders: vec![AuthoredCollider {
                    shape: ObjectShape::Rectangle,
                    x: 0.0,
                    y: 0.0,
                    width: 32.0,
                    height: 32.0,
                }],
                animation: Vec::new(),
            },
            // Tile 2: only an unsupported shape.
            TileDef {
                id: 2,
                class: None,
                colliders: vec![AuthoredCollider {
                    shape: ObjectShape::Polygon,
                    x: 0.0,
                    y: 0.0,
                    width: 32.0,
                    height: 32.0,
                }],
                animation: Vec::new(),
            },
        ],
    }
}

fn object(id: u32, shape: ObjectShape, gid: Option<u32>) -> MapObject {
    MapObject {
        id,
        name: format!("object-{id}"),
        kind: String::new(),
        shape,
        x: 64.0,
        y: 96.0,
        width: 32.0,
        height: 32.0,
        gid,
        visible: true,
        properties: Vec::new(),
    }
}

fn map_with_objects(objects: Vec<MapObject>) -> TileMap {
    TileMap {
        width: 4,
        height: 4,
        tile_width: 32,
        tile_height: 32,
        tilesets: vec![crate_tileset()],
        layers: vec![Layer::Objects(ObjectLayer {
            name: "volumes".to_string(),
            objects,
            visible: true,
        })],
    }
}

fn runtime_with(map: TileMap) -> MapRuntime {
    let mut runtime = MapRuntime::new(&RuntimeConfig::default(), "assets");
    runtime
        .assets
        .insert_texture("images/crates.png", Texture::from_pixels(64, 64, vec![0; 64 * 64 * 4]));
    runtime.open_map(map).expect("open map");
    runtime
}

fn body_of(runtime: &MapRuntime, id: u32) -> RigidBodyRef {
    let entity = runtime.ecs.entity_for(ObjectId(id)).expect("reserved entity");
    *runtime.ecs.world.get::<RigidBodyRef>(entity).expect("body reference")
}

#[test]
fn free_rectangle_objects_become_static_sensor_boxes() {
    let runtime = runtime_with(map_with_objects(vec![object(1, ObjectShape::Rectangle, None)]));
    let body_ref = body_of(&runtime, 1);
    let physics = runtime.ecs.physics();

    let body = physics.body(body_ref.handle).expect("body");
    assert!(body.is_fixed(), "free shapes are static volumes");

    let fixtures = physics.fixtures(body_ref.handle);
    assert_eq!(fixtures.len(), 1, "exactly one fixture from the object's own shape");
    let collider = physics.collider(fixtures[0]).expect("collider");
    assert!(collider.is_sensor(), "trigger volumes never collide");
    let cuboid = collider.shape().as_cuboid().expect("box shape");
    assert!((cuboid.half_extents.x - 16.0 / PPM).abs() < 1.0e-6);
    assert!((cuboid.half_extents.y - 16.0 / PPM).abs() < 1.0e-6);
}

#[test]
fn free_ellipse_objects_become_sensor_circles() {
    let runtime = runtime_with(map_with_objects(vec![object(1, ObjectShape::Ellipse, None)]));
    let body_ref = body_of(&runtime, 1);
    let physics = runtime.ecs.physics();

    let fixtures = physics.fixtures(body_ref.handle);
    assert_eq!(fixtures.len(), 1);
    let collider = physics.collider(fixtures[0]).expect("collider");
    assert!(collider.is_sensor());
    let ball = collider.shape().as_ball().expect("circle shape");
    assert!((ball.radius - 16.0 / PPM).abs() < 1.0e-6);
}

#[test]
fn unsupported_free_shapes_yield_a_body_with_zero_fixtures() {
    let runtime = runtime_with(map_with_objects(vec![object(1, ObjectShape::Polygon, None)]));
    let body_ref = body_of(&runtime, 1);
    assert!(runtime.ecs.physics().fixtures(body_ref.handle).is_empty());
}

#[test]
fn tile_objects_get_one_dynamic_body_with_the_tiles_solid_fixtures() {
    // gid 1 resolves to tile 0, which authors two collider shapes.
    let runtime = runtime_with(map_with_objects(vec![object(7, ObjectShape::Rectangle, Some(1))]));
    let body_ref = body_of(&runtime, 7);
    let physics = runtime.ecs.physics();

    let body = physics.body(body_ref.handle).expect("body");
    assert!(body.is_dynamic(), "tile objects simulate");

    let fixtures = physics.fixtures(body_ref.handle);
    assert_eq!(fixtures.len(), 2, "one fixture per authored shape");
    for handle in fixtures {
        let collider = physics.collider(handle).expect("collider");
        assert!(!collider.is_sensor(), "tile colliders are solid");
    }
}

#[test]
fn tile_object_anchor_shifts_the_sprite_up_by_its_height() {
    // Authored top = 96, height = 32: the effective sprite top is 64.
    let runtime = runtime_with(map_with_objects(vec![object(7, ObjectShape::Rectangle, Some(2))]));
    let entity = runtime.ecs.entity_for(ObjectId(7)).expect("entity");
    let sprite = runtime.ecs.world.get::<Sprite>(entity).expect("sprite");
    assert_eq!(sprite.position, Vec2::new(64.0, 64.0));
}

#[test]
fn anchor_correction_matches_the_reference_numbers() {
    let anchored =
        tessera_engine::units::tile_object_anchor(Vec2::new(10.0, 50.0), Vec2::new(8.0, 20.0));
    assert_eq!(anchored, Vec2::new(10.0, 30.0));
}

#[test]
fn tile_cells_with_colliders_get_static_zero_density_bodies() {
    let map = TileMap {
        width: 2,
        height: 1,
        tile_width: 32,
        tile_height: 32,
        tilesets: vec![crate_tileset()],
        layers: vec![Layer::Tiles(TileLayer {
            name: "walls".to_string(),
            // gid 2 -> tile 1 (has a collider); gid 4 -> tile 3 (no metadata).
            cells: vec![2, 4],
            visible: true,
        })],
    };
    let mut runtime = runtime_with(map);

    let world = &mut runtime.ecs.world;
    let mut with_bodies = Vec::new();
    let mut without_bodies = 0;
    {
        let mut query = world.query::<(&Sprite, Option<&RigidBodyRef>)>();
        for (sprite, body) in query.iter(world) {
            match body {
                Some(body) => with_bodies.push((sprite.position, *body)),
                None => without_bodies += 1,
            }
        }
    }
    assert_eq!(with_bodies.len(), 1, "only the collider-carrying tile gets a body");
    assert_eq!(without_bodies, 1);

    let (position, body_ref) = with_bodies[0];
    assert_eq!(position, Vec2::ZERO);
    let physics = runtime.ecs.physics();
    let body = physics.body(body_ref.handle).expect("body");
    assert!(body.is_fixed(), "tile-layer colliders are static");
    // Cell position passes through the pixel-to-physics scale.
    let translation = physics.body_translation(body_ref.handle).expect("translation");
    assert_eq!(translation, Vec2::ZERO);

    let fixtures = physics.fixtures(body_ref.handle);
    assert_eq!(fixtures.len(), 1);
    let collider = physics.collider(fixtures[0]).expect("collider");
    assert!(!collider.is_sensor());
    assert_eq!(collider.density(), 0.0);
    assert_eq!(collider.restitution(), 0.0);
}

#[test]
fn unsupported_tile_collider_shapes_drop_to_zero_fixtures() {
    let map = TileMap {
        width: 1,
        height: 1,
        tile_width: 32,
        tile_height: 32,
        tilesets: vec![crate_tileset()],
        layers: vec![Layer::Tiles(TileLayer {
            name: "walls".to_string(),
            // gid 3 -> tile 2, whose only collider is a polygon.
            cells: vec![3],
            visible: true,
        })],
    };
    let mut runtime = runtime_with(map);

    let world = &mut runtime.ecs.world;
    let mut query = world.query::<&RigidBodyRef>();
    let bodies: Vec<_> = query.iter(world).copied().collect();
    assert_eq!(bodies.len(), 1, "the authored collider list still creates the body");
    assert!(runtime.ecs.physics().fixtures(bodies[0].handle).is_empty());
}

#[test]
fn authored_shapes_convert_into_physics_units() {
    let scale = UnitScale::new(PPM);
    let authored = AuthoredCollider {
        shape: ObjectShape::Rectangle,
        x: 0.0,
        y: 16.0,
        width: 32.0,
        height: 16.0,
    };
    let shape = ColliderShape::from_authored(&authored, scale).expect("supported shape");
    match shape {
        ColliderShape::Cuboid { half_extents, center } => {
            assert_eq!(half_extents, Vec2::new(16.0 / PPM, 8.0 / PPM));
            assert_eq!(center, Vec2::new(16.0 / PPM, 24.0 / PPM));
        }
        other => panic!("expected a cuboid, got {other:?}"),
    }

    let polygon = AuthoredCollider { shape: ObjectShape::Polyline, x: 0.0, y: 0.0, width: 8.0, height: 8.0 };
    assert!(ColliderShape::from_authored(&polygon, scale).is_none());
}

#[test]
fn dynamic_bodies_write_their_transform_back_to_sprites() {
    // A falling crate: gid 2 -> tile 1, solid collider, dynamic body.
    let mut runtime = runtime_with(map_with_objects(vec![object(3, ObjectShape::Rectangle, Some(2))]));
    let entity = runtime.ecs.entity_for(ObjectId(3)).expect("entity");
    let start = runtime.ecs.world.get::<Sprite>(entity).expect("sprite").position;

    for _ in 0..30 {
        runtime.update(1.0 / 60.0);
    }
    let end = runtime.ecs.world.get::<Sprite>(entity).expect("sprite").position;
    assert!(end.y > start.y, "gravity pulls the sprite down in y-down space ({start} -> {end})");
    assert_eq!(end.x, start.x);
}
