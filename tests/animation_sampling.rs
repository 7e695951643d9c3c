use glam::Vec2;
use tessera_engine::animation::{motion_class, sample, Facing};
use tessera_engine::assets::Texture;
use tessera_engine::config::RuntimeConfig;
use tessera_engine::ecs::{AnimationState, ObjectId, Sprite};
use tessera_engine::tilemap::{
    AnimationFrame, Layer, MapObject, ObjectLayer, ObjectShape, TileDef, TileLayer, TileMap, Tileset,
};
use tessera_engine::MapRuntime;

fn frames() -> Vec<AnimationFrame> {
    vec![
        AnimationFrame { tile_id: 1, duration_ms: 100 },
        AnimationFrame { tile_id: 2, duration_ms: 200 },
        AnimationFrame { tile_id: 3, duration_ms: 300 },
    ]
}

#[test]
fn sample_selects_frames_by_cumulative_duration() {
    let frames = frames();
    for (elapsed, expected) in [
        (0, 1),
        (99, 1),
        (100, 2),
        (299, 2),
        (300, 3),
        (599, 3),
    ] {
        assert_eq!(sample(&frames, elapsed), Some(expected), "elapsed {elapsed}ms");
    }
}

#[test]
fn sample_wraps_past_the_total_duration() {
    let frames = frames();
    // 650 mod 600 = 50, which lands back on the first frame.
    assert_eq!(sample(&frames, 650), Some(1));
    assert_eq!(sample(&frames, 600), Some(1));
    assert_eq!(sample(&frames, 6_000_599), Some(3));
}

#[test]
fn zero_total_duration_means_no_change() {
    assert_eq!(sample(&[], 250), None);
    let zeroed = vec![
        AnimationFrame { tile_id: 1, duration_ms: 0 },
        AnimationFrame { tile_id: 2, duration_ms: 0 },
    ];
    assert_eq!(sample(&zeroed, 250), None);
}

#[test]
fn motion_class_picks_idle_walk_run_by_speed() {
    assert_eq!(motion_class(0.0, Facing::South, 0.05, 3.0), "idle_s");
    assert_eq!(motion_class(0.04, Facing::East, 0.05, 3.0), "idle_e");
    assert_eq!(motion_class(1.0, Facing::East, 0.05, 3.0), "walk_e");
    assert_eq!(motion_class(3.0, Facing::North, 0.05, 3.0), "walk_n");
    assert_eq!(motion_class(3.5, Facing::West, 0.05, 3.0), "run_w");
}

#[test]
fn facing_follows_the_dominant_velocity_axis() {
    assert_eq!(Facing::from_velocity(Vec2::new(2.0, 1.0)), Some(Facing::East));
    assert_eq!(Facing::from_velocity(Vec2::new(-2.0, 1.0)), Some(Facing::West));
    assert_eq!(Facing::from_velocity(Vec2::new(0.5, 2.0)), Some(Facing::South));
    assert_eq!(Facing::from_velocity(Vec2::new(0.5, -2.0)), Some(Facing::North));
    assert_eq!(Facing::from_velocity(Vec2::ZERO), None, "zero velocity keeps the old facing");
}

// ---------- Tick integration ----------

fn actor_tileset() -> Tileset {
    Tileset {
        name: "actors".to_string(),
        first_gid: 1,
        tile_width: 16,
        tile_height: 16,
        columns: 4,
        tile_count: 12,
        image: "images/actors.png".to_string(),
        tiles: vec![
            TileDef {
                id: 0,
                class: Some("idle_s".to_string()),
                colliders: Vec::new(),
                animation: Vec::new(),
            },
            TileDef {
                id: 1,
                class: Some("walk_s".to_string()),
                colliders: Vec::new(),
                animation: vec![
                    AnimationFrame { tile_id: 1, duration_ms: 100 },
                    AnimationFrame { tile_id: 2, duration_ms: 100 },
                ],
            },
            TileDef {
                id: 4,
                class: None,
                colliders: Vec::new(),
                animation: vec![
                    AnimationFrame { tile_id: 4, duration_ms: 100 },
                    AnimationFrame { tile_id: 5, duration_ms: 100 },
                    AnimationFrame { tile_id: 6, duration_ms: 100 },
                ],
            },
        ],
    }
}

fn animated_map() -> TileMap {
    TileMap {
        width: 2,
        height: 1,
        tile_width: 16,
        tile_height: 16,
        tilesets: vec![actor_tileset()],
        layers: vec![
            Layer::Tiles(TileLayer {
                name: "ground".to_string(),
                // gid 5 -> local tile 4, the three-frame animation.
                cells: vec![5, 0],
                visible: true,
            }),
            Layer::Objects(ObjectLayer {
                name: "actors".to_string(),
                objects: vec![MapObject {
                    id: 1,
                    name: "walker".to_string(),
                    kind: "npc".to_string(),
                    shape: ObjectShape::Rectangle,
                    x: 0.0,
                    y: 16.0,
                    width: 16.0,
                    height: 16.0,
                    gid: Some(1),
                    visible: true,
                    properties: Vec::new(),
                }],
                visible: true,
            }),
        ],
    }
}

fn runtime_with_map() -> MapRuntime {
    let mut runtime = MapRuntime::new(&RuntimeConfig::default(), "assets");
    runtime
        .assets
        .insert_texture("images/actors.png", Texture::from_pixels(64, 48, vec![0; 64 * 48 * 4]));
    runtime.open_map(animated_map()).expect("open animated map");
    runtime
}

fn tile_cell_rect_x(runtime: &mut MapRuntime) -> u32 {
    let world = &mut runtime.ecs.world;
    let mut query = world
        .query_filtered::<&Sprite, (bevy_ecs::prelude::With<AnimationState>, bevy_ecs::prelude::Without<ObjectId>)>();
    let sprites: Vec<_> = query.iter(world).collect();
    assert_eq!(sprites.len(), 1, "exactly one animated tile cell");
    sprites[0].rect.x
}

#[test]
fn animated_tiles_advance_with_elapsed_time() {
    let mut runtime = runtime_with_map();
    // Frame zero (local tile 4 sits at column 0 of row 1).
    assert_eq!(tile_cell_rect_x(&mut runtime), 0);

    runtime.update(0.15);
    // 150ms into a 100ms/frame loop: second frame, local tile 5, column 1.
    assert_eq!(tile_cell_rect_x(&mut runtime), 16);

    runtime.update(0.1);
    // 250ms: third frame, local tile 6, column 2.
    assert_eq!(tile_cell_rect_x(&mut runtime), 32);

    runtime.update(0.1);
    // 350ms wraps back to the first frame.
    assert_eq!(tile_cell_rect_x(&mut runtime), 0);
}

#[test]
fn resampling_the_same_elapsed_time_reproduces_the_frame() {
    // Elapsed wall time alone decides the frame, so one big step and many
    // small ones land on the same rect.
    let mut coarse = runtime_with_map();
    coarse.update(0.55);
    let coarse_rect = tile_cell_rect_x(&mut coarse);

    let mut fine = runtime_with_map();
    for _ in 0..11 {
        fine.update(0.05);
    }
    assert_eq!(tile_cell_rect_x(&mut fine), coarse_rect);
}

#[test]
fn velocity_classes_reselect_the_base_tile() {
    let mut runtime = runtime_with_map();
    let walker = runtime.ecs.entity_for(ObjectId(1)).expect("walker reserved");

    // Standing still: the idle_s tile.
    runtime.update(0.01);
    let state = runtime.ecs.world.get::<AnimationState>(walker).expect("state");
    assert_eq!(state.class, "idle_s");
    assert_eq!(state.base_tile, 0);

    // Walking south: the walk_s tile, which is itself frame-animated.
    runtime.ecs.set_velocity(walker, Vec2::new(0.0, 1.0));
    runtime.update(0.01);
    let state = runtime.ecs.world.get::<AnimationState>(walker).expect("state");
    assert_eq!(state.class, "walk_s");
    assert_eq!(state.base_tile, 1);

    // Running east: no run_e tile is authored, so the base tile is retained
    // while the class string still updates.
    runtime.ecs.set_velocity(walker, Vec2::new(5.0, 0.0));
    runtime.update(0.01);
    let state = runtime.ecs.world.get::<AnimationState>(walker).expect("state");
    assert_eq!(state.class, "run_e");
    assert_eq!(state.base_tile, 1);
}
