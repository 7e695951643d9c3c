use crate::assets::AssetManager;
use crate::behavior::BehaviorRegistry;
use crate::config::RuntimeConfig;
use crate::ecs::MapWorld;
use crate::spawn;
use crate::tilemap::TileMap;
use crate::time::FixedStepper;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Owns the whole pipeline: world, texture cache, behavior registry and the
/// fixed-step clock. Map open/close are run-to-completion; a failed open
/// tears its partial state back down before returning.
pub struct MapRuntime {
    pub ecs: MapWorld,
    pub assets: AssetManager,
    pub behaviors: BehaviorRegistry,
    stepper: FixedStepper,
    map: Option<Arc<TileMap>>,
}

impl MapRuntime {
    pub fn new(config: &RuntimeConfig, asset_root: impl Into<PathBuf>) -> Self {
        Self {
            ecs: MapWorld::new(config),
            assets: AssetManager::new(asset_root),
            behaviors: BehaviorRegistry::new(),
            stepper: FixedStepper::new(config.physics.fixed_dt, config.physics.max_backlog),
            map: None,
        }
    }

    pub fn open_map_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let map = TileMap::load_from_path(path)?;
        self.open_map(map)
    }

    /// Instantiates a map into the world. Only one map may be open at a time;
    /// close the previous one first.
    pub fn open_map(&mut self, map: TileMap) -> Result<()> {
        if self.map.is_some() {
            return Err(anyhow!("A map is already open; close it before opening another"));
        }
        let map = Arc::new(map);
        if let Err(err) = spawn::instantiate_map(&mut self.ecs, &mut self.assets, &self.behaviors, &map) {
            // A failed open must not leave partially materialized state behind.
            self.ecs.clear_map_entities();
            return Err(err);
        }
        self.ecs.attach_map(Arc::clone(&map));
        self.map = Some(map);
        self.stepper.reset();
        Ok(())
    }

    /// Destroys every map entity en masse. Safe to call with no map open.
    pub fn close_map(&mut self) {
        self.ecs.clear_map_entities();
        self.map = None;
        self.stepper.reset();
    }

    pub fn map(&self) -> Option<&Arc<TileMap>> {
        self.map.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.map.is_some()
    }

    /// Per-frame update: variable-rate animation first, then however many
    /// fixed physics steps the accumulator yields.
    pub fn update(&mut self, dt: f32) {
        self.ecs.update(dt);
        if let Some(dropped) = self.stepper.advance(dt) {
            eprintln!("[runtime] dropping {dropped:.3}s of physics backlog");
        }
        while let Some(step) = self.stepper.pop_step() {
            self.ecs.fixed_step(step);
        }
    }
}
