use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub units: UnitsConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    /// Gravity in physics units per second squared. Authoring space is y-down,
    /// so positive y pulls toward the bottom of the map.
    #[serde(default = "PhysicsConfig::default_gravity_x")]
    pub gravity_x: f32,
    #[serde(default = "PhysicsConfig::default_gravity_y")]
    pub gravity_y: f32,
    #[serde(default = "PhysicsConfig::default_fixed_dt")]
    pub fixed_dt: f32,
    /// Cap on accumulated simulation debt before catch-up steps are dropped.
    #[serde(default = "PhysicsConfig::default_max_backlog")]
    pub max_backlog: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnitsConfig {
    #[serde(default = "UnitsConfig::default_pixels_per_meter")]
    pub pixels_per_meter: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnimationConfig {
    /// Speeds at or below this count as standing still.
    #[serde(default = "AnimationConfig::default_idle_epsilon")]
    pub idle_epsilon: f32,
    /// Speeds above this select the "run" class instead of "walk".
    #[serde(default = "AnimationConfig::default_run_threshold")]
    pub run_threshold: f32,
}

impl PhysicsConfig {
    const fn default_gravity_x() -> f32 {
        0.0
    }

    const fn default_gravity_y() -> f32 {
        9.81
    }

    fn default_fixed_dt() -> f32 {
        1.0 / 60.0
    }

    const fn default_max_backlog() -> f32 {
        0.25
    }
}

impl UnitsConfig {
    const fn default_pixels_per_meter() -> f32 {
        32.0
    }
}

impl AnimationConfig {
    const fn default_idle_epsilon() -> f32 {
        0.05
    }

    const fn default_run_threshold() -> f32 {
        3.0
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            units: UnitsConfig::default(),
            animation: AnimationConfig::default(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity_x: Self::default_gravity_x(),
            gravity_y: Self::default_gravity_y(),
            fixed_dt: Self::default_fixed_dt(),
            max_backlog: Self::default_max_backlog(),
        }
    }
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self { pixels_per_meter: Self::default_pixels_per_meter() }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            idle_epsilon: Self::default_idle_epsilon(),
            run_threshold: Self::default_run_threshold(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }
}
