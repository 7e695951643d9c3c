pub mod animation;
pub mod assets;
pub mod behavior;
pub mod config;
pub mod ecs;
pub mod runtime;
pub(crate) mod spawn;
pub mod tilemap;
pub mod time;
pub mod units;

pub use runtime::MapRuntime;
