use bevy_ecs::prelude::Resource;
use glam::Vec2;

/// Fixed scale between pixel-space authoring data and physics units. Sprite
/// placement stays in pixels; everything handed to the physics engine goes
/// through this converter exactly once.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct UnitScale {
    pixels_per_meter: f32,
}

impl UnitScale {
    pub fn new(pixels_per_meter: f32) -> Self {
        Self { pixels_per_meter: pixels_per_meter.max(f32::EPSILON) }
    }

    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    pub fn to_physics(&self, pixels: Vec2) -> Vec2 {
        pixels / self.pixels_per_meter
    }

    pub fn to_pixels(&self, meters: Vec2) -> Vec2 {
        meters * self.pixels_per_meter
    }

    pub fn length_to_physics(&self, pixels: f32) -> f32 {
        pixels / self.pixels_per_meter
    }

    pub fn length_to_pixels(&self, meters: f32) -> f32 {
        meters * self.pixels_per_meter
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::new(crate::config::UnitsConfig::default().pixels_per_meter)
    }
}

/// Pixel position of a grid cell's top-left corner.
pub fn cell_origin(col: u32, row: u32, tile_size: Vec2) -> Vec2 {
    Vec2::new(col as f32 * tile_size.x, row as f32 * tile_size.y)
}

/// Re-anchors a tile object's authored AABB. Tile objects are bottom-left
/// anchored while the AABB is authored top-left, so the effective top shifts
/// up by the object's height.
pub fn tile_object_anchor(authored_top_left: Vec2, size: Vec2) -> Vec2 {
    Vec2::new(authored_top_left.x, authored_top_left.y - size.y)
}
