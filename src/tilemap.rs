use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Grid cells holding this value are empty; global tile ids start at 1.
pub const EMPTY_TILE: u32 = 0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    #[serde(default)]
    pub tilesets: Vec<Tileset>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    Tiles(TileLayer),
    Objects(ObjectLayer),
    Group(GroupLayer),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub name: String,
    /// Row-major grid of global tile ids, `width * height` entries.
    #[serde(default)]
    pub cells: Vec<u32>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectLayer {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<MapObject>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupLayer {
    pub name: String,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

/// An authored object record. The AABB is pixel-space and top-left anchored,
/// including for tile objects (those are re-anchored during materialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub shape: ObjectShape,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectShape {
    #[default]
    Rectangle,
    Ellipse,
    Polygon,
    Polyline,
    Point,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// Typed custom-property values. `Object` holds a raw authoring identifier;
/// translation to a runtime entity happens on use, not at load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Bool(bool),
    Float(f32),
    Int(i32),
    String(String),
    Object(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tileset {
    pub name: String,
    /// First global tile id of this tileset's contiguous range.
    pub first_gid: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
    pub tile_count: u32,
    pub image: String,
    /// Sparse per-tile metadata, keyed by local id via `TileDef::id`.
    #[serde(default)]
    pub tiles: Vec<TileDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default)]
    pub colliders: Vec<AuthoredCollider>,
    #[serde(default)]
    pub animation: Vec<AnimationFrame>,
}

/// A collision shape authored on a tile, in tile-local pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoredCollider {
    #[serde(default)]
    pub shape: ObjectShape,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationFrame {
    pub tile_id: u32,
    pub duration_ms: u32,
}

/// Pixel-space source rectangle within a tileset image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

const fn default_visible() -> bool {
    true
}

impl TileMap {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("Reading map file {}", path.display()))?;
        let map = serde_json::from_slice::<TileMap>(&bytes)
            .with_context(|| format!("Parsing map file {}", path.display()))?;
        Ok(map)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating map directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json.as_bytes()).with_context(|| format!("Writing map file {}", path.display()))?;
        Ok(())
    }

    /// Finds the tileset covering a global tile id. First match wins; tilesets
    /// are expected to cover disjoint ranges.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<(usize, &Tileset)> {
        self.tilesets.iter().enumerate().find(|(_, ts)| ts.contains(gid))
    }

    pub fn tile_size(&self) -> glam::Vec2 {
        glam::Vec2::new(self.tile_width as f32, self.tile_height as f32)
    }
}

impl Tileset {
    pub fn contains(&self, gid: u32) -> bool {
        gid >= self.first_gid && gid < self.first_gid + self.tile_count
    }

    /// Converts a global tile id into this tileset's local id space.
    /// Caller must have checked `contains` first.
    pub fn local_id(&self, gid: u32) -> u32 {
        gid - self.first_gid
    }

    pub fn tile(&self, local_id: u32) -> Option<&TileDef> {
        self.tiles.iter().find(|def| def.id == local_id)
    }

    pub fn texture_rect(&self, local_id: u32) -> TextureRect {
        let columns = self.columns.max(1);
        TextureRect {
            x: (local_id % columns) * self.tile_width,
            y: (local_id / columns) * self.tile_height,
            width: self.tile_width,
            height: self.tile_height,
        }
    }

    /// Looks up a tile whose authored class tag matches. Used by the
    /// class-driven animation layer; a miss means "keep the previous tile".
    pub fn tile_with_class(&self, class: &str) -> Option<u32> {
        self.tiles.iter().find(|def| def.class.as_deref() == Some(class)).map(|def| def.id)
    }

    pub fn animation_frames(&self, local_id: u32) -> &[AnimationFrame] {
        self.tile(local_id).map(|def| def.animation.as_slice()).unwrap_or(&[])
    }
}

impl TileLayer {
    /// Global tile id at a grid cell, or the empty sentinel for out-of-range
    /// or truncated cell data.
    pub fn gid_at(&self, map_width: u32, col: u32, row: u32) -> u32 {
        if col >= map_width {
            return EMPTY_TILE;
        }
        let index = (row as usize) * (map_width as usize) + col as usize;
        self.cells.get(index).copied().unwrap_or(EMPTY_TILE)
    }

    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|&&gid| gid != EMPTY_TILE).count()
    }
}

impl MapObject {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }
}

/// A leaf layer produced by unpacking the group tree. The position within the
/// unpacked sequence becomes the layer's draw depth.
#[derive(Debug, Clone, Copy)]
pub enum LeafLayer<'a> {
    Tiles(&'a TileLayer),
    Objects(&'a ObjectLayer),
}

/// Flattens the layer-group tree into its leaf layers, depth-first pre-order.
/// Groups are replaced by their children in place; sibling order is preserved
/// at every level, and empty groups contribute nothing.
pub fn unpack_layers(layers: &[Layer]) -> Vec<LeafLayer<'_>> {
    let mut out = Vec::new();
    collect_leaves(layers, &mut out);
    out
}

fn collect_leaves<'a>(layers: &'a [Layer], out: &mut Vec<LeafLayer<'a>>) {
    for layer in layers {
        match layer {
            Layer::Tiles(tiles) => out.push(LeafLayer::Tiles(tiles)),
            Layer::Objects(objects) => out.push(LeafLayer::Objects(objects)),
            Layer::Group(group) => collect_leaves(&group.layers, out),
        }
    }
}
