use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Decoded RGBA8 texture. The renderer uploads these; the pipeline only needs
/// dimensions for rect bookkeeping and a flag marking placeholder substitutes.
#[derive(Clone)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
    pub placeholder: bool,
}

impl Texture {
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels: Arc::from(pixels), placeholder: false }
    }
}

/// Path-keyed texture cache. Owned explicitly by the runtime and constructed
/// before any pipeline use; entries are populated lazily on first reference
/// and replaced in place on reload so existing referents pick up the new
/// contents through the same key.
pub struct AssetManager {
    root: PathBuf,
    textures: HashMap<PathBuf, Texture>,
}

impl AssetManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), textures: HashMap::new() }
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.textures.contains_key(&self.resolve(path))
    }

    /// Looks the texture up, loading it on first reference. A missing or
    /// undecodable file is logged and replaced with a placeholder so the rest
    /// of the map still materializes.
    pub fn load_or_get(&mut self, path: &str) -> &Texture {
        let key = self.resolve(path);
        if !self.textures.contains_key(&key) {
            let texture = match Self::decode(&key) {
                Ok(texture) => texture,
                Err(err) => {
                    eprintln!(
                        "[assets] failed to load texture {}: {err:#}. Substituting placeholder.",
                        key.display()
                    );
                    Self::placeholder_texture()
                }
            };
            self.textures.insert(key.clone(), texture);
        }
        &self.textures[&key]
    }

    pub fn get(&self, path: &str) -> Option<&Texture> {
        self.textures.get(&self.resolve(path))
    }

    /// Re-decodes a texture and replaces the cache entry under the same key.
    pub fn reload(&mut self, path: &str) -> Result<()> {
        let key = self.resolve(path);
        let texture =
            Self::decode(&key).with_context(|| format!("Reloading texture {}", key.display()))?;
        self.textures.insert(key, texture);
        Ok(())
    }

    /// Seeds a texture directly, bypassing disk. Tooling and tests use this to
    /// pre-populate the cache.
    pub fn insert_texture(&mut self, path: &str, texture: Texture) {
        let key = self.resolve(path);
        self.textures.insert(key, texture);
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    fn decode(path: &Path) -> Result<Texture> {
        let image = image::open(path).with_context(|| format!("Decoding image {}", path.display()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Texture::from_pixels(width, height, rgba.into_raw()))
    }

    fn placeholder_texture() -> Texture {
        // 2x2 magenta/black checker, the usual "texture missing" marker.
        let magenta = [0xff, 0x00, 0xff, 0xff];
        let black = [0x00, 0x00, 0x00, 0xff];
        let mut pixels = Vec::with_capacity(16);
        pixels.extend_from_slice(&magenta);
        pixels.extend_from_slice(&black);
        pixels.extend_from_slice(&black);
        pixels.extend_from_slice(&magenta);
        Texture { width: 2, height: 2, pixels: Arc::from(pixels), placeholder: true }
    }
}
