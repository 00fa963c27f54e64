//! Sprite store
//!
//! Square cell-sized images uploaded by the server and drawn by id.
//! RGB uploads are expanded to RGBA with pure black as the transparent key.

use std::collections::HashMap;

use log::trace;
use thiserror::Error;

/// Sprite upload errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpriteError {
    /// Pixel data is neither N*N*3 (RGB) nor N*N*4 (RGBA) bytes
    #[error("invalid sprite data: {actual} bytes (expected {rgb} or {rgba})")]
    InvalidLength {
        actual: usize,
        rgb: usize,
        rgba: usize,
    },
}

/// Decoded sprite image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    /// Edge length (pixels)
    pub size: u32,
    /// RGBA pixel data (row-major, 4 bytes/pixel)
    pub data: Vec<u8>,
}

impl Sprite {
    /// Decode raw upload bytes for a `size`x`size` sprite
    pub fn decode(size: u32, raw: &[u8]) -> Result<Self, SpriteError> {
        let pixels = (size as usize) * (size as usize);
        let rgb_len = pixels * 3;
        let rgba_len = pixels * 4;

        let data = if raw.len() == rgb_len {
            rgb_to_rgba_keyed(raw)
        } else if raw.len() == rgba_len {
            raw.to_vec()
        } else {
            return Err(SpriteError::InvalidLength {
                actual: raw.len(),
                rgb: rgb_len,
                rgba: rgba_len,
            });
        };

        Ok(Self { size, data })
    }

    /// RGBA of pixel (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.size + x) * 4) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

/// Convert packed RGB to RGBA; (0,0,0) becomes fully transparent
fn rgb_to_rgba_keyed(data: &[u8]) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(data.len() / 3 * 4);
    for chunk in data.chunks_exact(3) {
        let alpha = if chunk.iter().all(|&c| c == 0) { 0 } else { 255 };
        rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], alpha]);
    }
    rgba
}

/// Sprite registry (id -> sprite)
pub struct SpriteStore {
    sprites: HashMap<u16, Sprite>,
    /// Edge length of every sprite
    size: u32,
}

impl SpriteStore {
    /// Create an empty store for `size`x`size` sprites
    pub fn new(size: u32) -> Self {
        Self {
            sprites: HashMap::new(),
            size,
        }
    }

    /// Decode and store under `id`, replacing any previous sprite.
    /// Nothing is stored on error.
    pub fn set(&mut self, id: u16, raw: &[u8]) -> Result<(), SpriteError> {
        let sprite = Sprite::decode(self.size, raw)?;
        self.sprites.insert(id, sprite);
        trace!("sprite {} stored ({} bytes, {} held)", id, raw.len(), self.sprites.len());
        Ok(())
    }

    /// Get sprite by id
    pub fn get(&self, id: u16) -> Option<&Sprite> {
        self.sprites.get(&id)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
