//! Software rendering
//!
//! CPU framebuffer surface and the glyph atlas it draws from.

pub mod framebuffer;
pub mod glyphs;

use std::path::Path;

use anyhow::{Context, Result};
use log::warn;

use crate::config::FontConfig;
use crate::utils::expand_path;

pub use framebuffer::Framebuffer;
pub use glyphs::GlyphAtlas;

/// Load glyphs per font config: bitmap atlas, then TrueType, then blank
pub fn load_atlas(font: &FontConfig, cell: u32) -> Result<GlyphAtlas> {
    if !font.atlas.is_empty() {
        let path = expand_path(&font.atlas);
        return GlyphAtlas::from_image(Path::new(&path), cell);
    }
    if !font.path.is_empty() {
        let path = expand_path(&font.path);
        let data =
            std::fs::read(&path).with_context(|| format!("Failed to read font: {}", path))?;
        return GlyphAtlas::from_font(&data, cell, font.size);
    }
    warn!("No glyph atlas or font configured; text will render blank");
    Ok(GlyphAtlas::blank(cell))
}
