//! Glyph atlas
//!
//! One square coverage mask per byte value (256 glyphs), each
//! `cell_size`x`cell_size`. Masks come from a bitmap atlas image
//! or are rasterized from a TrueType font.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings};
use image::GrayImage;
use log::{debug, info};

/// Number of glyphs (one per byte value)
pub const GLYPH_COUNT: usize = 256;

/// Atlas luma above this value counts as ink
const INK_THRESHOLD: u8 = 127;

/// Coverage masks for all byte values
pub struct GlyphAtlas {
    cell: u32,
    /// GLYPH_COUNT masks of cell*cell bytes, back to back
    masks: Vec<u8>,
}

impl GlyphAtlas {
    /// Atlas with every glyph empty
    pub fn blank(cell: u32) -> Self {
        let len = (cell * cell) as usize * GLYPH_COUNT;
        Self {
            cell,
            masks: vec![0; len],
        }
    }

    /// Build from a closure returning the coverage of (glyph, x, y)
    pub fn from_coverage(cell: u32, mut coverage: impl FnMut(u8, u32, u32) -> u8) -> Self {
        let mut atlas = Self::blank(cell);
        for index in 0..GLYPH_COUNT {
            let base = index * (cell * cell) as usize;
            for y in 0..cell {
                for x in 0..cell {
                    atlas.masks[base + (y * cell + x) as usize] = coverage(index as u8, x, y);
                }
            }
        }
        atlas
    }

    /// Load a bitmap atlas image (glyphs in row-major cell order)
    pub fn from_image(path: &Path, cell: u32) -> Result<Self> {
        let img = image::open(path)
            .with_context(|| format!("Failed to open glyph atlas {}", path.display()))?
            .to_luma8();
        let atlas = Self::from_gray(&img, cell)?;
        info!(
            "Glyph atlas loaded: {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        Ok(atlas)
    }

    /// Slice a grayscale atlas into thresholded masks.
    ///
    /// Glyphs beyond the image's last cell stay blank.
    pub fn from_gray(img: &GrayImage, cell: u32) -> Result<Self> {
        if cell == 0 {
            return Err(anyhow!("cell size must be positive"));
        }
        let cols = img.width() / cell;
        let rows = img.height() / cell;
        if cols == 0 || rows == 0 {
            return Err(anyhow!(
                "atlas {}x{} is smaller than one {}px cell",
                img.width(),
                img.height(),
                cell
            ));
        }
        let available = (cols * rows) as usize;
        if available < GLYPH_COUNT {
            debug!("Atlas holds {} of {} glyphs", available, GLYPH_COUNT);
        }

        Ok(Self::from_coverage(cell, |index, x, y| {
            let index = index as u32;
            if index as usize >= available {
                return 0;
            }
            let px = (index % cols) * cell + x;
            let py = (index / cols) * cell + y;
            if img.get_pixel(px, py).0[0] > INK_THRESHOLD {
                255
            } else {
                0
            }
        }))
    }

    /// Rasterize bytes 0-255 (as Latin-1 code points) from a TrueType font
    pub fn from_font(data: &[u8], cell: u32, size: f32) -> Result<Self> {
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|e| anyhow!("Failed to load font: {}", e))?;
        let metrics = font
            .horizontal_line_metrics(size)
            .ok_or_else(|| anyhow!("Cannot get line metrics"))?;
        let line_height = metrics.ascent - metrics.descent;
        // Center the line box vertically in the cell
        let baseline = ((cell as f32 - line_height) / 2.0 + metrics.ascent).round() as i32;

        let mut atlas = Self::blank(cell);
        for index in 0..GLYPH_COUNT {
            let ch = char::from(index as u8);
            if ch.is_control() {
                continue;
            }
            let (m, bitmap) = font.rasterize(ch, size);
            let left = ((cell as f32 - m.advance_width) / 2.0).round() as i32 + m.xmin;
            let top = baseline - (m.ymin + m.height as i32);
            atlas.blit(index, &bitmap, m.width, m.height, left, top);
        }

        info!(
            "Font rasterized: size={:.1}, ascent={:.1}, descent={:.1}, cell={}",
            size, metrics.ascent, metrics.descent, cell
        );
        Ok(atlas)
    }

    /// Copy a rasterized bitmap into mask `index` at (left, top), clipped to the cell
    fn blit(&mut self, index: usize, bitmap: &[u8], w: usize, h: usize, left: i32, top: i32) {
        let cell = self.cell as i32;
        let base = index * (self.cell * self.cell) as usize;
        for by in 0..h {
            let y = top + by as i32;
            if !(0..cell).contains(&y) {
                continue;
            }
            for bx in 0..w {
                let x = left + bx as i32;
                if !(0..cell).contains(&x) {
                    continue;
                }
                self.masks[base + (y * cell + x) as usize] = bitmap[by * w + bx];
            }
        }
    }

    /// Coverage mask of glyph `index` (row-major, cell*cell bytes)
    pub fn glyph(&self, index: u8) -> &[u8] {
        let len = (self.cell * self.cell) as usize;
        let start = index as usize * len;
        &self.masks[start..start + len]
    }

    pub fn cell_size(&self) -> u32 {
        self.cell
    }
}
