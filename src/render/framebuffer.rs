//! Software framebuffer
//!
//! RGBA8 pixel buffer implementing [`DisplaySurface`]. Glyph masks are
//! blended between the current background and foreground colors,
//! sprites are alpha composited.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, trace};

use crate::terminal::sprite::Sprite;
use crate::terminal::surface::DisplaySurface;
use crate::utils::Rgb;

use super::glyphs::GlyphAtlas;

/// Cell remembered while shown inverted
struct SavedCell {
    x: u32,
    y: u32,
    size: u32,
    pixels: Vec<u8>,
}

pub struct Framebuffer {
    width: u32,
    height: u32,
    /// RGBA, row-major
    pixels: Vec<u8>,
    atlas: GlyphAtlas,
    fg: Rgb,
    bg: Rgb,
    inverted: Option<SavedCell>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, atlas: GlyphAtlas) -> Self {
        let mut pixels = vec![0u8; width as usize * height as usize * 4];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
            atlas,
            fg: Rgb::WHITE,
            bg: Rgb::BLACK,
            inverted: None,
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Color at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let i = self.offset(x, y);
        Rgb::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2])
    }

    #[inline]
    fn put(&mut self, x: u32, y: u32, c: Rgb) {
        let i = self.offset(x, y);
        self.pixels[i] = c.r;
        self.pixels[i + 1] = c.g;
        self.pixels[i + 2] = c.b;
        self.pixels[i + 3] = 255;
    }

    /// Raw RGBA data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Row range [x, x + w) clipped to the surface, as byte offsets
    #[inline]
    fn row_span(&self, x: u32, y: u32, w: u32) -> (usize, usize) {
        let end_x = x.saturating_add(w).min(self.width);
        (self.offset(x, y), self.offset(end_x, y))
    }

    /// Write the surface as an RGBA PNG
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&self.pixels)?;
        Ok(())
    }

    /// Save a timestamped PNG into `dir`, returning its path
    pub fn save_screenshot(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("bbterm_screenshot_{}.png", timestamp));
        self.save_png(&path)?;
        info!("Screenshot saved: {}", path.display());
        Ok(path)
    }
}

impl DisplaySurface for Framebuffer {
    type Snapshot = Vec<u8>;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_glyph(&mut self, index: u8, x: u32, y: u32) {
        let cell = self.atlas.cell_size();
        if x + cell > self.width || y + cell > self.height {
            trace!("glyph at ({}, {}) does not fit, skipped", x, y);
            return;
        }
        let (fg, bg) = (self.fg, self.bg);
        for gy in 0..cell {
            for gx in 0..cell {
                let coverage = self.atlas.glyph(index)[(gy * cell + gx) as usize];
                self.put(x + gx, y + gy, bg.mix(fg, coverage));
            }
        }
    }

    fn draw_image(&mut self, image: &Sprite, x: u32, y: u32) {
        for sy in 0..image.size {
            let py = y + sy;
            if py >= self.height {
                break;
            }
            for sx in 0..image.size {
                let px = x + sx;
                if px >= self.width {
                    break;
                }
                let [r, g, b, a] = image.pixel(sx, sy);
                match a {
                    0 => {}
                    255 => self.put(px, py, Rgb::new(r, g, b)),
                    _ => {
                        let under = self.pixel(px, py);
                        self.put(px, py, under.mix(Rgb::new(r, g, b), a));
                    }
                }
            }
        }
    }

    fn fill(&mut self, color: Rgb) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[color.r, color.g, color.b, 255]);
        }
    }

    fn scroll_up(&mut self, rows: u32) {
        let rows = rows.min(self.height);
        let shift = self.offset(0, rows);
        self.pixels.copy_within(shift.., 0);
        let bg = self.bg;
        for y in self.height - rows..self.height {
            for x in 0..self.width {
                self.put(x, y, bg);
            }
        }
    }

    fn snapshot(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    fn restore(&mut self, snapshot: &Vec<u8>) {
        if snapshot.len() == self.pixels.len() {
            self.pixels.copy_from_slice(snapshot);
        }
    }

    fn set_foreground(&mut self, color: Rgb) {
        self.fg = color;
    }

    fn set_background(&mut self, color: Rgb) {
        self.bg = color;
    }

    fn invert_cell(&mut self, x: u32, y: u32, size: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let h = size.min(self.height - y);
        let mut saved = Vec::with_capacity(size as usize * h as usize * 4);
        for row in y..y + h {
            let (start, end) = self.row_span(x, row, size);
            saved.extend_from_slice(&self.pixels[start..end]);
            for px in self.pixels[start..end].chunks_exact_mut(4) {
                let c = Rgb::new(px[0], px[1], px[2]).inverted();
                px[..3].copy_from_slice(&[c.r, c.g, c.b]);
            }
        }
        self.inverted = Some(SavedCell {
            x,
            y,
            size,
            pixels: saved,
        });
    }

    fn restore_cell(&mut self, x: u32, y: u32, size: u32) {
        let Some(saved) = self.inverted.take() else {
            return;
        };
        if (saved.x, saved.y, saved.size) != (x, y, size) {
            trace!("restore_cell ({}, {}) does not match saved cell", x, y);
            return;
        }
        let h = size.min(self.height - y);
        let mut src = 0;
        for row in y..y + h {
            let (start, end) = self.row_span(x, row, size);
            let len = end - start;
            self.pixels[start..end].copy_from_slice(&saved.pixels[src..src + len]);
            src += len;
        }
    }
}
