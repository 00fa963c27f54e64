//! Recording surface for unit tests

use crate::utils::Rgb;

use super::sprite::Sprite;
use super::surface::DisplaySurface;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Glyph(u8, u32, u32),
    Image(u32, u32),
    Fill(Rgb),
    Scroll(u32),
    Restore(usize),
    Fg(Rgb),
    Bg(Rgb),
    Invert(u32, u32),
    RestoreCell(u32, u32),
}

/// Surface that logs every call
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<Op>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Glyph draws in call order
    pub fn glyphs(&self) -> Vec<(u8, u32, u32)> {
        self.ops
            .iter()
            .filter_map(|op| match *op {
                Op::Glyph(c, x, y) => Some((c, x, y)),
                _ => None,
            })
            .collect()
    }
}

impl DisplaySurface for RecordingSurface {
    /// Number of ops recorded when the snapshot was taken
    type Snapshot = usize;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_glyph(&mut self, index: u8, x: u32, y: u32) {
        self.ops.push(Op::Glyph(index, x, y));
    }

    fn draw_image(&mut self, _image: &Sprite, x: u32, y: u32) {
        self.ops.push(Op::Image(x, y));
    }

    fn fill(&mut self, color: Rgb) {
        self.ops.push(Op::Fill(color));
    }

    fn scroll_up(&mut self, rows: u32) {
        self.ops.push(Op::Scroll(rows));
    }

    fn snapshot(&self) -> usize {
        self.ops.len()
    }

    fn restore(&mut self, snapshot: &usize) {
        self.ops.push(Op::Restore(*snapshot));
    }

    fn set_foreground(&mut self, color: Rgb) {
        self.ops.push(Op::Fg(color));
    }

    fn set_background(&mut self, color: Rgb) {
        self.ops.push(Op::Bg(color));
    }

    fn invert_cell(&mut self, x: u32, y: u32, _size: u32) {
        self.ops.push(Op::Invert(x, y));
    }

    fn restore_cell(&mut self, x: u32, y: u32, _size: u32) {
        self.ops.push(Op::RestoreCell(x, y));
    }
}
