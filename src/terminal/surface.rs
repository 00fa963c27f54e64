//! Display surface abstraction
//!
//! The engine draws through this trait and never touches pixels itself.
//! `render::Framebuffer` is the in-tree implementation.

use crate::utils::Rgb;

use super::sprite::Sprite;

/// Rendering target driven by the protocol engine.
///
/// Coordinates are pixels, origin top-left.
pub trait DisplaySurface {
    /// Opaque full-surface copy used by store/restore background
    type Snapshot;

    /// Surface width (pixels)
    fn width(&self) -> u32;

    /// Surface height (pixels)
    fn height(&self) -> u32;

    /// Draw glyph `index` with the current colors, cell top-left at (x, y)
    fn draw_glyph(&mut self, index: u8, x: u32, y: u32);

    /// Composite an image with its top-left at (x, y)
    fn draw_image(&mut self, image: &Sprite, x: u32, y: u32);

    /// Fill the whole surface
    fn fill(&mut self, color: Rgb);

    /// Scroll contents up by `rows` pixel rows
    fn scroll_up(&mut self, rows: u32);

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: &Self::Snapshot);

    fn set_foreground(&mut self, color: Rgb);

    fn set_background(&mut self, color: Rgb);

    /// Invert the `size`x`size` cell at (x, y), remembering its pixels
    fn invert_cell(&mut self, x: u32, y: u32, size: u32);

    /// Put back the pixels remembered by `invert_cell`
    fn restore_cell(&mut self, x: u32, y: u32, size: u32);
}
