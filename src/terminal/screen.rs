//! Screen state
//!
//! Pixel cursor, cursor stack, color attributes, saved background
//! and blink handling on top of a [`DisplaySurface`].

use log::trace;

use crate::constants::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::utils::Rgb;

use super::sprite::Sprite;
use super::surface::DisplaySurface;

/// Current drawing attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    /// Foreground color
    pub fg: Rgb,
    /// Background color
    pub bg: Rgb,
    /// Offset added to SGR 30-37 / 40-47 colors (0 or 85)
    pub intensity: u8,
    /// Blink enabled (SGR 5 / 25)
    pub blink: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            fg: DEFAULT_FOREGROUND,
            bg: DEFAULT_BACKGROUND,
            intensity: 0,
            blink: false,
        }
    }
}

/// Screen state bound to a display surface
pub struct Screen<S: DisplaySurface> {
    surface: S,
    /// Cell edge length (pixels)
    cell: u32,
    /// Cursor position (pixels)
    cursor: (u32, u32),
    /// Saved cursor positions (CSI s / CSI u)
    cursor_stack: Vec<(u32, u32)>,
    attrs: Attributes,
    /// Single-slot background copy (ESC / A, ESC / B)
    saved_screen: Option<S::Snapshot>,
    /// Fill color for clear screen
    clear_color: Rgb,
    /// Ticks counted while blink is enabled
    blink_counter: u32,
    /// Ticks per blink toggle
    blink_threshold: u32,
    /// Cell currently shown inverted
    blink_cell: Option<(u32, u32)>,
}

impl<S: DisplaySurface> Screen<S> {
    /// Wrap `surface`, fill it with `clear_color` and apply default colors
    pub fn new(mut surface: S, cell: u32, clear_color: Rgb, blink_threshold: u32) -> Self {
        let attrs = Attributes::default();
        surface.fill(clear_color);
        surface.set_foreground(attrs.fg);
        surface.set_background(attrs.bg);
        Self {
            surface,
            cell,
            cursor: (0, 0),
            cursor_stack: Vec::new(),
            attrs,
            saved_screen: None,
            clear_color,
            blink_counter: 0,
            blink_threshold: blink_threshold.max(1),
            blink_cell: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Cell edge length (pixels)
    pub fn cell_size(&self) -> u32 {
        self.cell
    }

    /// First invalid x coordinate
    #[inline]
    fn right_margin(&self) -> u32 {
        self.surface.width().saturating_sub(self.cell)
    }

    /// First invalid y coordinate
    #[inline]
    fn bottom_margin(&self) -> u32 {
        self.surface.height().saturating_sub(self.cell)
    }

    // ========== Cursor ==========

    pub fn cursor(&self) -> (u32, u32) {
        self.cursor
    }

    /// Check if (x, y) is inside `[0, width - cell) x [0, height - cell)`
    pub fn is_valid_cursor(&self, x: i64, y: i64) -> bool {
        (0..self.right_margin() as i64).contains(&x) && (0..self.bottom_margin() as i64).contains(&y)
    }

    /// Move cursor; out-of-range positions are rejected (returns false)
    pub fn set_cursor(&mut self, x: i64, y: i64) -> bool {
        if !self.is_valid_cursor(x, y) {
            trace!("cursor ({}, {}) rejected", x, y);
            return false;
        }
        self.cursor = (x as u32, y as u32);
        true
    }

    /// Move cursor by whole cells
    pub fn move_cursor_cells(&mut self, dx: i64, dy: i64) -> bool {
        let cell = self.cell as i64;
        let (x, y) = self.cursor;
        self.set_cursor(x as i64 + dx * cell, y as i64 + dy * cell)
    }

    /// Save cursor position (CSI s)
    pub fn push_cursor(&mut self) {
        self.cursor_stack.push(self.cursor);
    }

    /// Restore most recently saved cursor position (CSI u)
    pub fn pop_cursor(&mut self) -> Option<(u32, u32)> {
        let pos = self.cursor_stack.pop()?;
        self.set_cursor(pos.0 as i64, pos.1 as i64);
        Some(pos)
    }

    /// Carriage return: column 0 of the next row (no scroll)
    pub fn carriage_return(&mut self) -> bool {
        let y = self.cursor.1 as i64 + self.cell as i64;
        self.set_cursor(0, y)
    }

    /// Draw `ch` at the cursor and advance one cell, wrapping and scrolling
    pub fn put_char(&mut self, ch: u8) {
        let (cx, cy) = self.cursor;
        self.draw_glyph(ch, cx, cy);

        let mut x = cx + self.cell;
        let mut y = cy;
        if x >= self.right_margin() {
            x = 0;
            y += self.cell;
            if y >= self.bottom_margin() {
                self.scroll_line();
                y -= self.cell;
            }
        }
        self.set_cursor(x as i64, y as i64);
    }

    // ========== Attributes ==========

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn set_foreground(&mut self, color: Rgb) {
        self.attrs.fg = color;
        self.surface.set_foreground(color);
    }

    pub fn set_background(&mut self, color: Rgb) {
        self.attrs.bg = color;
        self.surface.set_background(color);
    }

    pub fn set_intensity(&mut self, offset: u8) {
        self.attrs.intensity = offset;
    }

    pub fn set_blink(&mut self, blink: bool) {
        self.attrs.blink = blink;
    }

    // ========== Drawing ==========

    fn draw_glyph(&mut self, index: u8, x: u32, y: u32) {
        self.clear_blink();
        self.surface.draw_glyph(index, x, y);
    }

    /// Draw sprite with its top-left at the cursor
    pub fn draw_sprite(&mut self, sprite: &Sprite) {
        self.clear_blink();
        let (x, y) = self.cursor;
        self.surface.draw_image(sprite, x, y);
    }

    /// Clear whole surface (CSI J)
    pub fn clear(&mut self) {
        self.clear_blink();
        self.surface.fill(self.clear_color);
    }

    /// Scroll surface up one cell row
    pub fn scroll_line(&mut self) {
        self.clear_blink();
        self.surface.scroll_up(self.cell);
    }

    /// Copy surface into the saved-background slot, replacing any previous copy
    pub fn store_background(&mut self) {
        self.clear_blink();
        self.saved_screen = Some(self.surface.snapshot());
    }

    /// Copy saved background back; false if nothing was stored yet
    pub fn restore_background(&mut self) -> bool {
        self.clear_blink();
        match self.saved_screen {
            Some(ref saved) => {
                self.surface.restore(saved);
                true
            }
            None => false,
        }
    }

    pub fn has_saved_background(&self) -> bool {
        self.saved_screen.is_some()
    }

    // ========== Blink ==========

    /// Advance blink counter; returns true when the cursor cell toggled
    pub fn tick(&mut self) -> bool {
        if !self.attrs.blink {
            return false;
        }
        self.blink_counter += 1;
        if self.blink_counter < self.blink_threshold {
            return false;
        }
        self.blink_counter = 0;

        if self.blink_cell.is_some() {
            self.clear_blink();
        } else {
            let (x, y) = self.cursor;
            self.surface.invert_cell(x, y, self.cell);
            self.blink_cell = Some((x, y));
        }
        true
    }

    /// True while a cell is shown inverted
    pub fn blink_visible(&self) -> bool {
        self.blink_cell.is_some()
    }

    /// Put an inverted cell back before anything else draws
    fn clear_blink(&mut self) {
        if let Some((x, y)) = self.blink_cell.take() {
            self.surface.restore_cell(x, y, self.cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CLEAR_COLOR;
    use crate::terminal::testing::{Op, RecordingSurface};

    const CELL: u32 = 32;

    fn screen() -> Screen<RecordingSurface> {
        Screen::new(RecordingSurface::new(40 * CELL, 25 * CELL), CELL, DEFAULT_CLEAR_COLOR, 50)
    }

    #[test]
    fn test_initial_fill() {
        let s = screen();
        assert_eq!(s.surface().ops[0], Op::Fill(DEFAULT_CLEAR_COLOR));
        assert_eq!(s.cursor(), (0, 0));
        assert_eq!(*s.attrs(), Attributes::default());
    }

    #[test]
    fn test_cursor_bounds() {
        let mut s = screen();
        assert!(!s.set_cursor(40 * CELL as i64, 0));
        assert_eq!(s.cursor(), (0, 0));
        assert!(s.set_cursor(0, 0));
        assert!(s.set_cursor(10, 10));
        assert_eq!(s.cursor(), (10, 10));
        // Last column and row are outside the valid range
        assert!(!s.set_cursor(39 * CELL as i64, 0));
        assert!(!s.set_cursor(0, 24 * CELL as i64));
        assert!(!s.set_cursor(-1, 0));
        assert_eq!(s.cursor(), (10, 10));
    }

    #[test]
    fn test_cursor_stack() {
        let mut s = screen();
        s.set_cursor(5, 5);
        s.push_cursor();
        s.set_cursor(10, 10);
        s.push_cursor();
        s.set_cursor(0, 0);

        assert_eq!(s.pop_cursor(), Some((10, 10)));
        assert_eq!(s.cursor(), (10, 10));
        assert_eq!(s.pop_cursor(), Some((5, 5)));
        assert_eq!(s.cursor(), (5, 5));
        assert_eq!(s.pop_cursor(), None);
        assert_eq!(s.cursor(), (5, 5));
    }

    #[test]
    fn test_put_char_wraps() {
        let mut s = screen();
        s.set_cursor(37 * CELL as i64, 0);
        s.put_char(b'A');
        assert_eq!(s.cursor(), (38 * CELL, 0));
        s.put_char(b'B');
        assert_eq!(s.cursor(), (0, CELL));
        assert_eq!(s.surface().glyphs(), vec![(b'A', 37 * CELL, 0), (b'B', 38 * CELL, 0)]);
    }

    #[test]
    fn test_put_char_scrolls_on_last_row() {
        let mut s = screen();
        s.set_cursor(38 * CELL as i64, 23 * CELL as i64);
        s.put_char(b'x');
        assert_eq!(s.cursor(), (0, 23 * CELL));
        assert!(s.surface().ops.contains(&Op::Scroll(CELL)));
    }

    #[test]
    fn test_carriage_return() {
        let mut s = screen();
        s.set_cursor(5 * CELL as i64, 2 * CELL as i64);
        assert!(s.carriage_return());
        assert_eq!(s.cursor(), (0, 3 * CELL));

        // No wrap or scroll on the last valid row
        s.set_cursor(5 * CELL as i64, 23 * CELL as i64);
        assert!(!s.carriage_return());
        assert_eq!(s.cursor(), (5 * CELL, 23 * CELL));
    }

    #[test]
    fn test_blink_toggles_every_threshold() {
        let mut s = screen();
        assert!(!s.tick());
        s.set_blink(true);
        s.set_cursor(CELL as i64, CELL as i64);
        for _ in 0..49 {
            assert!(!s.tick());
        }
        assert!(s.tick());
        assert!(s.blink_visible());
        assert_eq!(s.surface().ops.last(), Some(&Op::Invert(CELL, CELL)));

        for _ in 0..49 {
            assert!(!s.tick());
        }
        assert!(s.tick());
        assert!(!s.blink_visible());
        assert_eq!(s.surface().ops.last(), Some(&Op::RestoreCell(CELL, CELL)));
    }

    #[test]
    fn test_drawing_restores_inverted_cell() {
        let mut s = screen();
        s.set_blink(true);
        for _ in 0..50 {
            s.tick();
        }
        assert!(s.blink_visible());
        s.put_char(b'z');
        assert!(!s.blink_visible());
        let ops = &s.surface().ops;
        let n = ops.len();
        assert_eq!(ops[n - 2], Op::RestoreCell(0, 0));
        assert_eq!(ops[n - 1], Op::Glyph(b'z', 0, 0));
    }

    #[test]
    fn test_background_slot() {
        let mut s = screen();
        assert!(!s.restore_background());
        assert!(!s.has_saved_background());
        s.store_background();
        let taken_at = s.surface().ops.len();
        s.put_char(b'q');
        assert!(s.restore_background());
        assert_eq!(s.surface().ops.last(), Some(&Op::Restore(taken_at)));
    }
}
