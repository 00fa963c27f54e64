//! Color utilities
//!
//! RGB triple type, the 8-entry ANSI palette used by SGR,
//! and hex parsing for config values.

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Add `amount` to every channel, saturating at 255
    #[inline]
    pub const fn brighten(self, amount: u8) -> Self {
        Self {
            r: self.r.saturating_add(amount),
            g: self.g.saturating_add(amount),
            b: self.b.saturating_add(amount),
        }
    }

    /// Inverted color (255 - c per channel)
    #[inline]
    pub const fn inverted(self) -> Self {
        Self {
            r: 255 - self.r,
            g: 255 - self.g,
            b: 255 - self.b,
        }
    }

    /// Lowercase "rrggbb" form, as accepted by [`parse_hex_color`]
    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear mix of `self` (coverage 0) and `other` (coverage 255)
    #[inline]
    pub fn mix(self, other: Rgb, coverage: u8) -> Self {
        let a = coverage as u16;
        let inv = 255 - a;
        let ch = |x: u8, y: u8| ((x as u16 * inv + y as u16 * a + 127) / 255) as u8;
        Self {
            r: ch(self.r, other.r),
            g: ch(self.g, other.g),
            b: ch(self.b, other.b),
        }
    }
}

/// Standard 8 ANSI colors (CGA-like levels, 170 for "on")
pub const ANSI_PALETTE: [Rgb; 8] = [
    Rgb::new(0, 0, 0),       // black
    Rgb::new(170, 0, 0),     // red
    Rgb::new(0, 170, 0),     // green
    Rgb::new(170, 85, 0),    // yellow (brown)
    Rgb::new(0, 0, 170),     // blue
    Rgb::new(170, 0, 170),   // magenta
    Rgb::new(0, 170, 170),   // cyan
    Rgb::new(170, 170, 170), // white
];

/// Parse 6-digit hex color (e.g., "ff0000" -> (255, 0, 0))
/// Also supports 3-digit short format (e.g., "f00" -> (255, 0, 0))
/// Returns None on invalid input.
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let hex = hex.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgb::new(r, g, b))
        }
        3 => {
            // Short format: expand F -> FF
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(Rgb::new(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("ff0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_hex_color("008000"), Some(Rgb::new(0, 128, 0)));
        assert_eq!(parse_hex_color("#0000ff"), Some(Rgb::new(0, 0, 255)));
        assert_eq!(parse_hex_color("f00"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_hex_color("invalid"), None);
        assert_eq!(parse_hex_color("€abc"), None);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(Rgb::new(0, 128, 0).to_hex(), "008000");
        let c = Rgb::new(171, 5, 255);
        assert_eq!(parse_hex_color(&c.to_hex()), Some(c));
    }

    #[test]
    fn test_brighten_saturates() {
        assert_eq!(ANSI_PALETTE[7].brighten(85), Rgb::new(255, 255, 255));
        assert_eq!(ANSI_PALETTE[3].brighten(85), Rgb::new(255, 170, 85));
        assert_eq!(Rgb::new(200, 0, 250).brighten(85), Rgb::new(255, 85, 255));
    }

    #[test]
    fn test_mix() {
        let bg = Rgb::BLACK;
        let fg = Rgb::WHITE;
        assert_eq!(bg.mix(fg, 0), bg);
        assert_eq!(bg.mix(fg, 255), fg);
        assert_eq!(Rgb::new(10, 20, 30).inverted(), Rgb::new(245, 235, 225));
    }
}
