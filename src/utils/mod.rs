//! Utility functions shared across bbterm
//!
//! Common helpers that don't fit in specialized modules.

pub mod color;

pub use color::{parse_hex_color, Rgb, ANSI_PALETTE};

/// Expand leading `~` to the user's home directory
pub fn expand_path(path: &str) -> String {
    if !path.starts_with('~') {
        return path.to_string();
    }

    match dirs::home_dir().map(|p| p.to_string_lossy().to_string()) {
        Some(home) if path == "~" => home,
        Some(home) => format!("{}{}", home, &path[1..]),
        None => path.to_string(),
    }
}
