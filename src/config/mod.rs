//! Configuration file management
//!
//! Loads TOML configuration files and provides application settings.
//! Default config path: ~/.config/bbterm/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BLINK_TICKS, DEFAULT_CELL_SIZE, DEFAULT_CLEAR_COLOR, DEFAULT_COLUMNS,
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_PROTOCOL_VERSION, DEFAULT_READ_SIZE, DEFAULT_ROWS,
    DEFAULT_TICK_MS,
};
use crate::terminal::EngineOptions;
use crate::utils::{expand_path, parse_hex_color, Rgb};

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub display: DisplayConfig,
    pub protocol: ProtocolConfig,
    pub timing: TimingConfig,
    pub font: FontConfig,
    pub paths: PathConfig,
}

/// Server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Default host when none is given on the command line
    pub host: String,
    /// Default port (0 = must be given on the command line)
    pub port: u16,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Maximum bytes per read
    pub read_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            read_size: DEFAULT_READ_SIZE,
        }
    }
}

/// Surface geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Width in cells
    pub columns: u32,
    /// Height in cells
    pub rows: u32,
    /// Cell (and sprite) edge length in pixels
    pub cell_size: u32,
    /// Clear screen color (hex, e.g. "008000")
    pub clear_color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_COLUMNS,
            rows: DEFAULT_ROWS,
            cell_size: DEFAULT_CELL_SIZE,
            clear_color: DEFAULT_CLEAR_COLOR.to_hex(),
        }
    }
}

impl DisplayConfig {
    /// Surface width in pixels
    pub fn width(&self) -> u32 {
        self.columns.saturating_mul(self.cell_size)
    }

    /// Surface height in pixels
    pub fn height(&self) -> u32 {
        self.rows.saturating_mul(self.cell_size)
    }

    /// Reject geometry the engine cannot use. Negotiation replies carry
    /// the surface size as u16, which also bounds the framebuffer.
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 || self.cell_size == 0 {
            bail!("display columns, rows and cell_size must be non-zero");
        }
        let max = u16::MAX as u32;
        if self.width() > max || self.height() > max {
            bail!(
                "display {}x{} pixels exceeds {}x{}",
                self.width(),
                self.height(),
                max,
                max
            );
        }
        Ok(())
    }

    /// Parsed clear color; falls back to the default on bad input
    pub fn clear_rgb(&self) -> Rgb {
        parse_hex_color(&self.clear_color).unwrap_or_else(|| {
            warn!("Invalid clear_color {:?}, using default", self.clear_color);
            DEFAULT_CLEAR_COLOR
        })
    }
}

/// Protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Version announced in capability negotiation replies
    pub version: u16,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

/// Driver loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Tick period in milliseconds
    pub tick_ms: u64,
    /// Ticks per blink toggle
    pub blink_ticks: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: DEFAULT_TICK_MS,
            blink_ticks: DEFAULT_BLINK_TICKS,
        }
    }
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Glyph source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Bitmap glyph atlas image (cells in row-major glyph order)
    pub atlas: String,
    /// TrueType font file
    pub path: String,
    /// Font size in pixels (TrueType only)
    pub size: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            atlas: String::new(),
            path: String::new(),
            size: 24.0,
        }
    }
}

/// File locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Raw stream capture file (empty = disabled)
    pub dump_file: String,
    /// Screenshot directory
    pub screenshot_dir: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            dump_file: String::new(),
            screenshot_dir: "~/Pictures".to_string(),
        }
    }
}

impl PathConfig {
    /// Capture file with `~` expanded, None when disabled
    pub fn dump_path(&self) -> Option<PathBuf> {
        if self.dump_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(expand_path(&self.dump_file)))
        }
    }

    pub fn screenshot_path(&self) -> PathBuf {
        PathBuf::from(expand_path(&self.screenshot_dir))
    }
}

impl Config {
    /// System-wide config path
    const SYSTEM_CONFIG_PATH: &'static str = "/etc/bbterm/config.toml";

    /// Get the path that would be used for loading config
    /// Returns None if using built-in defaults
    pub fn config_path() -> Option<PathBuf> {
        // 1. BBTERM_CONFIG environment variable
        if let Ok(path) = std::env::var("BBTERM_CONFIG") {
            let p = Path::new(&path);
            if p.exists() {
                return Some(p.to_path_buf());
            }
        }

        // 2. User config: ~/.config/bbterm/config.toml
        if let Some(path) = default_config_path() {
            if path.exists() {
                return Some(path);
            }
        }

        // 3. System config
        let system_config = Path::new(Self::SYSTEM_CONFIG_PATH);
        if system_config.exists() {
            return Some(system_config.to_path_buf());
        }

        None
    }

    /// Load configuration with priority:
    /// 1. BBTERM_CONFIG environment variable
    /// 2. ~/.config/bbterm/config.toml (user config)
    /// 3. /etc/bbterm/config.toml (system config)
    /// 4. Built-in defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config: {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to load config {}: {}", path.display(), e);
                }
            }
        }
        info!("Using built-in default config");
        Self::default()
    }

    /// Load settings from specified path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.display.validate()?;
        Ok(config)
    }

    /// Engine options derived from this config
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            cell_size: self.display.cell_size.max(1),
            clear_color: self.display.clear_rgb(),
            blink_ticks: self.timing.blink_ticks,
            protocol_version: self.protocol.version,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connection.connect_timeout_ms)
    }

    /// Write the default config template to the user config path.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_default_config(force: bool) -> Result<PathBuf> {
        let path = default_config_path()
            .ok_or_else(|| anyhow::anyhow!("Config directory not found"))?;
        Self::write_default_config_to(&path, force)?;
        Ok(path)
    }

    pub fn write_default_config_to(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            bail!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let body = toml::to_string_pretty(&Self::default())?;
        let template = format!(
            "# bbterm configuration\n\
             #\n\
             # [font] atlas takes precedence over path; with neither set\n\
             # glyphs render blank.\n\
             # [paths] dump_file records the raw server stream when set.\n\n{}",
            body
        );
        std::fs::write(path, template)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Get default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bbterm").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.display.width(), 40 * 32);
        assert_eq!(config.display.height(), 25 * 32);
        assert_eq!(config.display.clear_rgb(), Rgb::new(0, 128, 0));
        assert_eq!(config.timing.tick_ms, 10);
        assert_eq!(config.timing.blink_ticks, 50);
        assert_eq!(config.protocol.version, 1);
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml(
            "[display]\ncell_size = 16\nclear_color = \"#000080\"\n\n[protocol]\nversion = 4\n",
        )
        .unwrap();
        assert_eq!(config.display.cell_size, 16);
        assert_eq!(config.display.columns, 40);
        let options = config.engine_options();
        assert_eq!(options.cell_size, 16);
        assert_eq!(options.clear_color, Rgb::new(0, 0, 128));
        assert_eq!(options.protocol_version, 4);
    }

    #[test]
    fn test_bad_clear_color_falls_back() {
        let config = Config::from_toml("[display]\nclear_color = \"green\"\n").unwrap();
        assert_eq!(config.display.clear_rgb(), DEFAULT_CLEAR_COLOR);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml("[display\n").is_err());
        assert!(Config::from_toml("[display]\ncolumns = \"many\"\n").is_err());
    }

    #[test]
    fn test_default_clear_color_matches_constant() {
        let display = DisplayConfig::default();
        assert_eq!(display.clear_color, "008000");
        assert_eq!(display.clear_rgb(), DEFAULT_CLEAR_COLOR);
    }

    #[test]
    fn test_display_geometry_validated() {
        assert!(DisplayConfig::default().validate().is_ok());
        assert!(Config::from_toml("[display]
columns = 0
").is_err());
        // 100000 * 32 pixels does not fit the negotiated u16 width
        assert!(Config::from_toml("[display]
columns = 100000
").is_err());
        let huge = DisplayConfig {
            columns: u32::MAX,
            rows: u32::MAX,
            ..DisplayConfig::default()
        };
        assert_eq!(huge.width(), u32::MAX);
        assert!(huge.validate().is_err());
        let edge = DisplayConfig {
            columns: 2047,
            rows: 2047,
            ..DisplayConfig::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_dump_path() {
        let mut paths = PathConfig::default();
        assert!(paths.dump_path().is_none());
        paths.dump_file = "/tmp/stream.bin".to_string();
        assert_eq!(paths.dump_path(), Some(PathBuf::from("/tmp/stream.bin")));
    }

    #[test]
    fn test_write_default_config() {
        let dir = std::env::temp_dir().join(format!("bbterm_cfg_{}", std::process::id()));
        let path = dir.join("config.toml");
        Config::write_default_config_to(&path, false).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.display.cell_size, DEFAULT_CELL_SIZE);

        assert!(Config::write_default_config_to(&path, false).is_err());
        assert!(Config::write_default_config_to(&path, true).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
