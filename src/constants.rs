//! Global constants for bbterm
//!
//! Consolidates protocol bytes, timing and geometry defaults
//! to eliminate magic numbers throughout the codebase.

use crate::utils::Rgb;

// ============================================================================
// Protocol Bytes
// ============================================================================

/// Escape introducer
pub const ESC: u8 = 0x1B;

/// Carriage return
pub const CR: u8 = 13;

/// Selector byte for the text (ANSI CSI) sub-protocol
pub const TEXT_SELECTOR: u8 = b'[';

/// Selector byte for the binary extension sub-protocol
pub const BINARY_SELECTOR: u8 = b'/';

/// Binary frame header length: ESC, selector, command, size_lo, size_hi
pub const FRAME_HEADER_LEN: usize = 5;

/// Payload length of a capability negotiation frame (3 x u16)
pub const NEGOTIATION_PAYLOAD_LEN: usize = 6;

/// Longest parameter run accepted between `ESC [` and the final letter;
/// an unterminated sequence reaching it is malformed
pub const MAX_CSI_PARAM_LEN: usize = 256;

// ============================================================================
// Timing Constants
// ============================================================================

/// Driver loop tick period in milliseconds
pub const DEFAULT_TICK_MS: u64 = 10;

/// Ticks between blink toggles (~500ms at the default tick period)
pub const DEFAULT_BLINK_TICKS: u32 = 50;

/// Connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Back-off between write retries when the socket would block
pub const WRITE_RETRY_MS: u64 = 10;

// ============================================================================
// Geometry & Color Defaults
// ============================================================================

/// Cell size in pixels (glyphs and sprites are square)
pub const DEFAULT_CELL_SIZE: u32 = 32;

/// Surface width in cells
pub const DEFAULT_COLUMNS: u32 = 40;

/// Surface height in cells
pub const DEFAULT_ROWS: u32 = 25;

/// Maximum bytes per transport read
pub const DEFAULT_READ_SIZE: usize = 65536;

/// Protocol version announced during capability negotiation
pub const DEFAULT_PROTOCOL_VERSION: u16 = 1;

/// Brightness offset for SGR bold and bright (90-97, 100-107) colors
pub const INTENSITY_OFFSET: u8 = 85;

/// Surface color used for clear screen and the initial fill
pub const DEFAULT_CLEAR_COLOR: Rgb = Rgb::new(0, 128, 0);

/// Foreground after SGR 0
pub const DEFAULT_FOREGROUND: Rgb = Rgb::WHITE;

/// Background after SGR 0
pub const DEFAULT_BACKGROUND: Rgb = Rgb::BLACK;
