//! Stream parser
//!
//! Accumulates transport bytes and interprets them as plain characters,
//! text escape sequences (`ESC [`) and binary extension frames (`ESC /`).
//! A sequence split across reads is kept buffered until it is complete,
//! so feeding a stream in pieces gives the same result as feeding it whole.

use log::{debug, trace, warn};

use crate::constants::{BINARY_SELECTOR, CR, ESC, TEXT_SELECTOR};

use super::screen::Screen;
use super::sprite::SpriteStore;
use super::surface::DisplaySurface;
use super::{ansi, binary};

/// Result of handing a sequence to a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Sequence fully interpreted; scanning continues at this position
    Consumed(usize),
    /// Sequence not complete yet; wait for more bytes
    NeedMoreData,
    /// Sequence cannot be interpreted; bytes before this position are dropped
    Malformed(usize),
}

/// Mutable state a handler may touch while interpreting one sequence
pub struct Performer<'a, S: DisplaySurface> {
    pub screen: &'a mut Screen<S>,
    pub sprites: &'a mut SpriteStore,
    /// Outbound frames, written to the transport after the feed
    pub replies: &'a mut Vec<Vec<u8>>,
    /// Version announced in capability negotiation replies
    pub protocol_version: u16,
}

/// Escape introducer kinds, keyed by the byte after ESC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Introducer {
    /// `ESC [` classic text commands
    Text,
    /// `ESC /` length-framed binary commands
    Binary,
}

impl Introducer {
    pub fn from_selector(byte: u8) -> Option<Self> {
        match byte {
            TEXT_SELECTOR => Some(Introducer::Text),
            BINARY_SELECTOR => Some(Introducer::Binary),
            _ => None,
        }
    }

    fn dispatch<S: DisplaySurface>(
        self,
        data: &[u8],
        pos: usize,
        performer: &mut Performer<'_, S>,
    ) -> Outcome {
        match self {
            Introducer::Text => ansi::process(data, pos, performer),
            Introducer::Binary => binary::process(data, pos, performer),
        }
    }
}

/// Incremental byte-stream parser
#[derive(Debug, Default)]
pub struct Parser {
    /// Bytes not yet interpreted
    buffer: Vec<u8>,
    /// Last pass stopped at a malformed sequence with bytes left unscanned
    rescan: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            rescan: false,
        }
    }

    /// Append `bytes` and interpret everything that is complete.
    ///
    /// Returns true if anything was drawn or any command ran.
    pub fn feed<S: DisplaySurface>(
        &mut self,
        bytes: &[u8],
        performer: &mut Performer<'_, S>,
    ) -> bool {
        self.buffer.extend_from_slice(bytes);
        let pass = scan(&self.buffer, performer);
        self.buffer.drain(..pass.consumed);
        self.rescan = pass.malformed && !self.buffer.is_empty();

        if !self.buffer.is_empty() {
            debug!("{} bytes kept for next feed", self.buffer.len());
        }
        pass.changed
    }

    /// Number of buffered bytes awaiting more input
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// True when buffered bytes were never reached because the last pass
    /// stopped at a malformed sequence; feeding again (even with no new
    /// bytes) interprets them
    pub fn needs_rescan(&self) -> bool {
        self.rescan
    }
}

/// Outcome of one scan pass over the buffer
struct Pass {
    /// Bytes to drop from the front
    consumed: usize,
    changed: bool,
    /// Pass stopped at a malformed sequence
    malformed: bool,
}

/// Interpret `data` from the start
fn scan<S: DisplaySurface>(data: &[u8], performer: &mut Performer<'_, S>) -> Pass {
    let mut pos = 0;
    let mut changed = false;

    while pos < data.len() {
        let byte = data[pos];

        if byte != ESC {
            changed |= handle_char(byte, performer.screen);
            pos += 1;
            continue;
        }

        let Some(&selector) = data.get(pos + 1) else {
            // Lone ESC at the end of the buffer
            break;
        };

        let Some(introducer) = Introducer::from_selector(selector) else {
            warn!(
                "Unsupported escape selector 0x{:02x}, dropping {} bytes",
                selector,
                pos + 2
            );
            return Pass {
                consumed: pos + 2,
                changed,
                malformed: true,
            };
        };

        match introducer.dispatch(data, pos, performer) {
            Outcome::Consumed(next) => {
                trace!("{:?} sequence at {}..{}", introducer, pos, next);
                changed = true;
                pos = next;
            }
            Outcome::NeedMoreData => break,
            Outcome::Malformed(end) => {
                warn!("Malformed {:?} sequence, dropping {} bytes", introducer, end);
                return Pass {
                    consumed: end,
                    changed,
                    malformed: true,
                };
            }
        }
    }

    Pass {
        consumed: pos,
        changed,
        malformed: false,
    }
}

/// Plain byte: printable draws a glyph, CR moves to the next row,
/// other control bytes are ignored
fn handle_char<S: DisplaySurface>(byte: u8, screen: &mut Screen<S>) -> bool {
    match byte {
        CR => screen.carriage_return(),
        32..=255 => {
            screen.put_char(byte);
            true
        }
        _ => false,
    }
}
