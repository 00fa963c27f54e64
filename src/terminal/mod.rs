//! Terminal emulation
//!
//! Core module integrating the transport, stream parser and screen
//! state to form the terminal client.

pub mod ansi;
pub mod binary;
pub mod parser;
pub mod screen;
pub mod sprite;
pub mod surface;
pub mod transport;

#[cfg(test)]
pub mod testing;

use log::{trace, warn};

use crate::constants::{
    DEFAULT_BLINK_TICKS, DEFAULT_CELL_SIZE, DEFAULT_CLEAR_COLOR, DEFAULT_PROTOCOL_VERSION,
};
use crate::utils::Rgb;

use parser::{Parser, Performer};
use screen::Screen;
use sprite::SpriteStore;
use surface::DisplaySurface;
use transport::{Recorder, Transport, TransportError};

/// Engine construction options
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Cell edge length (pixels); also the sprite edge length
    pub cell_size: u32,
    /// Color used by clear screen and the initial fill
    pub clear_color: Rgb,
    /// Ticks per blink toggle
    pub blink_ticks: u32,
    /// Version announced in negotiation replies
    pub protocol_version: u16,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            clear_color: DEFAULT_CLEAR_COLOR,
            blink_ticks: DEFAULT_BLINK_TICKS,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

/// Protocol engine: parser, screen state and sprites over one surface.
///
/// Transport agnostic; replies produced while feeding are queued and
/// handed out by [`Engine::take_replies`].
pub struct Engine<S: DisplaySurface> {
    parser: Parser,
    screen: Screen<S>,
    sprites: SpriteStore,
    replies: Vec<Vec<u8>>,
    protocol_version: u16,
}

impl<S: DisplaySurface> Engine<S> {
    pub fn new(surface: S, options: EngineOptions) -> Self {
        let screen = Screen::new(
            surface,
            options.cell_size,
            options.clear_color,
            options.blink_ticks,
        );
        Self {
            parser: Parser::new(),
            screen,
            sprites: SpriteStore::new(options.cell_size),
            replies: Vec::new(),
            protocol_version: options.protocol_version,
        }
    }

    /// Interpret received bytes; true if the surface may have changed
    pub fn feed(&mut self, bytes: &[u8]) -> bool {
        let mut performer = Performer {
            screen: &mut self.screen,
            sprites: &mut self.sprites,
            replies: &mut self.replies,
            protocol_version: self.protocol_version,
        };
        self.parser.feed(bytes, &mut performer)
    }

    /// Interpret bytes left unscanned after a malformed sequence stopped a
    /// pass, without waiting for more input. True if the surface changed.
    pub fn resume(&mut self) -> bool {
        let mut changed = false;
        // Each malformed pass drops at least the two introducer bytes
        while self.parser.needs_rescan() {
            changed |= self.feed(&[]);
        }
        changed
    }

    /// Periodic tick (blink); true if the surface changed
    pub fn tick(&mut self) -> bool {
        self.screen.tick()
    }

    /// Drain queued outbound frames
    pub fn take_replies(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.replies)
    }

    pub fn screen(&self) -> &Screen<S> {
        &self.screen
    }

    pub fn sprites(&self) -> &SpriteStore {
        &self.sprites
    }

    /// Bytes buffered as an incomplete sequence
    pub fn pending_bytes(&self) -> usize {
        self.parser.pending()
    }
}

/// Terminal client: an [`Engine`] driven by a [`Transport`]
pub struct Terminal<S: DisplaySurface, T: Transport> {
    engine: Engine<S>,
    transport: T,
    /// Read buffer
    read_buf: Vec<u8>,
    /// Optional raw capture of received bytes
    recorder: Option<Recorder>,
}

impl<S: DisplaySurface, T: Transport> Terminal<S, T> {
    pub fn new(engine: Engine<S>, transport: T, read_size: usize) -> Self {
        Self {
            engine,
            transport,
            read_buf: vec![0u8; read_size.max(1)],
            recorder: None,
        }
    }

    /// Capture every received byte with `recorder`
    pub fn with_recorder(mut self, recorder: Recorder) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// One driver iteration: tick, read, interpret, send replies.
    ///
    /// Returns true if the surface changed. [`TransportError::Closed`]
    /// signals the end of the session.
    pub fn process(&mut self) -> Result<bool, TransportError> {
        let mut changed = self.engine.tick();

        let n = self.transport.read(&mut self.read_buf)?;
        if n == 0 {
            return Ok(changed);
        }
        trace!("read: {} bytes", n);

        let data = &self.read_buf[..n];
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.record(data) {
                warn!("Stream capture failed, disabling: {}", e);
                self.recorder = None;
            }
        }

        changed |= self.engine.feed(data);
        changed |= self.engine.resume();

        for reply in self.engine.take_replies() {
            self.transport.write_all(&reply)?;
        }
        Ok(changed)
    }

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Tear down, returning the engine (e.g. for a final screenshot)
    pub fn into_engine(self) -> Engine<S> {
        self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::binary::negotiation_frame;
    use crate::terminal::testing::RecordingSurface;
    use crate::terminal::transport::MemoryTransport;

    fn options() -> EngineOptions {
        EngineOptions {
            cell_size: 8,
            protocol_version: 2,
            ..EngineOptions::default()
        }
    }

    #[test]
    fn test_engine_feed_and_replies() {
        let mut engine = Engine::new(RecordingSurface::new(320, 200), options());
        let mut frame = vec![0x1B, b'/', b'V', 6, 0];
        frame.extend_from_slice(&[1, 0, 0, 0, 0, 0]);
        assert!(engine.feed(&frame));
        assert_eq!(engine.take_replies(), vec![negotiation_frame(2, 320, 200)]);
        assert!(engine.take_replies().is_empty());
    }

    #[test]
    fn test_engine_pending() {
        let mut engine = Engine::new(RecordingSurface::new(320, 200), options());
        engine.feed(b"\x1b/S\x10");
        assert_eq!(engine.pending_bytes(), 4);
    }

    #[test]
    fn test_terminal_writes_each_reply() {
        let mut frame = vec![0x1B, b'/', b'V', 6, 0, 1, 0, 0, 0, 0, 0];
        frame.extend_from_within(..);
        let transport = MemoryTransport::from_bytes(&frame, 64);
        let engine = Engine::new(RecordingSurface::new(320, 200), options());
        let mut term = Terminal::new(engine, transport, 4096);

        assert!(term.process().unwrap());
        let expected = negotiation_frame(2, 320, 200);
        assert_eq!(term.transport().written(), [expected.clone(), expected].concat());
        assert!(matches!(term.process(), Err(TransportError::Closed)));
    }

    #[test]
    fn test_terminal_small_reads() {
        let transport = MemoryTransport::from_bytes(b"ab\x1b[2;2Hc", 1);
        let engine = Engine::new(RecordingSurface::new(320, 200), options());
        let mut term = Terminal::new(engine, transport, 4096);
        while term.process().is_ok() {}
        let engine = term.into_engine();
        assert_eq!(engine.screen().cursor(), (16, 8));
        assert_eq!(engine.screen().surface().glyphs().len(), 3);
    }

    #[test]
    fn test_engine_resume_after_malformed() {
        let mut engine = Engine::new(RecordingSurface::new(320, 200), options());
        engine.feed(b"\x1b]cd");
        assert_eq!(engine.pending_bytes(), 2);
        assert!(engine.resume());
        assert_eq!(engine.pending_bytes(), 0);
        assert_eq!(engine.screen().surface().glyphs().len(), 2);
        assert!(!engine.resume());
    }

    #[test]
    fn test_terminal_interprets_tail_of_final_read() {
        // Last read of the session ends with bytes behind a malformed
        // sequence; they are drawn before the transport reports Closed
        let transport = MemoryTransport::from_bytes(b"ab\x1b]cd", 64);
        let engine = Engine::new(RecordingSurface::new(320, 200), options());
        let mut term = Terminal::new(engine, transport, 4096);
        while term.process().is_ok() {}
        let engine = term.into_engine();
        assert_eq!(engine.pending_bytes(), 0);
        assert_eq!(engine.screen().surface().glyphs().len(), 4);
        assert_eq!(engine.screen().cursor(), (32, 0));
    }
}
