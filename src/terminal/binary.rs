//! Binary extension handler (`ESC /`)
//!
//! ## Frame Format
//! ```text
//! ESC '/' <command:1> <size:u16 LE> <payload:size>
//! ```
//! Frames are self-describing: once the whole frame is buffered it is
//! always consumed, even when the command is unknown or the payload
//! does not match what the command expects.
//!
//! | Cmd | Payload                      | Effect                          |
//! |-----|------------------------------|---------------------------------|
//! | `H` | x:u16, y:u16                 | set cursor (pixels)             |
//! | `A` | -                            | store background                |
//! | `B` | -                            | restore background              |
//! | `S` | id:u16, RGB or RGBA pixels   | upload sprite                   |
//! | `D` | id:u16                       | draw sprite at cursor           |
//! | `V` | version:u16, w:u16, h:u16    | capability negotiation (reply)  |

use log::{debug, trace, warn};

use crate::constants::{BINARY_SELECTOR, ESC, FRAME_HEADER_LEN, NEGOTIATION_PAYLOAD_LEN};

use super::parser::{Outcome, Performer};
use super::surface::DisplaySurface;

/// Known binary commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetCursor,
    StoreBackground,
    RestoreBackground,
    SetSprite,
    DrawSprite,
    Negotiate,
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'H' => Some(Command::SetCursor),
            b'A' => Some(Command::StoreBackground),
            b'B' => Some(Command::RestoreBackground),
            b'S' => Some(Command::SetSprite),
            b'D' => Some(Command::DrawSprite),
            b'V' => Some(Command::Negotiate),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Command::SetCursor => b'H',
            Command::StoreBackground => b'A',
            Command::RestoreBackground => b'B',
            Command::SetSprite => b'S',
            Command::DrawSprite => b'D',
            Command::Negotiate => b'V',
        }
    }
}

/// Interpret the frame whose ESC is at `pos`
pub fn process<S: DisplaySurface>(
    data: &[u8],
    pos: usize,
    performer: &mut Performer<'_, S>,
) -> Outcome {
    let header_end = pos + FRAME_HEADER_LEN;
    if data.len() < header_end {
        return Outcome::NeedMoreData;
    }

    let command_byte = data[pos + 2];
    let size = u16::from_le_bytes([data[pos + 3], data[pos + 4]]) as usize;
    let end = header_end + size;
    if data.len() < end {
        trace!(
            "frame '{}' waiting for payload ({}/{} bytes)",
            command_byte as char,
            data.len() - header_end,
            size
        );
        return Outcome::NeedMoreData;
    }

    let payload = &data[header_end..end];
    match Command::from_byte(command_byte) {
        Some(command) => execute(command, payload, performer),
        None => debug!(
            "Skipping unknown frame '{}' ({} bytes)",
            command_byte as char, size
        ),
    }
    Outcome::Consumed(end)
}

fn execute<S: DisplaySurface>(command: Command, payload: &[u8], performer: &mut Performer<'_, S>) {
    trace!("frame {:?} ({} bytes)", command, payload.len());
    match command {
        Command::SetCursor => {
            if payload.len() != 4 {
                warn!("SetCursor: invalid payload length {}", payload.len());
                return;
            }
            let x = read_u16(payload, 0);
            let y = read_u16(payload, 2);
            performer.screen.set_cursor(x as i64, y as i64);
        }
        Command::StoreBackground => performer.screen.store_background(),
        Command::RestoreBackground => {
            if !performer.screen.restore_background() {
                trace!("RestoreBackground: nothing stored");
            }
        }
        Command::SetSprite => {
            if payload.len() < 2 {
                warn!("SetSprite: payload too short ({} bytes)", payload.len());
                return;
            }
            let id = read_u16(payload, 0);
            if let Err(e) = performer.sprites.set(id, &payload[2..]) {
                warn!("SetSprite {}: {}", id, e);
            }
        }
        Command::DrawSprite => {
            if payload.len() != 2 {
                warn!("DrawSprite: invalid payload length {}", payload.len());
                return;
            }
            let id = read_u16(payload, 0);
            match performer.sprites.get(id) {
                Some(sprite) => performer.screen.draw_sprite(sprite),
                None => trace!("DrawSprite: unknown sprite {}", id),
            }
        }
        Command::Negotiate => {
            if payload.len() != NEGOTIATION_PAYLOAD_LEN {
                warn!("Negotiate: invalid payload length {}", payload.len());
                return;
            }
            debug!(
                "Server capabilities: version={} size={}x{}",
                read_u16(payload, 0),
                read_u16(payload, 2),
                read_u16(payload, 4)
            );
            let surface = performer.screen.surface();
            let width = u16::try_from(surface.width()).unwrap_or(u16::MAX);
            let height = u16::try_from(surface.height()).unwrap_or(u16::MAX);
            performer
                .replies
                .push(negotiation_frame(performer.protocol_version, width, height));
        }
    }
}

#[inline]
fn read_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([payload[offset], payload[offset + 1]])
}

/// Build a frame; None if the payload does not fit the 16-bit size field
pub fn encode_frame(command: u8, payload: &[u8]) -> Option<Vec<u8>> {
    let size = u16::try_from(payload.len()).ok()?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&[ESC, BINARY_SELECTOR, command]);
    frame.extend_from_slice(&size.to_le_bytes());
    frame.extend_from_slice(payload);
    Some(frame)
}

/// Capability negotiation frame (11 bytes)
pub fn negotiation_frame(version: u16, width: u16, height: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + NEGOTIATION_PAYLOAD_LEN);
    frame.extend_from_slice(&[ESC, BINARY_SELECTOR, Command::Negotiate.as_byte()]);
    frame.extend_from_slice(&(NEGOTIATION_PAYLOAD_LEN as u16).to_le_bytes());
    frame.extend_from_slice(&version.to_le_bytes());
    frame.extend_from_slice(&width.to_le_bytes());
    frame.extend_from_slice(&height.to_le_bytes());
    frame
}
