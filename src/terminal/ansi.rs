//! Text command handler (`ESC [ params final`)
//!
//! Only a small fixed set of CSI commands is recognized. Any other
//! final letter makes the sequence malformed.

use log::trace;

use crate::constants::{INTENSITY_OFFSET, MAX_CSI_PARAM_LEN};
use crate::utils::{Rgb, ANSI_PALETTE};

use super::parser::{Outcome, Performer};
use super::screen::Screen;
use super::surface::DisplaySurface;

/// Recognized final letters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// J - erase whole display
    Clear,
    /// H - cursor position row;col
    Position,
    /// A - cursor up
    Up,
    /// B - cursor down
    Down,
    /// C - cursor forward
    Forward,
    /// D - cursor backward
    Backward,
    /// s - save cursor position
    Save,
    /// u - restore cursor position
    Restore,
    /// m - select graphic rendition
    Sgr,
}

impl Command {
    fn from_final(byte: u8) -> Option<Self> {
        match byte {
            b'J' => Some(Command::Clear),
            b'H' => Some(Command::Position),
            b'A' => Some(Command::Up),
            b'B' => Some(Command::Down),
            b'C' => Some(Command::Forward),
            b'D' => Some(Command::Backward),
            b's' => Some(Command::Save),
            b'u' => Some(Command::Restore),
            b'm' => Some(Command::Sgr),
            _ => None,
        }
    }
}

/// Interpret the sequence whose ESC is at `pos`
pub fn process<S: DisplaySurface>(
    data: &[u8],
    pos: usize,
    performer: &mut Performer<'_, S>,
) -> Outcome {
    let start = pos + 2;
    let body = data.get(start..).unwrap_or(&[]);

    // First alphabetic byte terminates the sequence
    let window = &body[..body.len().min(MAX_CSI_PARAM_LEN)];
    let Some(offset) = window.iter().position(u8::is_ascii_alphabetic) else {
        if body.len() < MAX_CSI_PARAM_LEN {
            return Outcome::NeedMoreData;
        }
        log::warn!("CSI parameters exceed {} bytes, dropping", MAX_CSI_PARAM_LEN);
        return Outcome::Malformed(start + MAX_CSI_PARAM_LEN);
    };
    let end = start + offset;
    let params = &data[start..end];
    let final_byte = data[end];

    let Some(command) = Command::from_final(final_byte) else {
        log::warn!("Unsupported CSI command '{}'", final_byte as char);
        return Outcome::Malformed(end + 1);
    };

    trace!(
        "CSI {:?} params={:?}",
        command,
        String::from_utf8_lossy(params)
    );
    execute(command, params, performer.screen);
    Outcome::Consumed(end + 1)
}

fn execute<S: DisplaySurface>(command: Command, params: &[u8], screen: &mut Screen<S>) {
    match command {
        Command::Clear => {
            // Only full screen clear is supported; mode is ignored
            screen.clear();
        }
        Command::Position => {
            if let Some((row, col)) = parse_position(params) {
                let cell = screen.cell_size() as i64;
                screen.set_cursor((col as i64 - 1) * cell, (row as i64 - 1) * cell);
            }
        }
        Command::Up => {
            let n = count_param(params);
            screen.move_cursor_cells(0, -n);
        }
        Command::Down => {
            let n = count_param(params);
            screen.move_cursor_cells(0, n);
        }
        Command::Forward => {
            let n = count_param(params);
            screen.move_cursor_cells(n, 0);
        }
        Command::Backward => {
            let n = count_param(params);
            screen.move_cursor_cells(-n, 0);
        }
        Command::Save => screen.push_cursor(),
        Command::Restore => {
            screen.pop_cursor();
        }
        Command::Sgr => apply_sgr(&parse_list(params), screen),
    }
}

/// Apply SGR codes in order
fn apply_sgr<S: DisplaySurface>(codes: &[u32], screen: &mut Screen<S>) {
    for &code in codes {
        match code {
            0 => {
                screen.set_background(Rgb::BLACK);
                screen.set_foreground(Rgb::WHITE);
                screen.set_intensity(0);
            }
            // Bold only affects colors selected after it
            1 => screen.set_intensity(INTENSITY_OFFSET),
            5 => screen.set_blink(true),
            25 => screen.set_blink(false),
            30..=37 => {
                let color = ANSI_PALETTE[(code - 30) as usize].brighten(screen.attrs().intensity);
                screen.set_foreground(color);
            }
            40..=47 => {
                let color = ANSI_PALETTE[(code - 40) as usize].brighten(screen.attrs().intensity);
                screen.set_background(color);
            }
            90..=97 => {
                let color = ANSI_PALETTE[(code - 90) as usize].brighten(INTENSITY_OFFSET);
                screen.set_foreground(color);
            }
            100..=107 => {
                let color = ANSI_PALETTE[(code - 100) as usize].brighten(INTENSITY_OFFSET);
                screen.set_background(color);
            }
            _ => trace!("Unhandled SGR code {}", code),
        }
    }
}

/// Parse a run of ASCII digits; None if empty, non-digit or overflowing
fn parse_digits(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u32, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add((b - b'0') as u32)
    })
}

/// Integer formed by the leading digits of `params`
fn leading_int(params: &[u8]) -> Option<u32> {
    let len = params.iter().take_while(|b| b.is_ascii_digit()).count();
    parse_digits(&params[..len])
}

/// Cursor movement count (default 1)
fn count_param(params: &[u8]) -> i64 {
    leading_int(params).unwrap_or(1) as i64
}

/// `row;col` as used by CSI H; anything else is rejected
fn parse_position(params: &[u8]) -> Option<(u32, u32)> {
    let sep = params.iter().position(|&b| b == b';')?;
    let row = parse_digits(&params[..sep])?;
    let col = leading_int(&params[sep + 1..])?;
    Some((row, col))
}

/// Semicolon separated list for SGR (empty -> [0], empty item -> 0)
fn parse_list(params: &[u8]) -> Vec<u32> {
    if params.is_empty() {
        return vec![0];
    }
    params
        .split(|&b| b == b';')
        .filter_map(|item| {
            if item.is_empty() {
                Some(0)
            } else {
                parse_digits(item)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CLEAR_COLOR;
    use crate::terminal::sprite::SpriteStore;
    use crate::terminal::testing::{Op, RecordingSurface};

    const CELL: u32 = 16;

    fn run(screen: &mut Screen<RecordingSurface>, seq: &[u8]) -> Outcome {
        let mut sprites = SpriteStore::new(CELL);
        let mut replies = Vec::new();
        let mut performer = Performer {
            screen,
            sprites: &mut sprites,
            replies: &mut replies,
            protocol_version: 1,
        };
        process(seq, 0, &mut performer)
    }

    fn screen() -> Screen<RecordingSurface> {
        Screen::new(
            RecordingSurface::new(40 * CELL, 25 * CELL),
            CELL,
            DEFAULT_CLEAR_COLOR,
            50,
        )
    }

    #[test]
    fn test_outcomes() {
        let mut s = screen();
        assert_eq!(run(&mut s, b"\x1b[12"), Outcome::NeedMoreData);
        assert_eq!(run(&mut s, b"\x1b["), Outcome::NeedMoreData);
        assert_eq!(run(&mut s, b"\x1b[2Jrest"), Outcome::Consumed(4));
        assert_eq!(run(&mut s, b"\x1b[?25hx"), Outcome::Malformed(6));
        assert_eq!(run(&mut s, b"\x1b[K"), Outcome::Malformed(3));
    }

    #[test]
    fn test_parameter_run_capped() {
        let mut s = screen();
        let mut seq = b"\x1b[".to_vec();
        seq.extend(std::iter::repeat(b'1').take(MAX_CSI_PARAM_LEN - 1));
        assert_eq!(run(&mut s, &seq), Outcome::NeedMoreData);

        // Last accepted position for the final letter
        let mut terminated = seq.clone();
        terminated.push(b'C');
        assert_eq!(run(&mut s, &terminated), Outcome::Consumed(MAX_CSI_PARAM_LEN + 2));

        seq.push(b'1');
        assert_eq!(run(&mut s, &seq), Outcome::Malformed(MAX_CSI_PARAM_LEN + 2));
        seq.push(b'm');
        assert_eq!(run(&mut s, &seq), Outcome::Malformed(MAX_CSI_PARAM_LEN + 2));
    }

    #[test]
    fn test_clear_uses_clear_color() {
        let mut s = screen();
        run(&mut s, b"\x1b[2J");
        assert_eq!(s.surface().ops.last(), Some(&Op::Fill(DEFAULT_CLEAR_COLOR)));
    }

    #[test]
    fn test_cursor_position() {
        let mut s = screen();
        run(&mut s, b"\x1b[3;5H");
        assert_eq!(s.cursor(), (4 * CELL, 2 * CELL));

        // Missing or malformed params leave the cursor alone
        run(&mut s, b"\x1b[H");
        run(&mut s, b"\x1b[7H");
        run(&mut s, b"\x1b[;4H");
        assert_eq!(s.cursor(), (4 * CELL, 2 * CELL));

        // Row 0 would be negative and is rejected
        run(&mut s, b"\x1b[0;1H");
        assert_eq!(s.cursor(), (4 * CELL, 2 * CELL));
    }

    #[test]
    fn test_cursor_moves() {
        let mut s = screen();
        run(&mut s, b"\x1b[5;5H");
        run(&mut s, b"\x1b[A");
        assert_eq!(s.cursor(), (4 * CELL, 3 * CELL));
        run(&mut s, b"\x1b[2B");
        assert_eq!(s.cursor(), (4 * CELL, 5 * CELL));
        run(&mut s, b"\x1b[3C");
        assert_eq!(s.cursor(), (7 * CELL, 5 * CELL));
        run(&mut s, b"\x1b[7D");
        assert_eq!(s.cursor(), (0, 5 * CELL));
        // Moving off the surface is rejected
        run(&mut s, b"\x1b[D");
        assert_eq!(s.cursor(), (0, 5 * CELL));
    }

    #[test]
    fn test_save_restore() {
        let mut s = screen();
        run(&mut s, b"\x1b[2;2H");
        run(&mut s, b"\x1b[s");
        run(&mut s, b"\x1b[9;9H");
        run(&mut s, b"\x1b[u");
        assert_eq!(s.cursor(), (CELL, CELL));
        run(&mut s, b"\x1b[9;9H");
        run(&mut s, b"\x1b[u");
        assert_eq!(s.cursor(), (8 * CELL, 8 * CELL));
    }

    #[test]
    fn test_sgr_bold_colors() {
        let mut s = screen();
        run(&mut s, b"\x1b[1;33;44m");
        let attrs = *s.attrs();
        assert_eq!(attrs.intensity, 85);
        assert_eq!(attrs.fg, Rgb::new(255, 170, 85));
        assert_eq!(attrs.bg, Rgb::new(85, 85, 255));
        assert!(!attrs.blink);
    }

    #[test]
    fn test_sgr_bold_not_retroactive() {
        let mut s = screen();
        run(&mut s, b"\x1b[31;1m");
        assert_eq!(s.attrs().fg, Rgb::new(170, 0, 0));
        assert_eq!(s.attrs().intensity, 85);
    }

    #[test]
    fn test_sgr_bright_ignores_intensity() {
        let mut s = screen();
        run(&mut s, b"\x1b[0;94;101m");
        assert_eq!(s.attrs().fg, Rgb::new(85, 85, 255));
        assert_eq!(s.attrs().bg, Rgb::new(255, 85, 85));
        assert_eq!(s.attrs().intensity, 0);
    }

    #[test]
    fn test_sgr_reset_and_blink() {
        let mut s = screen();
        run(&mut s, b"\x1b[1;32;45;5m");
        assert!(s.attrs().blink);
        run(&mut s, b"\x1b[m");
        let attrs = *s.attrs();
        assert_eq!(attrs.fg, Rgb::WHITE);
        assert_eq!(attrs.bg, Rgb::BLACK);
        assert_eq!(attrs.intensity, 0);
        // Reset does not touch blink
        assert!(attrs.blink);
        run(&mut s, b"\x1b[25m");
        assert!(!s.attrs().blink);
    }

    #[test]
    fn test_sgr_updates_surface_colors() {
        let mut s = screen();
        run(&mut s, b"\x1b[36m");
        assert_eq!(s.surface().ops.last(), Some(&Op::Fg(Rgb::new(0, 170, 170))));
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_list(b""), vec![0]);
        assert_eq!(parse_list(b"1;;33"), vec![1, 0, 33]);
        assert_eq!(parse_list(b"1;x;33"), vec![1, 33]);
        assert_eq!(leading_int(b"12;4"), Some(12));
        assert_eq!(leading_int(b""), None);
        assert_eq!(parse_position(b"10;20"), Some((10, 20)));
        assert_eq!(parse_position(b"10"), None);
        assert_eq!(parse_digits(b"99999999999"), None);
    }
}
