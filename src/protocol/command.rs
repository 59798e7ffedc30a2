//! Command model for the image display protocol
//!
//! Wire format, one command per line, fields separated by `;`:
//!
//! ```text
//! 0;n;x;y;w;h;sx;sy;sw;sh;path   draw image
//! 1;n;x;y;w;h;sx;sy;sw;sh;path   redraw image
//! 2                              terminate drawing   -> "\n"
//! 3                              sync drawing        -> "\n"
//! 4                              nop                 -> "\n"
//! 5;path                         get image size      -> "<width> <height>\n"
//! 6;x;y;w;h                      clear image area
//! ```

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use super::tokenizer::{is_printable, tokenize, Args};

/// Field delimiter on the wire
pub const DELIMITER: u8 = b';';

/// Token count (including the op code) of a draw/redraw line
const DRAW_ARGC: usize = 11;
/// Token count of a get-size line
const GETSIZE_ARGC: usize = 2;
/// Token count of a clear line
const CLEAR_ARGC: usize = 5;

/// Operation selected by the leading token of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Draw,
    Redraw,
    Stop,
    Sync,
    Nop,
    GetSize,
    Clear,
}

impl OpCode {
    /// Total number of operations; valid codes are `0..COUNT`
    pub const COUNT: i32 = 7;

    /// Map a wire code to an operation. Out-of-range codes are `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        if !(0..Self::COUNT).contains(&code) {
            return None;
        }
        match code {
            0 => Some(Self::Draw),
            1 => Some(Self::Redraw),
            2 => Some(Self::Stop),
            3 => Some(Self::Sync),
            4 => Some(Self::Nop),
            5 => Some(Self::GetSize),
            6 => Some(Self::Clear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draw => "draw",
            Self::Redraw => "redraw",
            Self::Stop => "stop",
            Self::Sync => "sync",
            Self::Nop => "nop",
            Self::GetSize => "getsize",
            Self::Clear => "clear",
        }
    }
}

/// Parse a decimal integer the way `strtol(s, NULL, 10)` does
///
/// Leading whitespace is skipped, an optional sign is accepted, and digits are
/// consumed up to the first non-digit. No digits gives 0; so does any value
/// outside the `i32` range.
pub fn parse_num(token: &[u8]) -> i32 {
    let mut rest = token;
    while let [first, tail @ ..] = rest {
        if !first.is_ascii_whitespace() {
            break;
        }
        rest = tail;
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for &b in rest.iter().take_while(|b| b.is_ascii_digit()) {
        value = value * 10 + i64::from(b - b'0');
        if value > i64::from(i32::MAX) + 1 {
            return 0;
        }
    }

    let value = if negative { -value } else { value };
    i32::try_from(value).unwrap_or(0)
}

/// A tokenized line with a validated operation code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub op: OpCode,
    /// All tokens of the line, op code included
    pub args: Args<'a>,
}

impl<'a> ParsedCommand<'a> {
    /// Tokenize a line and validate its op code
    ///
    /// Returns `None` for lines with no tokens and for unknown op codes; both
    /// are dropped without a response.
    pub fn parse(line: &'a [u8]) -> Option<Self> {
        let args = tokenize(line, DELIMITER, is_printable);
        if args.is_empty() {
            return None;
        }
        let code = parse_num(args.get(0)?);
        let op = OpCode::from_code(code)?;
        Some(Self { op, args })
    }

    /// Number of tokens, op code included
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    fn num(&self, index: usize) -> i32 {
        self.args.get(index).map(parse_num).unwrap_or(0)
    }

    /// Check the argument count for the operation and build a typed command
    ///
    /// `None` means the line is malformed and should be ignored.
    pub fn into_command(self, max_image: usize) -> Option<Command<'a>> {
        match self.op {
            OpCode::Draw | OpCode::Redraw => {
                if self.argc() != DRAW_ARGC {
                    return None;
                }
                let request = DrawRequest {
                    index: clamp_index(self.num(1), max_image),
                    offset_x: self.num(2),
                    offset_y: self.num(3),
                    width: self.num(4),
                    height: self.num(5),
                    shift_x: self.num(6),
                    shift_y: self.num(7),
                    view_width: self.num(8),
                    view_height: self.num(9),
                    path: self.args.get(10)?,
                };
                Some(if self.op == OpCode::Draw {
                    Command::Draw(request)
                } else {
                    Command::Redraw(request)
                })
            }
            OpCode::Stop => Some(Command::Stop),
            OpCode::Sync => Some(Command::Sync),
            OpCode::Nop => Some(Command::Nop),
            OpCode::GetSize => {
                if self.argc() != GETSIZE_ARGC {
                    return None;
                }
                Some(Command::GetSize(self.args.get(1)?))
            }
            OpCode::Clear => {
                if self.argc() != CLEAR_ARGC {
                    return None;
                }
                Some(Command::Clear(ClearRequest {
                    offset_x: self.num(1),
                    offset_y: self.num(2),
                    width: self.num(3),
                    height: self.num(4),
                }))
            }
        }
    }
}

/// Wire indices are 1-origin; convert and clamp into `[0, max_image)`
fn clamp_index(wire_index: i32, max_image: usize) -> usize {
    let index = i64::from(wire_index) - 1;
    if index < 0 {
        return 0;
    }
    let upper = max_image.saturating_sub(1);
    usize::try_from(index).map_or(upper, |i| i.min(upper))
}

/// Arguments of a draw or redraw command, all in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRequest<'a> {
    /// Image slot, 0-origin and clamped
    pub index: usize,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Target size the image is scaled to
    pub width: i32,
    pub height: i32,
    /// Clip origin inside the scaled image
    pub shift_x: i32,
    pub shift_y: i32,
    /// Clip size
    pub view_width: i32,
    pub view_height: i32,
    path: &'a [u8],
}

impl<'a> DrawRequest<'a> {
    pub fn path(&self) -> &'a Path {
        bytes_to_path(self.path)
    }
}

/// Pixel rectangle to erase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearRequest {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: i32,
    pub height: i32,
}

/// A fully validated command, ready for dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Draw(DrawRequest<'a>),
    Redraw(DrawRequest<'a>),
    Stop,
    Sync,
    Nop,
    GetSize(&'a [u8]),
    Clear(ClearRequest),
}

/// Paths travel as raw bytes; they need not be valid UTF-8
pub fn bytes_to_path(bytes: &[u8]) -> &Path {
    Path::new(OsStr::from_bytes(bytes))
}
