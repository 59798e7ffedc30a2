// Emitter - pixel coordinates to character cells, and the sequences that use them
//
// All math is truncating integer division by the current cell size, the same
// derivation geometry detection uses, so cell boundaries stay consistent within
// a session.

use std::io::{self, Write};

use crate::protocol::ClearRequest;
use crate::terminal::{write_fully, TerminalGeometry};

/// 1-origin cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPosition {
    pub row: i32,
    pub col: i32,
}

/// Cell bounds of a DECFRA rectangular fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

/// Where a draw at pixel `(x, y)` places the cursor
///
/// Row is offset by one and column by two, matching where w3m expects the
/// image's top-left cell.
pub fn draw_origin(geometry: &TerminalGeometry, x: i32, y: i32) -> CellPosition {
    CellPosition {
        row: (y / geometry.cell_height).saturating_add(1),
        col: (x / geometry.cell_width).saturating_add(2),
    }
}

pub fn cursor_sequence(pos: CellPosition) -> String {
    format!("\x1b[{};{}H", pos.row, pos.col)
}

/// Cell rectangle covered by a clear request (no draw offsets)
pub fn clear_rect(geometry: &TerminalGeometry, req: &ClearRequest) -> CellRect {
    CellRect {
        top: req.offset_y / geometry.cell_height,
        left: req.offset_x / geometry.cell_width,
        bottom: req.offset_y.saturating_add(req.height) / geometry.cell_height,
        right: req.offset_x.saturating_add(req.width) / geometry.cell_width,
    }
}

/// Cursor move to the rectangle's origin followed by DECFRA
/// (`CSI Pch ; t ; l ; b ; r $ x`) with an empty fill character
pub fn clear_sequence(rect: CellRect) -> String {
    format!(
        "\x1b[{top};{left}H\x1b[;{top};{left};{bottom};{right}$x",
        top = rect.top,
        left = rect.left,
        bottom = rect.bottom,
        right = rect.right,
    )
}

/// Round a natural image size up to whole cells
pub fn round_to_cells(geometry: &TerminalGeometry, width: u32, height: u32) -> (u64, u64) {
    (
        round_up(width, geometry.cell_width),
        round_up(height, geometry.cell_height),
    )
}

fn round_up(value: u32, cell: i32) -> u64 {
    let value = u64::from(value);
    let cell = u64::try_from(cell).unwrap_or(1).max(1);
    match value % cell {
        0 => value,
        rem => value + (cell - rem),
    }
}

pub fn emit_cursor<W>(out: &mut W, geometry: &TerminalGeometry, x: i32, y: i32) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let seq = cursor_sequence(draw_origin(geometry, x, y));
    write_fully(out, seq.as_bytes())
}

pub fn emit_clear<W>(out: &mut W, geometry: &TerminalGeometry, req: &ClearRequest) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let seq = clear_sequence(clear_rect(geometry, req));
    write_fully(out, seq.as_bytes())
}
