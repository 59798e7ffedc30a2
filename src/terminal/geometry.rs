//! Terminal geometry detection
//!
//! Resolves the terminal's pixel size and grid, then derives the pixel size of
//! one cell by truncating division. Three tiers are tried in order:
//!
//! 1. `TIOCGWINSZ`, accepted only when it carries pixel dimensions
//! 2. dtterm window-manipulation queries (`CSI 14 t` / `CSI 18 t`), answered by
//!    the terminal within a bounded number of readiness waits
//! 3. static defaults from the config, which always succeed
//!
//! The result always has a non-zero cell size, so later coordinate math never
//! divides by zero.

use std::io::{self, ErrorKind};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::GeometryConfig;

/// Request window size in pixels; reply is `CSI 4 ; height ; width t`
const PIXEL_SIZE_QUERY: &[u8] = b"\x1b[14t";
const PIXEL_SIZE_REPLY: u8 = b'4';

/// Request text area size in characters; reply is `CSI 8 ; rows ; cols t`
const TEXT_AREA_QUERY: &[u8] = b"\x1b[18t";
const TEXT_AREA_REPLY: u8 = b'8';

/// Most reply bytes accumulated for one query
const REPLY_LIMIT: usize = 1023;

/// Kernel view of the window (`struct winsize`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowSize {
    pub cols: u16,
    pub rows: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl WindowSize {
    /// Zero and `u16::MAX` both mean the terminal did not fill in pixel sizes
    pub fn has_pixels(&self) -> bool {
        let known = |v: u16| v != 0 && v != u16::MAX;
        known(self.pixel_width) && known(self.pixel_height)
    }
}

/// The terminal operations geometry detection needs
///
/// Implemented by [`super::Tty`]; tests substitute a scripted probe.
pub trait TerminalProbe {
    /// Kernel window size query
    fn window_size(&self) -> io::Result<WindowSize>;

    /// Write a query sequence to the terminal
    fn send_query(&mut self, seq: &[u8]) -> io::Result<()>;

    /// Block up to `timeout` for reply bytes; `Ok(false)` on timeout
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read whatever reply bytes are available
    fn read_reply(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Resolved terminal geometry, all values in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalGeometry {
    pub pixel_width: i32,
    pub pixel_height: i32,
    pub cell_width: i32,
    pub cell_height: i32,
}

impl TerminalGeometry {
    /// Derive cell size from a pixel size and a grid
    ///
    /// `None` when any input is non-positive or a cell would be narrower than
    /// one pixel.
    pub fn from_grid(pixel_width: i32, pixel_height: i32, cols: i32, rows: i32) -> Option<Self> {
        if pixel_width <= 0 || pixel_height <= 0 || cols <= 0 || rows <= 0 {
            return None;
        }

        let cell_width = pixel_width / cols;
        let cell_height = pixel_height / rows;
        if cell_width == 0 || cell_height == 0 {
            return None;
        }

        Some(Self {
            pixel_width,
            pixel_height,
            cell_width,
            cell_height,
        })
    }

    /// Static default geometry; never fails
    pub fn fallback(config: &GeometryConfig) -> Self {
        let cols = (config.term_width / config.cell_width.max(1)).max(1);
        let rows = (config.term_height / config.cell_height.max(1)).max(1);

        Self::from_grid(config.term_width, config.term_height, cols, rows).unwrap_or(Self {
            pixel_width: config.term_width.max(1),
            pixel_height: config.term_height.max(1),
            cell_width: config.cell_width.max(1),
            cell_height: config.cell_height.max(1),
        })
    }
}

/// Which tier produced the geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometrySource {
    Winsize,
    EscapeSequence,
    Default,
}

impl GeometrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Winsize => "winsize",
            Self::EscapeSequence => "dtterm sequence",
            Self::Default => "default value",
        }
    }
}

/// Run all three tiers and return the first that succeeds
pub fn detect<P>(probe: &mut P, config: &GeometryConfig) -> (TerminalGeometry, GeometrySource)
where
    P: TerminalProbe + ?Sized,
{
    if let Some(geometry) = from_winsize(probe) {
        return (geometry, GeometrySource::Winsize);
    }

    if let Some(geometry) = from_escape_sequences(probe, config) {
        return (geometry, GeometrySource::EscapeSequence);
    }
    warn!("no response for dtterm sequence");

    (TerminalGeometry::fallback(config), GeometrySource::Default)
}

/// Recompute geometry after SIGWINCH
///
/// Only the kernel is asked: the escape-sequence tier waits on the terminal
/// and must not stall the command loop. Without pixel information the current
/// cell size is kept and applied to the new grid; if the query fails outright
/// the static defaults are used.
pub fn after_resize<P>(
    probe: &P,
    current: &TerminalGeometry,
    config: &GeometryConfig,
) -> TerminalGeometry
where
    P: TerminalProbe + ?Sized,
{
    match probe.window_size() {
        Ok(ws) if ws.has_pixels() => TerminalGeometry::from_grid(
            ws.pixel_width.into(),
            ws.pixel_height.into(),
            ws.cols.into(),
            ws.rows.into(),
        )
        .unwrap_or(*current),
        Ok(ws) => {
            let cols = i32::from(ws.cols);
            let rows = i32::from(ws.rows);
            TerminalGeometry::from_grid(
                current.cell_width.saturating_mul(cols),
                current.cell_height.saturating_mul(rows),
                cols,
                rows,
            )
            .unwrap_or(*current)
        }
        Err(e) => {
            warn!(error = %e, "ioctl TIOCGWINSZ failed");
            TerminalGeometry::fallback(config)
        }
    }
}

fn from_winsize<P: TerminalProbe + ?Sized>(probe: &P) -> Option<TerminalGeometry> {
    let ws = match probe.window_size() {
        Ok(ws) => ws,
        Err(e) => {
            warn!(error = %e, "ioctl TIOCGWINSZ failed");
            return None;
        }
    };

    if !ws.has_pixels() {
        warn!("struct winsize has no pixel information");
        return None;
    }

    let geometry = TerminalGeometry::from_grid(
        ws.pixel_width.into(),
        ws.pixel_height.into(),
        ws.cols.into(),
        ws.rows.into(),
    );
    match geometry {
        Some(_) => debug!(
            width = ws.pixel_width,
            height = ws.pixel_height,
            cols = ws.cols,
            lines = ws.rows,
            "terminal size set by winsize"
        ),
        None => warn!(?ws, "struct winsize has an empty grid"),
    }
    geometry
}

fn from_escape_sequences<P>(probe: &mut P, config: &GeometryConfig) -> Option<TerminalGeometry>
where
    P: TerminalProbe + ?Sized,
{
    let (height, width) = query(probe, PIXEL_SIZE_QUERY, PIXEL_SIZE_REPLY, config)?;
    let (rows, cols) = query(probe, TEXT_AREA_QUERY, TEXT_AREA_REPLY, config)?;

    let geometry = TerminalGeometry::from_grid(width, height, cols, rows);
    if geometry.is_some() {
        info!(width, height, cols, lines = rows, "terminal size set by dtterm sequence");
    }
    geometry
}

fn query<P>(probe: &mut P, seq: &[u8], reply_code: u8, config: &GeometryConfig) -> Option<(i32, i32)>
where
    P: TerminalProbe + ?Sized,
{
    match exchange(probe, seq, reply_code, config) {
        Ok(reply) => reply,
        Err(e) => {
            debug!(error = %e, "terminal query aborted");
            None
        }
    }
}

/// Send one query and poll for its reply
///
/// Each attempt waits up to `select_timeout`. An interrupted wait or read is
/// retried without using up an attempt; any other I/O error aborts.
fn exchange<P>(
    probe: &mut P,
    seq: &[u8],
    reply_code: u8,
    config: &GeometryConfig,
) -> io::Result<Option<(i32, i32)>>
where
    P: TerminalProbe + ?Sized,
{
    probe.send_query(seq)?;

    let mut reply: Vec<u8> = Vec::with_capacity(64);
    let mut chunk = [0u8; 256];
    let mut attempts = 0;

    while attempts < config.select_check_limit {
        match probe.wait_readable(config.select_timeout) {
            Ok(true) => match probe.read_reply(&mut chunk) {
                Ok(n) => {
                    let room = REPLY_LIMIT - reply.len();
                    reply.extend_from_slice(&chunk[..n.min(room)]);
                    debug!(buf = ?String::from_utf8_lossy(&reply), "terminal reply");

                    if let Some(pair) = parse_reply(&reply, reply_code) {
                        return Ok(Some(pair));
                    }
                    if reply.len() >= REPLY_LIMIT {
                        return Ok(None);
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            },
            Ok(false) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
        attempts += 1;
    }

    Ok(None)
}

/// Find `ESC [ <code> ; <a> ; <b> t` anywhere in `buf` and return `(a, b)`
pub fn parse_reply(buf: &[u8], code: u8) -> Option<(i32, i32)> {
    let prefix = [0x1b, b'[', code, b';'];
    let mut rest = buf;

    while let Some(pos) = rest.windows(prefix.len()).position(|w| w == prefix) {
        if let Some(pair) = parse_pair(&rest[pos + prefix.len()..]) {
            return Some(pair);
        }
        rest = &rest[pos + 1..];
    }
    None
}

fn parse_pair(buf: &[u8]) -> Option<(i32, i32)> {
    let (first, rest) = leading_number(buf)?;
    let rest = rest.strip_prefix(b";")?;
    let (second, rest) = leading_number(rest)?;
    rest.strip_prefix(b"t")?;
    Some((first, second))
}

fn leading_number(buf: &[u8]) -> Option<(i32, &[u8])> {
    let digits = buf.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let value = std::str::from_utf8(&buf[..digits]).ok()?.parse().ok()?;
    Some((value, &buf[digits..]))
}
