// Dispatcher - the w3mimgdisplay command loop
//
// Reads one line per command from the protocol peer, applies any pending
// resize, then routes the command:
// - DRAW/REDRAW: cursor move on the terminal, then the encoder call-out
// - STOP/SYNC/NOP: bare newline on stdout
// - GETSIZE: cell-rounded natural size on stdout ("0 0" on failure)
// - CLEAR: rectangular erase on the terminal
//
// Malformed lines are dropped without a response. Terminal write failures are
// logged and the loop continues; a failed stdout write means the peer is gone
// and ends the loop.

use std::io::{self, BufRead, ErrorKind, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{Config, GeometryConfig};
use crate::emitter::{emit_clear, emit_cursor, round_to_cells};
use crate::encoder::{EncodeRequest, ImageBackend};
use crate::protocol::{bytes_to_path, ClearRequest, Command, DrawRequest, ParsedCommand};
use crate::terminal::geometry::after_resize;
use crate::terminal::{write_fully, ResizeFlag, TerminalGeometry, TerminalProbe};

pub struct Dispatcher<T, B, O> {
    terminal: T,
    backend: B,
    out: O,
    geometry: TerminalGeometry,
    resize: ResizeFlag,
    max_image: usize,
    geometry_config: GeometryConfig,
}

impl<T, B, O> Dispatcher<T, B, O>
where
    T: TerminalProbe + Write,
    B: ImageBackend,
    O: Write,
{
    pub fn new(terminal: T, backend: B, out: O, geometry: TerminalGeometry, config: &Config) -> Self {
        Self {
            terminal,
            backend,
            out,
            geometry,
            resize: ResizeFlag::global(),
            max_image: config.max_image,
            geometry_config: config.geometry.clone(),
        }
    }

    #[cfg(test)]
    pub fn with_resize_flag(mut self, flag: ResizeFlag) -> Self {
        self.resize = flag;
        self
    }

    /// Process lines until end of input
    pub fn run<R: BufRead>(&mut self, mut input: R) -> io::Result<()> {
        let mut line = Vec::with_capacity(1024);

        loop {
            line.clear();
            match input.read_until(b'\n', &mut line) {
                Ok(0) => {
                    info!("end of input");
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            self.apply_pending_resize();
            self.handle_line(&line)?;
        }
    }

    /// Recompute geometry if SIGWINCH arrived since the last command
    pub fn apply_pending_resize(&mut self) {
        if !self.resize.take() {
            return;
        }

        self.geometry = after_resize(&self.terminal, &self.geometry, &self.geometry_config);
        info!(
            width = self.geometry.pixel_width,
            height = self.geometry.pixel_height,
            cell_width = self.geometry.cell_width,
            cell_height = self.geometry.cell_height,
            "window resized"
        );
    }

    /// Handle one raw input line, with or without its terminator
    pub fn handle_line(&mut self, line: &[u8]) -> io::Result<()> {
        let line = strip_line_ending(line);
        debug!(line = %String::from_utf8_lossy(line), "read");

        let Some(parsed) = ParsedCommand::parse(line) else {
            debug!("ignoring line without a valid op code");
            return Ok(());
        };

        let (op, argc) = (parsed.op, parsed.argc());
        match parsed.into_command(self.max_image) {
            Some(command) => self.dispatch(command),
            None => {
                debug!(op = op.as_str(), argc, "ignoring command with wrong argument count");
                Ok(())
            }
        }
    }

    fn dispatch(&mut self, command: Command<'_>) -> io::Result<()> {
        match command {
            Command::Draw(req) | Command::Redraw(req) => {
                self.draw(&req);
                Ok(())
            }
            Command::Stop | Command::Sync | Command::Nop => respond(&mut self.out, b"\n"),
            Command::GetSize(path) => report_size(
                &mut self.backend,
                &mut self.out,
                &self.geometry,
                bytes_to_path(path),
            ),
            Command::Clear(req) => {
                self.clear(&req);
                Ok(())
            }
        }
    }

    fn draw(&mut self, req: &DrawRequest<'_>) {
        debug!(
            index = req.index,
            x = req.offset_x,
            y = req.offset_y,
            cw = self.geometry.cell_width,
            ch = self.geometry.cell_height,
            "draw"
        );

        if let Err(e) = emit_cursor(&mut self.terminal, &self.geometry, req.offset_x, req.offset_y) {
            warn!(error = %e, "cursor move failed");
            return;
        }

        if let Err(e) = self.backend.encode(&EncodeRequest::from(req), &mut self.terminal) {
            warn!(error = %e, path = %req.path().display(), "encode failed");
        }
    }

    fn clear(&mut self, req: &ClearRequest) {
        debug!(?req, "clear");
        if let Err(e) = emit_clear(&mut self.terminal, &self.geometry, req) {
            warn!(error = %e, "clear failed");
        }
    }
}

/// GETSIZE: print the cell-rounded natural size of `path`, or `0 0`
///
/// Shared by the command loop and the `--size` startup flag.
pub fn report_size<B, O>(
    backend: &mut B,
    out: &mut O,
    geometry: &TerminalGeometry,
    path: &Path,
) -> io::Result<()>
where
    B: ImageBackend + ?Sized,
    O: Write + ?Sized,
{
    let response = match backend.natural_size(path) {
        Ok((width, height)) => {
            let (width, height) = round_to_cells(geometry, width, height);
            debug!(width, height, path = %path.display(), "image size");
            format!("{width} {height}\n")
        }
        Err(e) => {
            warn!(error = %e, "getsize failed");
            "0 0\n".to_string()
        }
    };
    respond(out, response.as_bytes())
}

/// Write a protocol response and flush it to the peer
fn respond<O: Write + ?Sized>(out: &mut O, bytes: &[u8]) -> io::Result<()> {
    write_fully(out, bytes)?;
    out.flush()
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
