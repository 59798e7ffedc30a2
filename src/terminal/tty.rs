//! Controlling terminal handle
//!
//! Sixel output and the dtterm geometry queries both go to the controlling
//! terminal rather than stdout, which belongs to the protocol peer.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use super::geometry::{TerminalProbe, WindowSize};
use super::write::write_fully;

nix::ioctl_read_bad!(tiocgwinsz, libc::TIOCGWINSZ, libc::winsize);

/// POSIX name of the calling process's controlling terminal
pub const CONTROLLING_TERMINAL: &str = "/dev/tty";

/// Read/write handle on a terminal device
#[derive(Debug)]
pub struct Tty {
    file: File,
    path: PathBuf,
}

impl Tty {
    /// Open the controlling terminal
    pub fn open_controlling() -> io::Result<Self> {
        Self::open(CONTROLLING_TERMINAL)
    }

    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TerminalProbe for Tty {
    fn window_size(&self) -> io::Result<WindowSize> {
        let mut ws = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };

        // SAFETY: the fd is owned by self.file and stays open for the call;
        // TIOCGWINSZ writes exactly one struct winsize through the pointer.
        unsafe { tiocgwinsz(self.file.as_raw_fd(), &mut ws) }?;

        Ok(WindowSize {
            cols: ws.ws_col,
            rows: ws.ws_row,
            pixel_width: ws.ws_xpixel,
            pixel_height: ws.ws_ypixel,
        })
    }

    fn send_query(&mut self, seq: &[u8]) -> io::Result<()> {
        write_fully(&mut self.file, seq)?;
        self.file.flush()
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];

        if poll(&mut fds, PollTimeout::from(millis))? == 0 {
            return Ok(false);
        }
        Ok(fds[0].revents().is_some_and(|revents| !revents.is_empty()))
    }

    fn read_reply(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for Tty {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
