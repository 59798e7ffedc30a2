// Terminal module - everything that touches the controlling terminal
//
// - tty: the /dev/tty handle (ioctl, poll, raw reads and writes)
// - geometry: three-tier pixel/cell size detection
// - resize: SIGWINCH flag consumed by the command loop
// - write: retrying write primitive shared by all terminal output

pub mod geometry;
pub mod resize;
pub mod tty;
pub mod write;

pub use geometry::{TerminalGeometry, TerminalProbe};
pub use resize::{install_resize_handler, ResizeFlag};
pub use tty::Tty;
pub use write::write_fully;
