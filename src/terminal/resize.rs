//! SIGWINCH bridge
//!
//! The handler only raises an atomic flag. The command loop consumes it
//! between lines and recomputes geometry there, outside signal context.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

static RESIZE_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigwinch(_: libc::c_int) {
    RESIZE_PENDING.store(true, Ordering::SeqCst);
}

/// Install the SIGWINCH handler
///
/// `SA_RESTART` keeps the blocking stdin read going across a resize.
pub fn install_resize_handler() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_sigwinch),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe { sigaction(Signal::SIGWINCH, &action) }?;
    Ok(())
}

/// Handle on a pending-resize flag
#[derive(Debug, Clone, Copy)]
pub struct ResizeFlag(&'static AtomicBool);

impl ResizeFlag {
    /// The flag raised by the installed SIGWINCH handler
    pub fn global() -> Self {
        Self(&RESIZE_PENDING)
    }

    #[cfg(test)]
    pub fn from_static(flag: &'static AtomicBool) -> Self {
        Self(flag)
    }

    #[cfg(test)]
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Consume a pending resize; true at most once per burst of signals
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}
