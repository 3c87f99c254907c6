// src/interrupt.rs

//! Cooperative handling of SIGINT/SIGTERM/SIGHUP
//!
//! Once `install` has run, a termination signal no longer kills the process.
//! It only raises a process-wide flag. The running toolchain child is killed
//! by `process::run_with_timeout`, the orchestrator stops scheduling new
//! files, and every held package marker is written back before exit.

use std::sync::atomic::{AtomicBool, Ordering};

static REQUESTED: AtomicBool = AtomicBool::new(false);

/// Whether an interrupt has been requested
pub fn is_requested() -> bool {
    REQUESTED.load(Ordering::SeqCst)
}

/// Raise the interrupt flag, as a termination signal would
pub fn request() {
    REQUESTED.store(true, Ordering::SeqCst);
}

/// Route termination signals to the interrupt flag
#[cfg(unix)]
pub fn install() -> crate::Result<()> {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    extern "C" fn on_signal(_: nix::libc::c_int) {
        // Only an atomic store: async-signal-safe
        REQUESTED.store(true, Ordering::SeqCst);
    }

    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only touches an atomic
        unsafe { sigaction(signal, &action) }.map_err(std::io::Error::from)?;
    }
    tracing::debug!("Termination signals now stop the batch cooperatively");
    Ok(())
}

/// Route termination signals to the interrupt flag
#[cfg(not(unix))]
pub fn install() -> crate::Result<()> {
    Ok(())
}
