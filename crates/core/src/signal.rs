use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

static RUNNING: AtomicBool = AtomicBool::new(true);

extern "C" fn handle_signal(_: libc::c_int) {
  RUNNING.store(false, Ordering::SeqCst);
}

/// Install `SIGINT`/`SIGTERM` handlers that flip a process-wide running
/// flag. A signal handler cannot safely capture a closure, so this is the
/// one deliberate global in this crate -- it mirrors the reference
/// implementation's `volatile sig_atomic_t running`.
pub fn install() {
  RUNNING.store(true, Ordering::SeqCst);
  let action = SigAction::new(SigHandler::Handler(handle_signal), SaFlags::empty(), SigSet::empty());
  // Safety: `handle_signal` only performs an atomic store, which is
  // async-signal-safe.
  unsafe {
    let _ = signal::sigaction(Signal::SIGINT, &action);
    let _ = signal::sigaction(Signal::SIGTERM, &action);
  }
}

/// Whether a shutdown signal has been received since the last `install()`.
pub fn is_running() -> bool {
  RUNNING.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_to_running() {
    // Not calling `install()` here: doing so would affect the whole test
    // binary's signal disposition, not just this test.
    assert!(RUNNING.load(Ordering::SeqCst));
  }
}
