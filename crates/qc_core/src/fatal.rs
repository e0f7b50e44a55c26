//! Fatal tier for broken internal invariants.
//!
//! These are programming errors in the runtime, never user errors; they
//! are not meant to be caught.

use std::fmt::Display;
use std::io::Write;

#[cold]
#[track_caller]
pub fn invariant(msg: impl Display) -> ! {
    tracing::error!(%msg, "internal invariant violated");
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();
    panic!("internal invariant violated: {msg}");
}
