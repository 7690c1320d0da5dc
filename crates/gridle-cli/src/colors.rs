//! ANSI styling for `gridle-run` output.
//!
//! Progress lines go to stdout and warnings to stderr; both use these escapes.

use std::io::{self, Write};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
/// Timings and graph file names.
pub const DIM: &str = "\x1b[2m";
/// Run summary on success.
pub const GREEN: &str = "\x1b[32m";
/// Skipped output lines and interrupts.
pub const YELLOW: &str = "\x1b[33m";
/// Graph records.
pub const CYAN: &str = "\x1b[36m";
/// Solver failure banner.
pub const RED: &str = "\x1b[31m";

/// Push a progress line out while the solver keeps running.
///
/// Stdout is block-buffered when piped, so without this a slow solver's
/// records would show up in bursts.
#[inline]
pub fn flush_stdout() {
    io::stdout().flush().ok();
}
