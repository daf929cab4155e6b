//! Console output helpers
//!
//! Status lines go to stdout, errors and warnings to stderr. `console`
//! drops the colors on its own when the stream is not a terminal.

use crate::error::FmtdError;
use console::style;

/// Display a success step with detail
pub fn step_ok_detail(message: &str, detail: &str) {
    println!("  {} {} ({})", style("[OK]").green(), message, style(detail).dim());
}

/// Display a warning step with hint
pub fn step_warn_hint(message: &str, hint: &str) {
    eprintln!(
        "  {} {} - {}",
        style("[WARN]").yellow().for_stderr(),
        message,
        style(hint).dim().for_stderr()
    );
}

/// Print an error and its hint, if any
pub fn error(e: &FmtdError) {
    eprintln!("{} {}", style("Error:").red().bold().for_stderr(), e);
    if let Some(hint) = e.hint() {
        eprintln!("{} {}", style("Hint:").yellow().for_stderr(), hint);
    }
}
