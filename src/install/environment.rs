//! Environment detection: is there an operator at the terminal?
//!
//! Decides whether a declined elevation prompt can be offered again and whether
//! progress bars are drawn.

use std::io::IsTerminal;

/// Check if an operator can answer prompts
///
/// Returns `false` if any of:
/// - stdin or stdout is not a terminal
/// - running under CI (`CI` env var set)
pub fn is_interactive() -> bool {
    if std::env::var_os("CI").is_some() {
        return false;
    }
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Check if output is going to a terminal, so progress bars make sense
pub fn wants_progress_bars() -> bool {
    std::io::stderr().is_terminal()
}
