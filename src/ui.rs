//! Terminal output
//!
//! Standard output carries only version text so it can be captured by scripts;
//! everything else goes to standard error.

use console::style;

/// Print an error message in red on standard error.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Print a status message with a yellow arrow on standard error.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

/// Print a version on standard output, unstyled
pub fn display_version(version: &impl std::fmt::Display) {
    println!("{}", version);
}
