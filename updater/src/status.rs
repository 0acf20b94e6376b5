//! Operator-facing status lines
//!
//! Every line is printed to stdout with a coloured prefix and mirrored as a
//! `debug` tracing event so the log file carries the same narrative.

use colored::Colorize;
use tracing::debug;

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{} {}", "==>".blue().bold(), title.bold());
    debug!(kind = "section", "{}", title);
}

/// Print an informational line
pub fn info(message: &str) {
    println!("{} {}", "[INFO]".cyan().bold(), message);
    debug!(kind = "info", "{}", message);
}

/// Print a success line
pub fn success(message: &str) {
    println!("{} {}", "[ OK ]".green().bold(), message);
    debug!(kind = "success", "{}", message);
}

/// Print a warning line
pub fn warn(message: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), message);
    debug!(kind = "warn", "{}", message);
}

/// Print an error line to stderr
pub fn error(message: &str) {
    eprintln!("{} {}", "[FAIL]".red().bold(), message);
    debug!(kind = "error", "{}", message);
}
