//! Pretty-printing messages to the console

use colored::Colorize;

/// Pretty-print an error message to the console
pub fn error(message: String) {
    let error_title = "error:".red().bold();
    eprintln!("{} {}", error_title, message);
}

/// Pretty-print a warning message to the console
pub fn warning(message: String, line_number: usize) {
    let warning = "warning:".yellow().bold();
    eprintln!("{} line {}: {}", warning, line_number, message);
}

/// Print an indented, unprefixed follow-up detail for the preceding
/// error or warning
pub fn note(message: String) {
    eprintln!("    {}", message);
}
