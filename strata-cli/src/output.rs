//! Styled terminal output utilities.

use owo_colors::OwoColorize;
use strata_migrate::MANUAL_INTERVENTION;

/// Print a header/title
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Print a section header
pub fn section(text: &str) {
    println!("{}", text.bold().white());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a success message
pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

/// Print an info message
pub fn info(text: &str) {
    println!("{} {}", "ℹ".blue().bold(), text);
}

/// Print a warning message
pub fn warn(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Print an error message
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

/// Print a step indicator
pub fn step(current: usize, total: usize, text: &str) {
    println!("{} {}", format!("[{}/{}]", current, total).dimmed(), text);
}

/// Print a list item
pub fn list_item(text: &str) {
    println!("  {} {}", "•".dimmed(), text);
}

/// Print a newline
pub fn newline() {
    println!();
}

/// Print dimmed text
pub fn dim(text: &str) {
    println!("{}", text.dimmed());
}

/// State of a migration in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationMark {
    Applied,
    Pending,
    Drifted,
}

/// Print one migration line prefixed by its state.
pub fn migration(mark: MigrationMark, text: &str) {
    let symbol = match mark {
        MigrationMark::Applied => "✔".green().to_string(),
        MigrationMark::Pending => "○".yellow().to_string(),
        MigrationMark::Drifted => "✖".red().to_string(),
    };
    list_item(&format!("{} {}", symbol, text));
}

/// Leading characters of a hex checksum, enough to tell files apart.
pub fn short_checksum(checksum: &str) -> &str {
    checksum.get(..12).unwrap_or(checksum)
}

/// Print titled SQL, dimming comment lines and manual-intervention markers.
pub fn sql_block(title: &str, sql: &str) {
    section(title);
    println!();
    if sql.trim().is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    for line in sql.lines() {
        if line.starts_with(MANUAL_INTERVENTION) {
            println!("  {}", line.yellow());
        } else if line.trim_start().starts_with("--") {
            println!("  {}", line.dimmed());
        } else {
            println!("  {}", line.bright_white());
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_checksum() {
        assert_eq!(short_checksum("0123456789abcdef"), "0123456789ab");
        assert_eq!(short_checksum("abc"), "abc");
    }
}
