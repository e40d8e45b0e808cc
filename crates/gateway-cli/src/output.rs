//! Human-readable status lines.

use owo_colors::OwoColorize as _;

pub fn step(message: &str) {
    println!("{} {message}", "→".cyan().bold());
}

pub fn success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

pub fn info(message: &str) {
    println!("{} {message}", "•".blue());
}

pub fn key_value(key: &str, value: &str) {
    println!("  {}: {value}", key.bold());
}

pub fn warning(message: &str) {
    eprintln!("{} {message}", "!".yellow().bold());
}

pub fn error(message: &str) {
    eprintln!("{} {message}", "✗".red().bold());
}
