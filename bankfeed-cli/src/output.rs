//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print a dimmed hint line under an error
pub fn hint(msg: &str) {
    eprintln!("  {} {}", "hint:".yellow(), msg);
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Two decimal places, with an explicit sign for money in
pub fn format_signed(amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        format!("+{:.2}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Stored amounts are unsigned; direction comes from `is_income`
pub fn format_stored(amount: Decimal, is_income: bool) -> String {
    if is_income {
        format!("+{:.2}", amount)
    } else {
        format!("-{:.2}", amount)
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
