//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use optimizer_lib::RiskLevel;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table, or a warning when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Format a ratio in [0, 1] as a percentage
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Shorten long ids for table display
pub fn truncate_id(id: &str) -> String {
    const MAX: usize = 24;
    if id.chars().count() > MAX {
        let head: String = id.chars().take(MAX - 3).collect();
        format!("{}...", head)
    } else {
        id.to_string()
    }
}

/// Color a risk or priority level
pub fn color_level(level: RiskLevel) -> String {
    let text = level.as_str();
    match level {
        RiskLevel::Low => text.green().to_string(),
        RiskLevel::Medium => text.yellow().to_string(),
        RiskLevel::High => text.red().to_string(),
        RiskLevel::Critical => text.red().bold().to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f64) -> String {
    let formatted = format_percent(confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
