//! Output formatting for CLI commands.

use std::str::FromStr;

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}' (expected table or json)")),
        }
    }
}

/// Print rows in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                println!("{}", Table::new(data));
            }
        }
        OutputFormat::Json => println!("{}", format_json(data)),
    }
}

/// Print a success message (table format only).
pub fn print_success(message: &str, format: OutputFormat) {
    if format == OutputFormat::Table {
        println!("{} {}", "Converged:".green().bold(), message);
    }
}

fn format_json<T: Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
}
