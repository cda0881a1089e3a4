//! CLI utilities and helpers

use crate::value::{format_number, Value};
use colored::*;
use std::path::PathBuf;

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".cyan().bold(), msg);
}

/// Colored one-line display of a value
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s).yellow().to_string(),
        Value::Number(n) => format_number(*n).cyan().to_string(),
        Value::Null => "undefined".dimmed().to_string(),
        Value::List(items) => {
            let formatted: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", formatted.join(", "))
        }
    }
}

/// Expand glob patterns into matching files, in pattern order
///
/// A pattern that matches nothing is kept as a literal path so the caller
/// reports it as missing.
pub fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob::glob(pattern)?.filter_map(|entry| entry.ok()).collect();
        if matched.is_empty() {
            paths.push(PathBuf::from(pattern));
        } else {
            matched.sort();
            paths.append(&mut matched);
        }
    }
    Ok(paths)
}
