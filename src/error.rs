//! Error handling and formatting for fmvars
//!
//! The expression core never fails. These errors come from the layers around
//! it: reading documents, parsing frontmatter and configuration, scanning
//! templates and watching files.

use colored::Colorize;
use pest::error::{Error as PestError, ErrorVariant, LineColLocation};
use thiserror::Error;

use crate::template::Rule;

/// Result alias used throughout the host-facing API
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Template parse error: {0}")]
    Template(#[from] Box<PestError<Rule>>),

    #[error("Invalid frontmatter: {0}")]
    Frontmatter(String),

    #[cfg(feature = "cli")]
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Format a template parse error with the offending line and a caret
pub fn format_template_error(error: &PestError<Rule>, input: &str) -> String {
    let mut output = String::new();

    let (line, col) = match error.line_col {
        LineColLocation::Pos((line, col)) => (line, col),
        LineColLocation::Span((line, col), _) => (line, col),
    };

    output.push_str(&format!(
        "{} {}\n",
        "Template error:".red().bold(),
        error.variant.message()
    ));
    output.push_str(&format!(
        "  {} {}\n",
        "-->".blue().bold(),
        format!("{}:{}", line, col).cyan()
    ));

    let lines: Vec<&str> = input.lines().collect();
    if line > 0 && line <= lines.len() {
        output.push_str(&format!("   {}\n", "|".blue()));
        output.push_str(&format!(
            " {} | {}\n",
            format!("{:3}", line).blue().bold(),
            lines[line - 1]
        ));
        let indicator = format!("{}^", " ".repeat(col.saturating_sub(1) + 7));
        output.push_str(&format!("   {} {}\n", "|".blue(), indicator.red().bold()));
    }

    if let ErrorVariant::ParsingError { positives, .. } = &error.variant {
        if !positives.is_empty() {
            let expected: Vec<String> = positives.iter().map(format_rule_name).collect();
            output.push_str(&format!(
                "  {} {}\n",
                "Expected:".green().bold(),
                expected.join(", ")
            ));
        }
        if positives.contains(&Rule::body) {
            output.push_str(&format!(
                "  {} placeholders need an expression: {{{{ field }}}}\n",
                "Hint:".yellow().bold()
            ));
        }
    }

    output
}

fn format_rule_name(rule: &Rule) -> String {
    match rule {
        Rule::EOI => "end of input".to_string(),
        Rule::placeholder => "placeholder".to_string(),
        Rule::body => "expression".to_string(),
        Rule::prefix => "'!'".to_string(),
        Rule::spread => "'...'".to_string(),
        Rule::inline_code | Rule::fenced_code => "code".to_string(),
        _ => format!("{:?}", rule).to_lowercase(),
    }
}
