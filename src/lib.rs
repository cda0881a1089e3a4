//! fmvars - Frontmatter variables
//!
//! A small expression language over a document's frontmatter. Expressions
//! reference fields, call a fixed set of built-in functions and combine
//! results with `+` and `-`; the resolved value is rendered to HTML (or an
//! equivalent node tree) for display inside the document.
//!
//! ```
//! use fmvars::{evaluate, render_expression, Record, RenderOptions};
//!
//! let record = Record::new()
//!     .with("firstname", "Oscar")
//!     .with("lastname", "Wilde");
//!
//! let value = evaluate("upper(firstname) + lastname", &record).unwrap();
//! assert_eq!(value.to_text(), "OSCARWilde");
//!
//! let html = render_expression("firstname", &record, true, &RenderOptions::default());
//! assert_eq!(html, "<b>Firstname: </b>Oscar");
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod frontmatter;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod provider;
pub mod render;
pub mod template;
pub mod value;

// CLI-only modules
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod repl;
#[cfg(feature = "cli")]
pub mod watch;

// Language bindings (organized under bindings module)
pub mod bindings;

use std::path::Path;

// Re-export commonly used types
pub use ast::{Expression, Operator};
pub use config::Config;
pub use error::{Error, Result};
pub use evaluator::Evaluator;
pub use functions::{registry, FunctionRegistry};
pub use provider::{resolve_record, MarkdownProvider, RecordProvider, StaticProvider};
pub use render::{render, Fragment, ListMode, Node, OutputMode, RenderOptions, Rendered};
pub use template::{parse_template, render_document, Template};
pub use value::{Record, Value};

/// Evaluate an expression against a record
///
/// Returns `None` when the result is undefined (an empty list's first item, a
/// field holding null, ...). Evaluation itself never fails.
pub fn evaluate(expression: &str, record: &Record) -> Option<Value> {
    Evaluator::new(record).evaluate_str(expression).into_defined()
}

/// Evaluate an expression and render it to HTML
pub fn render_expression(
    expression: &str,
    record: &Record,
    show_prefix: bool,
    options: &RenderOptions,
) -> String {
    let value = Evaluator::new(record).evaluate_str(expression);
    render::render_html(&value, Some(expression), show_prefix, options)
}

/// Render the placeholders of a markdown document against its own frontmatter
///
/// The frontmatter block is consumed; only the rendered body is returned.
pub fn render_markdown(text: &str, options: &RenderOptions) -> Result<String> {
    let document = frontmatter::parse_document(text)?;
    render_document(&document.body, &document.record, options)
}

/// Read and render a markdown document
pub fn render_file<P: AsRef<Path>>(path: P, options: &RenderOptions) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    render_markdown(&text, options)
}

/// fmvars version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
