//! WebAssembly bindings for fmvars
//!
//! A JavaScript-friendly API for editor plugins: records are passed in as
//! JSON objects (or as a markdown document's own frontmatter) and results come
//! back as HTML or JSON strings.

use crate::render::{render_fragment, render_html, RenderOptions};
use crate::value::Record;
use crate::Evaluator;
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in the browser console
#[cfg(feature = "console_error_panic_hook")]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Result type returned to JavaScript
#[wasm_bindgen]
#[derive(Clone)]
pub struct FmvarsResult {
    success: bool,
    value: String,
    error: Option<String>,
}

#[wasm_bindgen]
impl FmvarsResult {
    /// Check if the operation was successful
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Get the result value (empty string if error)
    pub fn value(&self) -> String {
        self.value.clone()
    }

    /// Get the error message (empty string if success)
    pub fn error(&self) -> String {
        self.error.clone().unwrap_or_default()
    }
}

impl FmvarsResult {
    fn ok(value: String) -> Self {
        Self {
            success: true,
            value,
            error: None,
        }
    }

    fn err(error: String) -> Self {
        Self {
            success: false,
            value: String::new(),
            error: Some(error),
        }
    }
}

impl<E: std::fmt::Display> From<Result<String, E>> for FmvarsResult {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

/// Expression evaluator bound to one record
#[wasm_bindgen]
pub struct Fmvars {
    record: Record,
    options: RenderOptions,
}

impl Default for Fmvars {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Fmvars {
    /// Create an instance with an empty record
    #[wasm_bindgen(constructor)]
    pub fn new() -> Fmvars {
        #[cfg(feature = "console_error_panic_hook")]
        set_panic_hook();

        Fmvars {
            record: Record::new(),
            options: RenderOptions::default(),
        }
    }

    /// Replace the record with the fields of a JSON object
    pub fn load_json(&mut self, json: &str) -> FmvarsResult {
        match Record::from_json_str(json) {
            Ok(record) => {
                let count = record.len();
                self.record = record;
                FmvarsResult::ok(count.to_string())
            }
            Err(e) => FmvarsResult::err(e.to_string()),
        }
    }

    /// Replace the record with a markdown document's frontmatter
    pub fn load_markdown(&mut self, markdown: &str) -> FmvarsResult {
        match crate::frontmatter::parse_document(markdown) {
            Ok(document) => {
                let count = document.record.len();
                self.record = document.record;
                FmvarsResult::ok(count.to_string())
            }
            Err(e) => FmvarsResult::err(e.to_string()),
        }
    }

    /// Set the CSS class used for links
    pub fn set_link_class(&mut self, class: &str) {
        self.options.link_class = class.to_string();
    }

    /// Evaluate an expression; the value is returned as JSON
    pub fn evaluate(&self, expression: &str) -> FmvarsResult {
        let value = Evaluator::new(&self.record).evaluate_str(expression);
        serde_json::to_string(&value).into()
    }

    /// Evaluate and render an expression to HTML
    pub fn render(&self, expression: &str, show_prefix: bool, spread: bool) -> String {
        let value = Evaluator::new(&self.record).evaluate_str(expression);
        let options = self.options.clone().spread(spread);
        render_html(&value, Some(expression), show_prefix, &options)
    }

    /// Evaluate and render an expression to a JSON node tree
    pub fn render_tree(&self, expression: &str, show_prefix: bool, spread: bool) -> FmvarsResult {
        let value = Evaluator::new(&self.record).evaluate_str(expression);
        let options = self.options.clone().spread(spread);
        let fragment = render_fragment(&value, Some(expression), show_prefix, &options);
        serde_json::to_string(&fragment).into()
    }

    /// Render every placeholder of a document body against the loaded record
    pub fn render_body(&self, body: &str) -> FmvarsResult {
        crate::render_document(body, &self.record, &self.options).into()
    }

    /// Get the fmvars version
    pub fn version() -> String {
        crate::VERSION.to_string()
    }
}

fn with_record(frontmatter_json: &str) -> Result<Fmvars, FmvarsResult> {
    let mut fmvars = Fmvars::new();
    let loaded = fmvars.load_json(frontmatter_json);
    if loaded.is_success() {
        Ok(fmvars)
    } else {
        Err(loaded)
    }
}

/// Evaluate an expression against a JSON record; the value comes back as JSON
#[wasm_bindgen]
pub fn evaluate_json(expression: &str, frontmatter_json: &str) -> FmvarsResult {
    match with_record(frontmatter_json) {
        Ok(fmvars) => fmvars.evaluate(expression),
        Err(failure) => failure,
    }
}

/// Evaluate and render an expression against a JSON record
#[wasm_bindgen]
pub fn render_placeholder(
    expression: &str,
    frontmatter_json: &str,
    show_prefix: bool,
    spread: bool,
) -> FmvarsResult {
    match with_record(frontmatter_json) {
        Ok(fmvars) => FmvarsResult::ok(fmvars.render(expression, show_prefix, spread)),
        Err(failure) => failure,
    }
}

/// Evaluate and render an expression to a JSON node tree
#[wasm_bindgen]
pub fn render_tree_json(
    expression: &str,
    frontmatter_json: &str,
    show_prefix: bool,
    spread: bool,
) -> FmvarsResult {
    match with_record(frontmatter_json) {
        Ok(fmvars) => fmvars.render_tree(expression, show_prefix, spread),
        Err(failure) => failure,
    }
}

/// Render a markdown document against its own frontmatter
#[wasm_bindgen]
pub fn render_document(markdown: &str) -> FmvarsResult {
    crate::render_markdown(markdown, &RenderOptions::default()).into()
}

/// Names of the built-in functions
#[wasm_bindgen]
pub fn function_names() -> Vec<String> {
    crate::functions::registry().list_functions()
}
