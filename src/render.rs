//! Rendering of resolved values for display
//!
//! A value is first turned into a [`Fragment`], a flat list of display nodes
//! (bold label, text, link, broken link, line break). The HTML string output is produced
//! from the fragment, so both output modes always carry the same content.

use crate::value::Value;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref WIKILINK: Regex = Regex::new(r"^\[\[([^\]|]+)(?:\|([^\]]+))?\]\]$").unwrap();
    static ref INNERMOST_CALL: Regex = Regex::new(r"([a-zA-Z_][a-zA-Z0-9_]*)\(([^()]*)\)").unwrap();
    static ref LABEL_SEPARATOR: Regex = Regex::new(r"[^a-zA-Z0-9_\-.]+").unwrap();
    static ref PLAIN_NUMBER: Regex = Regex::new(r"^\d+(?:\.\d+)?$").unwrap();
    static ref JOIN_CALL: Regex = Regex::new(r"(?i)^\s*join\s*\(").unwrap();
}

/// Output representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Html,
    Tree,
}

/// How list items are separated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListMode {
    #[default]
    LineBreaks,
    Spread,
}

/// Rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub list_mode: ListMode,
    /// CSS class of rendered links
    pub link_class: String,
    /// CSS class of links whose target does not exist
    pub broken_link_class: String,
    /// Markup emitted for a line break
    pub line_break: String,
    /// Text between list items in spread mode
    pub spread_separator: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            list_mode: ListMode::LineBreaks,
            link_class: "internal-link".to_string(),
            broken_link_class: "broken-link".to_string(),
            line_break: "<br />".to_string(),
            spread_separator: ", ".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn spread(mut self, spread: bool) -> Self {
        self.list_mode = if spread {
            ListMode::Spread
        } else {
            ListMode::LineBreaks
        };
        self
    }
}

/// A display node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    /// Bold field label such as `Price: `
    Label { text: String },
    Text { text: String },
    /// Internal link to `target`, shown as `display`
    Link { target: String, display: String },
    /// Link whose target was checked and not found
    BrokenLink { target: String, display: String },
    LineBreak,
}

/// Ordered display nodes for one rendered value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub nodes: Vec<Node>,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Turn every link whose target fails `exists` into a broken link
    pub fn mark_broken_links<F>(&mut self, exists: F)
    where
        F: Fn(&str) -> bool,
    {
        for node in &mut self.nodes {
            if let Node::Link { target, display } = node {
                if !exists(target) {
                    *node = Node::BrokenLink {
                        target: std::mem::take(target),
                        display: std::mem::take(display),
                    };
                }
            }
        }
    }

    /// Serialize the fragment as HTML, escaping all text
    pub fn to_html(&self, options: &RenderOptions) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Label { text } => {
                    out.push_str("<b>");
                    out.push_str(&escape(text));
                    out.push_str("</b>");
                }
                Node::Text { text } => out.push_str(&escape(text)),
                Node::Link { target, display } => {
                    let target = escape(target);
                    out.push_str(&format!(
                        "<a class=\"{}\" data-href=\"{}\" href=\"{}\">{}</a>",
                        escape(&options.link_class),
                        target,
                        target,
                        escape(display)
                    ));
                }
                Node::BrokenLink { display, .. } => {
                    out.push_str(&format!(
                        "<span class=\"{}\">{}</span>",
                        escape(&options.broken_link_class),
                        escape(display)
                    ));
                }
                Node::LineBreak => out.push_str(&options.line_break),
            }
        }
        out
    }

    /// Text content without markup, links shown by their display text
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Label { text } | Node::Text { text } => out.push_str(text),
                Node::Link { display, .. } | Node::BrokenLink { display, .. } => {
                    out.push_str(display)
                }
                Node::LineBreak => out.push('\n'),
            }
        }
        out
    }
}

/// Rendered output in the requested mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Html(String),
    Tree(Fragment),
}

impl Rendered {
    pub fn into_html(self, options: &RenderOptions) -> String {
        match self {
            Rendered::Html(html) => html,
            Rendered::Tree(fragment) => fragment.to_html(options),
        }
    }
}

/// Render a resolved value
///
/// `expression` is the text the value came from; it supplies the label when
/// `show_prefix` is set and decides whether a list was already joined.
pub fn render(
    value: &Value,
    expression: Option<&str>,
    show_prefix: bool,
    mode: OutputMode,
    options: &RenderOptions,
) -> Rendered {
    let fragment = render_fragment(value, expression, show_prefix, options);
    match mode {
        OutputMode::Html => Rendered::Html(fragment.to_html(options)),
        OutputMode::Tree => Rendered::Tree(fragment),
    }
}

/// Render a resolved value to an HTML string
pub fn render_html(
    value: &Value,
    expression: Option<&str>,
    show_prefix: bool,
    options: &RenderOptions,
) -> String {
    render_fragment(value, expression, show_prefix, options).to_html(options)
}

/// Render a resolved value to display nodes
///
/// Undefined values render as nothing at all, label included.
pub fn render_fragment(
    value: &Value,
    expression: Option<&str>,
    show_prefix: bool,
    options: &RenderOptions,
) -> Fragment {
    let mut nodes = Vec::new();
    if value.is_null() {
        return Fragment { nodes };
    }

    if show_prefix {
        nodes.push(Node::Label {
            text: label(expression.unwrap_or_default()),
        });
        if value.is_list() {
            nodes.push(Node::LineBreak);
        }
    }

    match value {
        Value::List(items) if expression.is_some_and(|e| JOIN_CALL.is_match(e)) => {
            let joined = items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(", ");
            nodes.push(Node::Text { text: joined });
        }
        Value::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    nodes.push(match options.list_mode {
                        ListMode::LineBreaks => Node::LineBreak,
                        ListMode::Spread => Node::Text {
                            text: options.spread_separator.clone(),
                        },
                    });
                }
                nodes.push(linkify(item));
            }
        }
        scalar => nodes.push(linkify(scalar)),
    }

    Fragment { nodes }
}

/// Turn `[[target]]` or `[[target|display]]` into a link, anything else into text
pub fn linkify(value: &Value) -> Node {
    if let Value::String(s) = value {
        if let Some(caps) = WIKILINK.captures(s.trim()) {
            let target = caps[1].trim().to_string();
            let display = caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| target.clone());
            return Node::Link { target, display };
        }
    }
    Node::Text {
        text: value.to_text(),
    }
}

/// Derive the `Field: ` label for an expression
///
/// Call wrappers are stripped and the first token that is not a plain number
/// is capitalized, so `upper(firstname)` is labelled `Firstname: `.
pub fn label(expression: &str) -> String {
    let mut cleaned = expression.to_string();
    while INNERMOST_CALL.is_match(&cleaned) {
        cleaned = INNERMOST_CALL.replacen(&cleaned, 1, "$2").into_owned();
    }
    let name = LABEL_SEPARATOR
        .split(&cleaned)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .find(|part| !PLAIN_NUMBER.is_match(part))
        .unwrap_or(expression);
    format!("{}: ", capitalize(name))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Escape the five HTML-sensitive characters
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
