//! Placeholder scanning and document rendering
//!
//! A document is split into text, code and `{{ ... }}` placeholders by a pest
//! grammar. Placeholders are evaluated against the document's record and
//! replaced by their rendered HTML; code spans and fenced blocks are copied
//! through as written.

use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::render::{render_fragment, Fragment, RenderOptions};
use crate::value::Record;
use pest::Parser;
use pest_derive::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[grammar = "template.pest"]
struct TemplateParser;

/// A `{{ ... }}` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    /// Expression text without the `!` and `...` markers
    pub expression: String,
    /// `{{ ! field }}`: render with a bold label
    pub show_prefix: bool,
    /// `{{ field... }}`: list items joined inline
    pub spread: bool,
    /// Original placeholder text, braces included
    pub source: String,
    /// Byte offset of the placeholder in the document
    pub offset: usize,
}

impl Placeholder {
    /// Evaluate against `record` and render to display nodes
    pub fn render(&self, record: &Record, options: &RenderOptions) -> Fragment {
        let value = Evaluator::new(record).evaluate_str(&self.expression);
        if value.is_null() {
            debug!(expression = %self.expression, "placeholder is undefined");
        }
        let options = options.clone().spread(self.spread);
        render_fragment(&value, Some(&self.expression), self.show_prefix, &options)
    }
}

/// Piece of a scanned document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    /// Inline code or a fenced block, never evaluated
    Code(String),
    Placeholder(Placeholder),
}

/// A scanned document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub chunks: Vec<Chunk>,
}

/// Rendered placeholder, as reported in tree output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedPlaceholder {
    pub expression: String,
    pub offset: usize,
    pub fragment: Fragment,
}

impl Template {
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            Chunk::Placeholder(placeholder) => Some(placeholder),
            _ => None,
        })
    }

    /// Substitute every placeholder with its rendered HTML
    pub fn render(&self, record: &Record, options: &RenderOptions) -> String {
        self.render_with_links(record, options, &|_| true)
    }

    /// Like [`Template::render`], rendering links whose target fails `exists`
    /// as broken links
    pub fn render_with_links(
        &self,
        record: &Record,
        options: &RenderOptions,
        exists: &(dyn Fn(&str) -> bool + Sync),
    ) -> String {
        self.chunks
            .par_iter()
            .map(|chunk| match chunk {
                Chunk::Text(text) | Chunk::Code(text) => text.clone(),
                Chunk::Placeholder(placeholder) => {
                    let mut fragment = placeholder.render(record, options);
                    fragment.mark_broken_links(exists);
                    fragment.to_html(options)
                }
            })
            .collect::<Vec<_>>()
            .concat()
    }

    /// Render each placeholder to display nodes, in document order
    pub fn render_placeholders(
        &self,
        record: &Record,
        options: &RenderOptions,
    ) -> Vec<RenderedPlaceholder> {
        let placeholders: Vec<&Placeholder> = self.placeholders().collect();
        placeholders
            .par_iter()
            .map(|placeholder| RenderedPlaceholder {
                expression: placeholder.expression.clone(),
                offset: placeholder.offset,
                fragment: placeholder.render(record, options),
            })
            .collect()
    }
}

/// Scan a document for placeholders
pub fn parse_template(input: &str) -> Result<Template> {
    let pairs = TemplateParser::parse(Rule::template, input).map_err(Box::new)?;

    let mut chunks: Vec<Chunk> = Vec::new();
    for pair in pairs.flatten() {
        match pair.as_rule() {
            Rule::fenced_code | Rule::inline_code => {
                chunks.push(Chunk::Code(pair.as_str().to_string()));
            }
            Rule::placeholder => {
                let offset = pair.as_span().start();
                let source = pair.as_str().to_string();
                let mut placeholder = Placeholder {
                    expression: String::new(),
                    show_prefix: false,
                    spread: false,
                    source,
                    offset,
                };
                for inner in pair.into_inner() {
                    match inner.as_rule() {
                        Rule::prefix => placeholder.show_prefix = true,
                        Rule::spread => placeholder.spread = true,
                        Rule::body => placeholder.expression = inner.as_str().trim().to_string(),
                        _ => {}
                    }
                }
                chunks.push(Chunk::Placeholder(placeholder));
            }
            Rule::text | Rule::stray => push_text(&mut chunks, pair.as_str()),
            _ => {}
        }
    }

    debug!(
        chunks = chunks.len(),
        placeholders = chunks
            .iter()
            .filter(|c| matches!(c, Chunk::Placeholder(_)))
            .count(),
        "scanned template"
    );
    Ok(Template { chunks })
}

/// Render a document's placeholders against `record`
pub fn render_document(input: &str, record: &Record, options: &RenderOptions) -> Result<String> {
    Ok(parse_template(input)?.render(record, options))
}

fn push_text(chunks: &mut Vec<Chunk>, text: &str) {
    if let Some(Chunk::Text(last)) = chunks.last_mut() {
        last.push_str(text);
    } else {
        chunks.push(Chunk::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> Record {
        Record::new()
            .with("year", 1975i64)
            .with("price", 7.5)
            .with("firstname", "Oscar")
            .with("friends", vec!["Alice", "Bob"])
            .with("due-date", "2024-01-01")
    }

    fn render(input: &str) -> String {
        render_document(input, &record(), &RenderOptions::default()).unwrap()
    }

    #[test]
    fn test_parse_placeholder_markers() {
        let template = parse_template("a {{ ! price }} b {{friends...}}").unwrap();
        let placeholders: Vec<&Placeholder> = template.placeholders().collect();
        assert_eq!(placeholders.len(), 2);
        assert_eq!(placeholders[0].expression, "price");
        assert!(placeholders[0].show_prefix);
        assert!(!placeholders[0].spread);
        assert_eq!(placeholders[0].offset, 2);
        assert_eq!(placeholders[0].source, "{{ ! price }}");
        assert_eq!(placeholders[1].expression, "friends");
        assert!(placeholders[1].spread);
    }

    #[test]
    fn test_render_document() {
        assert_eq!(render("Born {{ year }}."), "Born 1975.");
        assert_eq!(render("{{ ! price }}"), "<b>Price: </b>7.5");
        assert_eq!(render("{{ friends... }}"), "Alice, Bob");
        assert_eq!(render("{{ friends }}"), "Alice<br />Bob");
        assert_eq!(render("{{ upper(firstname) }}!"), "OSCAR!");
        assert_eq!(render("{{ due-date }}"), "2024-01-01");
    }

    #[test]
    fn test_code_is_untouched() {
        assert_eq!(render("`{{ year }}` {{ year }}"), "`{{ year }}` 1975");
        assert_eq!(
            render("```\n{{ year }}\n```\n{{ year }}"),
            "```\n{{ year }}\n```\n1975"
        );
        assert_eq!(render("```\n{{ year }}"), "```\n{{ year }}");
    }

    #[test]
    fn test_malformed_placeholders_are_text() {
        assert_eq!(render("{{ year"), "{{ year");
        assert_eq!(render("{{}}"), "{{}}");
        assert_eq!(render("{{ a\nb }}"), "{{ a\nb }}");
        assert_eq!(render("x ` y"), "x ` y");
        assert_eq!(render("{{ {{ year }}"), "{{ 1975");
    }

    #[test]
    fn test_undefined_renders_empty() {
        assert_eq!(render("[{{ first() }}]"), "[]");
    }

    #[test]
    fn test_text_chunks_are_merged() {
        let template = parse_template("a {{ b").unwrap();
        assert_eq!(template.chunks, vec![Chunk::Text("a {{ b".to_string())]);
    }

    #[test]
    fn test_render_placeholders_tree() {
        let template = parse_template("{{ friends }} and {{ year }}").unwrap();
        let rendered = template.render_placeholders(&record(), &RenderOptions::default());
        assert_eq!(rendered.len(), 2);
        assert_eq!(rendered[0].expression, "friends");
        assert_eq!(rendered[0].fragment.nodes.len(), 3);
        assert_eq!(rendered[1].offset, 18);
    }

    #[test]
    fn test_deeply_nested_placeholder_renders_on_worker_threads() {
        let depth = 10_000;
        let input = format!("{{{{ {}x{} }}}}", "upper(".repeat(depth), ")".repeat(depth));
        let output = render(&input);
        assert!(output.starts_with("UPPER(UPPER("));
        assert!(output.ends_with("X))"));
    }

    #[test]
    fn test_render_with_links_marks_missing_targets() {
        let record = Record::new().with("parents", vec!["[[William]]", "[[Jane]]"]);
        let template = parse_template("{{ parents... }}").unwrap();
        let output = template.render_with_links(&record, &RenderOptions::default(), &|target| {
            target == "William"
        });
        assert_eq!(
            output,
            "<a class=\"internal-link\" data-href=\"William\" href=\"William\">William</a>, \
             <span class=\"broken-link\">Jane</span>"
        );
    }
}
