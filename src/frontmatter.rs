//! Frontmatter extraction
//!
//! A markdown document may open with a YAML block fenced by `---` lines. The
//! block becomes the document's [`Record`]; the rest is the body that carries
//! the placeholders.

use crate::error::{Error, Result};
use crate::value::Record;
use std::path::Path;
use tracing::debug;

/// A markdown document split into its record and body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub record: Record,
    pub body: String,
    /// Whether the document opened with a frontmatter block
    pub has_frontmatter: bool,
}

/// Split a document into its raw frontmatter block and body
///
/// Returns `None` for the block when the document does not start with a
/// `---` line. An opening fence without a closing `---` (or `...`) line is an
/// error.
pub fn split(text: &str) -> Result<(Option<&str>, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let Some(first_end) = line_end(text, 0) else {
        return Ok((None, text));
    };
    if text[..first_end].trim_end() != "---" {
        return Ok((None, text));
    }

    let block_start = next_line(text, first_end);
    let mut pos = block_start;
    while pos < text.len() {
        let end = line_end(text, pos).unwrap_or(text.len());
        let line = text[pos..end].trim_end();
        if line == "---" || line == "..." {
            let body_start = next_line(text, end);
            return Ok((Some(&text[block_start..pos]), &text[body_start..]));
        }
        pos = next_line(text, end);
    }

    Err(Error::Frontmatter(
        "frontmatter block has no closing '---' line".to_string(),
    ))
}

/// Parse a markdown document into its record and body
pub fn parse_document(text: &str) -> Result<Document> {
    let (block, body) = split(text)?;
    let record = match block {
        Some(yaml) => Record::from_yaml_str(yaml)?,
        None => Record::new(),
    };
    debug!(fields = record.len(), "parsed frontmatter");
    Ok(Document {
        record,
        body: body.to_string(),
        has_frontmatter: block.is_some(),
    })
}

/// Load a record from a file
///
/// `.json` files are JSON objects, `.yaml`/`.yml` files are plain YAML
/// mappings, and anything else is treated as markdown with frontmatter.
pub fn load_record<P: AsRef<Path>>(path: P) -> Result<Record> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => Record::from_json_str(&content),
        Some("yaml") | Some("yml") => Record::from_yaml_str(&content),
        _ => Ok(parse_document(&content)?.record),
    }
}

/// Byte index of the newline ending the line at `start`, or `None` at EOF
fn line_end(text: &str, start: usize) -> Option<usize> {
    if start >= text.len() {
        return None;
    }
    Some(
        text[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(text.len()),
    )
}

fn next_line(text: &str, end: usize) -> usize {
    (end + 1).min(text.len())
}
