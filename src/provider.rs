//! Record providers
//!
//! A provider supplies the record for a document. `Ok(None)` means the record
//! is not available yet (a document still being indexed, say); callers treat
//! that as an empty record so every field simply echoes as text.

use crate::error::Result;
use crate::frontmatter;
use crate::value::Record;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Provider trait - all record sources implement this
pub trait RecordProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Record for `document`, `None` when not yet available
    fn record(&self, document: &str) -> Result<Option<Record>>;
}

/// Fetch a document's record, falling back to the empty record
pub fn resolve_record(provider: &dyn RecordProvider, document: &str) -> Result<Record> {
    match provider.record(document)? {
        Some(record) => Ok(record),
        None => {
            debug!(
                provider = provider.name(),
                document, "record not available, using empty record"
            );
            Ok(Record::new())
        }
    }
}

/// In-memory records keyed by document name
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    records: HashMap<String, Record>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, document: impl Into<String>, record: Record) {
        self.records.insert(document.into(), record);
    }

    /// Builder-style insert
    pub fn with(mut self, document: impl Into<String>, record: Record) -> Self {
        self.insert(document, record);
        self
    }
}

impl RecordProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    fn record(&self, document: &str) -> Result<Option<Record>> {
        Ok(self.records.get(document).cloned())
    }
}

/// Reads records from files under a root directory
///
/// Document names are paths relative to the root. A file that does not exist
/// has no record yet.
#[derive(Debug, Clone)]
pub struct MarkdownProvider {
    root: PathBuf,
}

impl MarkdownProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Whether a link target names a document under the root
    ///
    /// `[[Note]]` matches `Note` or `Note.md`.
    pub fn link_exists(&self, target: &str) -> bool {
        self.root.join(target).is_file() || self.root.join(format!("{}.md", target)).is_file()
    }
}

impl RecordProvider for MarkdownProvider {
    fn name(&self) -> &str {
        "markdown"
    }

    fn record(&self, document: &str) -> Result<Option<Record>> {
        let path = self.root.join(document);
        if !path.is_file() {
            return Ok(None);
        }
        debug!(path = %path.display(), "loading record");
        frontmatter::load_record(&path).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_static_provider() {
        let provider =
            StaticProvider::new().with("note.md", Record::new().with("year", 1975i64));
        let record = resolve_record(&provider, "note.md").unwrap();
        assert_eq!(record.get("year"), Some(&Value::Number(1975.0)));
        assert_eq!(provider.name(), "static");
    }

    #[test]
    fn test_missing_record_is_empty() {
        let provider = StaticProvider::new();
        assert_eq!(provider.record("other.md").unwrap(), None);
        assert!(resolve_record(&provider, "other.md").unwrap().is_empty());
    }

    #[test]
    fn test_markdown_provider() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("note.md"),
            "---\nfirstname: Oscar\n---\n{{ firstname }}\n",
        )
        .unwrap();

        let provider = MarkdownProvider::new(dir.path());
        let record = resolve_record(&provider, "note.md").unwrap();
        assert_eq!(record.get("firstname"), Some(&Value::from("Oscar")));
        assert!(resolve_record(&provider, "absent.md").unwrap().is_empty());
    }

    #[test]
    fn test_markdown_provider_reports_bad_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.md"), "---\nkey: [unclosed\n---\n").unwrap();
        let provider = MarkdownProvider::new(dir.path());
        assert!(provider.record("bad.md").is_err());
    }

    #[test]
    fn test_link_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("William.md"), "").unwrap();
        std::fs::write(dir.path().join("image.png"), "").unwrap();

        let provider = MarkdownProvider::new(dir.path());
        assert!(provider.link_exists("William"));
        assert!(provider.link_exists("William.md"));
        assert!(provider.link_exists("image.png"));
        assert!(!provider.link_exists("Jane"));
    }
}
