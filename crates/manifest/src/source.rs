//! Document sources.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;

use crate::document::{parse_document, GherkinDocument, Result};

/// Turns a spec path into a structured document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load and parse the document at `path`.
    async fn load(&self, path: &Path) -> Result<GherkinDocument>;
}

/// Reads feature files from disk and parses them with `gherkin`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GherkinFileSource;

#[async_trait]
impl DocumentSource for GherkinFileSource {
    async fn load(&self, path: &Path) -> Result<GherkinDocument> {
        let content = fs::read_to_string(path).await?;
        parse_document(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentError;

    #[tokio::test]
    async fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.feature");
        std::fs::write(&path, "@BE\nFeature: A\n  Scenario: one\n").unwrap();

        let doc = GherkinFileSource.load(&path).await.unwrap();
        assert_eq!(doc.feature.unwrap().name, "A");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = GherkinFileSource.load(&dir.path().join("missing.feature")).await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }
}
