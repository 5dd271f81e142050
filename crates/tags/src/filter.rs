//! Spec filtering by tag expression.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::evaluator::evaluate;
use crate::extractor::TagExtractor;
use crate::parser::{ExpressionParser, Result};

/// Extension of the spec files that carry tags.
pub const FEATURE_EXTENSION: &str = ".feature";

/// Reduces a spec list to the specs whose feature-level tags match an
/// expression.
///
/// Only the tags above the `Feature:` line take part; a tag that appears
/// on scenarios alone does not select its file.
#[derive(Debug, Clone)]
pub struct SpecFilter {
    extractor: TagExtractor,
    parser: ExpressionParser,
}

impl SpecFilter {
    /// Create a filter.
    pub fn new(extractor: TagExtractor, parser: ExpressionParser) -> Self {
        Self { extractor, parser }
    }

    /// The extractor used to read tags.
    pub fn extractor(&self) -> &TagExtractor {
        &self.extractor
    }

    /// Check whether a tag set satisfies an expression.
    ///
    /// A blank expression matches without being parsed.
    pub fn matches_expression<S: AsRef<str>>(&self, tags: &[S], expression: &str) -> Result<bool> {
        if expression.trim().is_empty() {
            return Ok(true);
        }

        let parsed = self.parser.parse(expression)?;
        let result = evaluate(parsed.as_ref(), tags);

        debug!(
            "Tags {:?} {} expression: {}",
            tags.iter().map(|t| t.as_ref()).collect::<Vec<_>>(),
            if result { "match" } else { "do not match" },
            expression
        );

        Ok(result)
    }

    /// Keep the specs whose tags match, preserving input order.
    pub async fn filter_features(&self, paths: &[PathBuf], expression: &str) -> Result<Vec<PathBuf>> {
        if expression.trim().is_empty() {
            return Ok(paths.to_vec());
        }

        let all_tags = self.extractor.feature_tags_all(paths).await;

        let mut filtered = Vec::new();
        for (path, tags) in paths.iter().zip(all_tags) {
            if self.matches_expression(&tags[..], expression)? {
                filtered.push(path.clone());
            }
        }

        Ok(filtered)
    }

    /// Filter a mixed suite: `.feature` files are filtered by tags, every
    /// other file passes through after them.
    pub async fn filter_suite(&self, paths: &[PathBuf], expression: &str) -> Result<Vec<PathBuf>> {
        let (features, others): (Vec<PathBuf>, Vec<PathBuf>) =
            paths.iter().cloned().partition(|p| is_feature(p));

        if features.is_empty() {
            info!("No .feature files found, skipping tag filtering");
            return Ok(paths.to_vec());
        }

        info!("Filtering {} feature file(s) by tags...", features.len());
        let mut result = self.filter_features(&features, expression).await?;

        info!(
            "Features after filtering: {} (filtered out {} from {})",
            result.len(),
            features.len() - result.len(),
            features.len()
        );

        result.extend(others);
        Ok(result)
    }
}

/// Whether a path names a feature file.
pub fn is_feature(path: &Path) -> bool {
    path.to_string_lossy().ends_with(FEATURE_EXTENSION)
}
