//! Feature-level tag extraction with a run-scoped cache.
//!
//! Tags are read from the header of a feature file: every `@`-prefixed
//! token on `@` lines before the `Feature:` line. Blank lines and comments
//! in the header are skipped without ending the scan.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default number of concurrent file reads.
pub const DEFAULT_READ_CONCURRENCY: usize = 8;

/// Extract the feature-level tags from feature file content.
///
/// Duplicates are kept, in encounter order. A leading byte order mark is
/// ignored.
pub fn extract_feature_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("Feature:") {
            break;
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with('@') {
            tags.extend(
                trimmed
                    .split_whitespace()
                    .filter(|token| token.starts_with('@'))
                    .map(str::to_string),
            );
        }
    }

    tags
}

/// Tag sets keyed by spec path.
///
/// Owned by the caller and shared through an `Arc`; entries are never
/// invalidated, so the cache should live no longer than one run.
#[derive(Debug, Default)]
pub struct TagCache {
    entries: RwLock<HashMap<PathBuf, Arc<[String]>>>,
}

impl TagCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tags for a path.
    pub async fn get(&self, path: &Path) -> Option<Arc<[String]>> {
        self.entries.read().await.get(path).cloned()
    }

    /// Store the tags for a path.
    pub async fn insert(&self, path: PathBuf, tags: Arc<[String]>) {
        self.entries.write().await.insert(path, tags);
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of cached paths.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no paths.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Reads feature-level tags from spec files.
#[derive(Debug, Clone)]
pub struct TagExtractor {
    cache: Arc<TagCache>,
    concurrency: NonZeroUsize,
}

impl TagExtractor {
    /// Create an extractor backed by the given cache.
    pub fn new(cache: Arc<TagCache>) -> Self {
        Self {
            cache,
            concurrency: NonZeroUsize::new(DEFAULT_READ_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
        }
    }

    /// Set how many files may be read at once by [`feature_tags_all`](Self::feature_tags_all).
    pub fn with_concurrency(mut self, concurrency: NonZeroUsize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// The cache this extractor fills.
    pub fn cache(&self) -> &Arc<TagCache> {
        &self.cache
    }

    /// Tags declared by one spec.
    ///
    /// A missing or unreadable file yields an empty set and a warning.
    pub async fn feature_tags(&self, path: &Path) -> Arc<[String]> {
        load_tags(&self.cache, path).await
    }

    /// Tags for every path, in input order, read through a bounded pool.
    pub async fn feature_tags_all(&self, paths: &[PathBuf]) -> Vec<Arc<[String]>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.get()));
        let mut tasks = JoinSet::new();

        for (index, path) in paths.iter().cloned().enumerate() {
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, load_tags(&cache, &path).await)
            });
        }

        let empty: Arc<[String]> = Arc::from(Vec::<String>::new());
        let mut results = vec![empty; paths.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, tags)) => results[index] = tags,
                Err(e) => warn!("Tag read task failed: {}", e),
            }
        }

        results
    }
}

async fn load_tags(cache: &TagCache, path: &Path) -> Arc<[String]> {
    if let Some(tags) = cache.get(path).await {
        return tags;
    }

    let tags: Arc<[String]> = match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let tags = extract_feature_tags(&content);
            if !tags.is_empty() {
                debug!(
                    "{}: {}",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    tags.join(", ")
                );
            }
            Arc::from(tags)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("File not found: {}", path.display());
            Arc::from(Vec::<String>::new())
        }
        Err(e) => {
            warn!("Failed to parse {}: {}", path.display(), e);
            Arc::from(Vec::<String>::new())
        }
    };

    // Failed reads are cached too: there is no retry within a run.
    cache.insert(path.to_path_buf(), Arc::clone(&tags)).await;
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_feature(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_single_tag() {
        let tags = extract_feature_tags("\n@BE\nFeature: Backend tests\n  Scenario: Test something\n");
        assert_eq!(tags, vec!["@BE"]);
    }

    #[test]
    fn test_multiple_tags_on_one_line() {
        let tags = extract_feature_tags("@BE @Critical @Regression\nFeature: Important tests\n");
        assert_eq!(tags, vec!["@BE", "@Critical", "@Regression"]);
    }

    #[test]
    fn test_tags_separated_by_comments_and_blank_lines() {
        let content = "\n@BE\n# This is a comment\n\n@Critical\nFeature: Important tests\n";
        assert_eq!(extract_feature_tags(content), vec!["@BE", "@Critical"]);
    }

    #[test]
    fn test_scan_stops_at_feature_line() {
        let content = "@FE\nFeature: Frontend\n\n  @BE\n  Scenario: Backend test\n";
        assert_eq!(extract_feature_tags(content), vec!["@FE"]);
    }

    #[test]
    fn test_duplicates_and_non_tag_tokens() {
        let content = "@A @A #trailing\n  @B   @A\nFeature: Dupes\n";
        assert_eq!(extract_feature_tags(content), vec!["@A", "@A", "@B", "@A"]);
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let tags = extract_feature_tags("\u{feff}@BE @Smoke\nFeature: B\n");
        assert_eq!(tags, vec!["@BE", "@Smoke"]);
    }

    #[test]
    fn test_no_tags() {
        assert!(extract_feature_tags("Feature: Tests without tags\n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_tags() {
        let extractor = TagExtractor::new(Arc::new(TagCache::new()));
        let tags = extractor.feature_tags(Path::new("/non/existent/file.feature")).await;
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_results_are_cached_until_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_feature(&dir, "cached.feature", "@BE\nFeature: Cached\n");

        let cache = Arc::new(TagCache::new());
        let extractor = TagExtractor::new(Arc::clone(&cache));
        assert_eq!(&*extractor.feature_tags(&path).await, ["@BE".to_string()]);

        // The cache serves the stale value after the file changes.
        std::fs::write(&path, "@FE\nFeature: Cached\n").unwrap();
        assert_eq!(&*extractor.feature_tags(&path).await, ["@BE".to_string()]);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert_eq!(&*extractor.feature_tags(&path).await, ["@FE".to_string()]);
    }

    #[tokio::test]
    async fn test_batch_read_preserves_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..20)
            .map(|i| write_feature(&dir, &format!("f{}.feature", i), &format!("@T{}\nFeature: F{}\n", i, i)))
            .collect();

        let extractor = TagExtractor::new(Arc::new(TagCache::new()))
            .with_concurrency(NonZeroUsize::new(3).unwrap());
        let all = extractor.feature_tags_all(&paths).await;

        assert_eq!(all.len(), 20);
        for (i, tags) in all.iter().enumerate() {
            assert_eq!(&**tags, [format!("@T{}", i)]);
        }
    }

    #[tokio::test]
    async fn test_separate_caches_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_feature(&dir, "iso.feature", "@A\nFeature: Iso\n");

        let first = TagExtractor::new(Arc::new(TagCache::new()));
        first.feature_tags(&path).await;

        let second_cache = Arc::new(TagCache::new());
        assert!(second_cache.get(&path).await.is_none());
        assert_eq!(first.cache().len().await, 1);
    }
}
