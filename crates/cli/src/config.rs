//! Settings and their layering.
//!
//! Lowest to highest: built-in defaults, the JSON file passed with
//! `--config`, the `TAGS` environment variable, command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use specshard_manifest::DEFAULT_MANIFEST_DIR;
use specshard_scheduler::{SuffixRule, DEFAULT_WEIGHT};
use specshard_tags::{
    BrowserPolicy, ExpressionParser, Grammar, PolicyMode, SpecFilter, TagCache, TagExtractor,
};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Environment variable holding the tag expression.
pub const TAGS_ENV: &str = "TAGS";

/// Run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Requested worker count
    pub thread_count: usize,
    /// Weight table location
    pub weights_json: PathBuf,
    /// Weight of specs no key matches
    pub default_weight: f64,
    /// Budget shared out when generating weights
    pub total_weight: f64,
    /// Tag expression
    pub tags: Option<String>,
    pub grammar: Grammar,
    pub suffix_rule: SuffixRule,
    pub browser_policy: PolicyMode,
    /// Marker tag that selects the alternate browser
    pub backend_tag: String,
    /// Directory receiving the manifest
    pub manifest_dir: PathBuf,
    /// Parallel tag reads
    pub read_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thread_count: 2,
            weights_json: PathBuf::from("cypress-parallel/parallel-weights.json"),
            default_weight: DEFAULT_WEIGHT,
            total_weight: 1000.0,
            tags: None,
            grammar: Grammar::default(),
            suffix_rule: SuffixRule::default(),
            browser_policy: PolicyMode::default(),
            backend_tag: specshard_tags::browser::BACKEND_TAG.to_string(),
            manifest_dir: PathBuf::from(DEFAULT_MANIFEST_DIR),
            read_concurrency: specshard_tags::extractor::DEFAULT_READ_CONCURRENCY,
        }
    }
}

impl Settings {
    /// Defaults, overlaid with the config file when one is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply the tag expression from the environment and the command line,
    /// the flag winning.
    pub fn apply_tags(&mut self, env: Option<String>, flag: Option<String>) {
        if let Some(flag) = flag {
            info!("Using tags from --tags: {}", flag);
            self.tags = Some(flag);
        } else if let Some(env) = env {
            info!("Using tags from {} env: {}", TAGS_ENV, env);
            self.tags = Some(env);
        } else if let Some(tags) = &self.tags {
            info!("Using tags from config file: {}", tags);
        }
    }

    /// The tag expression, if a non-blank one is set.
    pub fn tag_expression(&self) -> Option<&str> {
        self.tags.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn parser(&self) -> ExpressionParser {
        ExpressionParser::new(self.grammar)
    }

    /// A spec filter with a fresh tag cache.
    pub fn spec_filter(&self) -> SpecFilter {
        let concurrency = NonZeroUsize::new(self.read_concurrency).unwrap_or(NonZeroUsize::MIN);
        let extractor = TagExtractor::new(Arc::new(TagCache::new())).with_concurrency(concurrency);
        SpecFilter::new(extractor, self.parser())
    }

    pub fn browser(&self) -> BrowserPolicy {
        BrowserPolicy::new(self.backend_tag.clone())
            .with_mode(self.browser_policy)
            .with_parser(self.parser())
    }
}
