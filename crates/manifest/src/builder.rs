//! Manifest building and writing.

use specshard_core::{Manifest, ScenarioRecord, SpecEntry, MANIFEST_FILE_NAME};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{error, info, warn};

use crate::document::{Child, DocumentError, FeatureNode, ScenarioNode};
use crate::source::{DocumentSource, GherkinFileSource};

/// Directory that receives the manifest unless configured otherwise.
pub const DEFAULT_MANIFEST_DIR: &str = "resultValidation";

/// Error type for manifest output.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors that can occur while writing a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Builds scenario manifests from already-filtered spec lists.
pub struct ManifestBuilder {
    source: Arc<dyn DocumentSource>,
    base_dir: PathBuf,
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new(Arc::new(GherkinFileSource))
    }
}

impl ManifestBuilder {
    /// Create a builder reading documents from `source`. Paths are
    /// recorded relative to the current directory.
    pub fn new(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            base_dir: std::env::current_dir().unwrap_or_default(),
        }
    }

    /// Record spec paths relative to `dir` instead.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Key under which a spec is recorded.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned()
    }

    /// Expected scenarios of a single spec.
    pub async fn spec_entry(&self, path: &Path) -> std::result::Result<SpecEntry, DocumentError> {
        let document = self.source.load(path).await?;
        let feature = document.feature.ok_or(DocumentError::MissingFeature)?;
        let records = scenario_records(&feature);
        Ok(SpecEntry::new(feature.name, records))
    }

    /// Build a manifest. `tag_expression` is recorded as given and not
    /// applied again. Specs that cannot be read or hold no scenarios get
    /// no entry.
    pub async fn build(&self, specs: &[PathBuf], tag_expression: Option<&str>) -> Manifest {
        let mut manifest = Manifest::new(tag_expression, specs.len());

        for spec in specs {
            match self.spec_entry(spec).await {
                Ok(entry) => {
                    let key = self.relative_path(spec);
                    if !manifest.insert(key, entry) {
                        warn!(path = %spec.display(), "No scenarios found");
                    }
                }
                Err(DocumentError::MissingFeature) => {
                    warn!(path = %spec.display(), "Could not parse feature file");
                }
                Err(e) => {
                    error!(path = %spec.display(), "Error parsing spec: {}", e);
                }
            }
        }

        manifest
    }

    /// Build a manifest and write it to `out_dir`, replacing any manifest
    /// left by a previous run.
    pub async fn generate(
        &self,
        specs: &[PathBuf],
        tag_expression: Option<&str>,
        out_dir: &Path,
    ) -> Result<Manifest> {
        info!("Generating test manifest for {} specs...", specs.len());

        let path = out_dir.join(MANIFEST_FILE_NAME);
        match fs::remove_file(&path).await {
            Ok(()) => info!("Cleaned up stale manifest from previous run"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let manifest = self.build(specs, tag_expression).await;
        write_manifest(&manifest, &path).await?;

        info!(
            "Manifest generated: {} scenarios across {} specs",
            manifest.total_scenarios, manifest.total_specs
        );
        info!(path = %path.display(), "Manifest saved");

        Ok(manifest)
    }
}

/// Write a manifest as pretty JSON, creating parent directories.
pub async fn write_manifest(manifest: &Manifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json.as_bytes()).await?;
    Ok(())
}

fn scenario_records(feature: &FeatureNode) -> Vec<ScenarioRecord> {
    let mut records = Vec::new();
    collect_records(&feature.children, &feature.tags, &mut records);
    records
}

fn collect_records(children: &[Child], inherited: &[String], records: &mut Vec<ScenarioRecord>) {
    for child in children {
        match child {
            Child::Rule(rule) => {
                let tags = union(inherited, &rule.tags);
                collect_records(&rule.children, &tags, records);
            }
            Child::Scenario(scenario) => push_scenario(scenario, inherited, records),
        }
    }
}

fn push_scenario(scenario: &ScenarioNode, inherited: &[String], records: &mut Vec<ScenarioRecord>) {
    let tags = union(inherited, &scenario.tags);

    if !scenario.is_outline() {
        records.push(ScenarioRecord {
            name: scenario.name.clone(),
            source_line: scenario.line,
            tags,
            is_example: false,
        });
        return;
    }

    records.extend((1..=scenario.example_count()).map(|i| ScenarioRecord {
        name: format!("{} (example #{})", scenario.name, i),
        source_line: scenario.line,
        tags: tags.clone(),
        is_example: true,
    }));
}

fn union(first: &[String], second: &[String]) -> Vec<String> {
    let mut tags = first.to_vec();
    for tag in second {
        if !tags.contains(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}
