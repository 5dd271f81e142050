//! Scenario manifest model.
//!
//! The manifest records how many scenarios each spec is expected to run so
//! that result collection can detect workers that silently dropped output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Time;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "test-manifest.json";

/// One scenario expected to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRecord {
    /// Scenario name; outline rows carry an `(example #n)` suffix
    pub name: String,

    /// Line of the scenario keyword in the source file
    #[serde(rename = "line")]
    pub source_line: usize,

    /// Feature tags followed by scenario tags, without duplicates
    pub tags: Vec<String>,

    /// Whether the record was expanded from an outline row
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_example: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Expected scenarios for one spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecEntry {
    /// Name from the `Feature:` line
    pub feature_name: String,

    /// Always equal to `scenarios.len()`
    pub expected_scenarios: usize,

    /// Scenarios in document order
    pub scenarios: Vec<ScenarioRecord>,
}

impl SpecEntry {
    /// Create an entry; the expected count is derived from the records.
    pub fn new(feature_name: impl Into<String>, scenarios: Vec<ScenarioRecord>) -> Self {
        Self {
            feature_name: feature_name.into(),
            expected_scenarios: scenarios.len(),
            scenarios,
        }
    }
}

/// Generated record of expected scenario counts per spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// When the manifest was generated
    pub generated_at: Time,

    /// Expression the spec list was filtered with, `"none"` if unfiltered
    pub tag_expression: String,

    /// Entries keyed by spec path relative to the working directory
    pub specs: BTreeMap<String, SpecEntry>,

    /// Number of specs handed to the builder
    pub total_specs: usize,

    /// Sum of `expected_scenarios` across `specs`
    pub total_scenarios: usize,
}

impl Manifest {
    /// Create an empty manifest.
    pub fn new(tag_expression: Option<&str>, total_specs: usize) -> Self {
        let tag_expression = match tag_expression.map(str::trim) {
            Some(expr) if !expr.is_empty() => expr.to_string(),
            _ => "none".to_string(),
        };

        Self {
            generated_at: chrono::Utc::now(),
            tag_expression,
            specs: BTreeMap::new(),
            total_specs,
            total_scenarios: 0,
        }
    }

    /// Record a spec. Entries without scenarios are dropped and `false` is
    /// returned.
    pub fn insert(&mut self, path: impl Into<String>, entry: SpecEntry) -> bool {
        if entry.expected_scenarios == 0 {
            return false;
        }

        let path = path.into();
        if let Some(previous) = self.specs.remove(&path) {
            self.total_scenarios -= previous.expected_scenarios;
        }
        self.total_scenarios += entry.expected_scenarios;
        self.specs.insert(path, entry);
        true
    }
}
