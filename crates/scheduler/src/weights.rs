//! Weight table loading, resolution and generation.

use serde::{Deserialize, Serialize};
use specshard_core::{WeightEntry, WeightTable};
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{info, warn};

/// Error type for weight file operations.
pub type Result<T> = std::result::Result<T, WeightsError>;

/// Errors that can occur while reading or writing weight files.
#[derive(Debug, thiserror::Error)]
pub enum WeightsError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a spec path picks its entry when several keys are suffixes of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixRule {
    /// The longest matching key wins
    #[default]
    Longest,
    /// The last matching key in document order wins
    Last,
}

impl FromStr for SuffixRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "longest" => Ok(Self::Longest),
            "last" => Ok(Self::Last),
            other => Err(format!("unknown suffix rule '{}', expected 'longest' or 'last'", other)),
        }
    }
}

impl fmt::Display for SuffixRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Longest => f.write_str("longest"),
            Self::Last => f.write_str("last"),
        }
    }
}

/// Resolve the weight of one spec path.
///
/// Keys are matched as plain string suffixes of the path. Entries without
/// a weight never match. Paths matching no key get `default_weight`.
pub fn resolve_weight(path: &str, table: &WeightTable, default_weight: f64, rule: SuffixRule) -> f64 {
    let mut matched: Option<(&str, f64)> = None;

    for (key, entry) in table.iter() {
        let Some(weight) = entry.weight else {
            continue;
        };
        if !path.ends_with(key) {
            continue;
        }

        matched = match (rule, matched) {
            (SuffixRule::Longest, Some((best, _))) if best.len() >= key.len() => matched,
            _ => Some((key, weight)),
        };
    }

    matched.map(|(_, weight)| weight).unwrap_or(default_weight)
}

/// Read a weight file, failing on I/O or JSON errors.
pub async fn read_weight_table(path: &Path) -> Result<WeightTable> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Read a weight file, degrading to an empty table when it is missing or
/// corrupt. Every spec then receives the default weight.
pub async fn load_weight_table(path: &Path) -> WeightTable {
    match read_weight_table(path).await {
        Ok(table) => {
            info!("Loaded {} spec weight(s) from {}", table.len(), path.display());
            table
        }
        Err(WeightsError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            warn!("Weight file not found in path: {}", path.display());
            WeightTable::new()
        }
        Err(e) => {
            warn!("Ignoring weight file {}: {}", path.display(), e);
            WeightTable::new()
        }
    }
}

/// Derive weights from measured durations.
///
/// Each timed entry receives `floor(time / total_duration * total_weight)`.
/// Entries without a time are skipped.
pub fn weights_from_timings(timings: &WeightTable, total_duration: f64, total_weight: f64) -> WeightTable {
    let mut table = WeightTable::new();

    for (spec, entry) in timings.iter() {
        let Some(time) = entry.time else {
            warn!("No duration recorded for {}, skipping", spec);
            continue;
        };

        let weight = if total_duration > 0.0 {
            (time / total_duration * total_weight).floor()
        } else {
            0.0
        };

        table.insert(
            spec,
            WeightEntry {
                time: Some(time),
                weight: Some(weight),
            },
        );
    }

    table
}

/// Recompute weights from `timings` and merge them over the weight file
/// at `path`, new entries taking precedence. Returns the merged table.
///
/// When `total_duration` is `None` the sum of all timings is used.
pub async fn update_weights_file(
    path: &Path,
    timings: &WeightTable,
    total_duration: Option<f64>,
    total_weight: f64,
) -> Result<WeightTable> {
    let total_duration = total_duration
        .unwrap_or_else(|| timings.iter().filter_map(|(_, e)| e.time).sum::<f64>());
    let fresh = weights_from_timings(timings, total_duration, total_weight);

    let mut merged = match read_weight_table(path).await {
        Ok(existing) => {
            info!("Merging with existing weights ({} existing specs)", existing.len());
            existing
        }
        Err(WeightsError::Io(e)) if e.kind() == ErrorKind::NotFound => WeightTable::new(),
        Err(e) => {
            warn!("No usable existing weights file ({}), starting fresh", e);
            WeightTable::new()
        }
    };
    merged.merge(&fresh);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_string_pretty(&merged)?;
    fs::write(path, json.as_bytes()).await?;

    info!(
        "Weights file updated: {} new/updated specs, {} total specs",
        fresh.len(),
        merged.len()
    );

    Ok(merged)
}
