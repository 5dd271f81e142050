//! specshard core data models.
//!
//! This crate defines the data structures shared by tag filtering,
//! weighted distribution and scenario manifest generation.

#![warn(missing_docs)]

// Tag expressions
mod expr;

// Distribution
mod weights;
mod bucket;

// Manifest and execution hints
mod manifest;
mod browser;

pub use expr::Expr;
pub use weights::{WeightEntry, WeightTable};
pub use bucket::WorkerBucket;
pub use manifest::{Manifest, ScenarioRecord, SpecEntry, MANIFEST_FILE_NAME};
pub use browser::Browser;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// Compare a tag against an expression literal, ignoring case.
pub fn tag_eq(tag: &str, literal: &str) -> bool {
    tag == literal || tag.to_lowercase() == literal.to_lowercase()
}
