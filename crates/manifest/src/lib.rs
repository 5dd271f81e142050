//! Scenario manifest generation for filtered spec lists.
//!
//! `document` reads the structure of feature files, `source` puts it behind
//! an async seam and `builder` turns a spec list into a [`Manifest`].
//!
//! [`Manifest`]: specshard_core::Manifest

#![warn(missing_docs)]

pub mod document;
pub mod source;
pub mod builder;

pub use document::{parse_document, DocumentError, GherkinDocument};
pub use source::{DocumentSource, GherkinFileSource};
pub use builder::{write_manifest, ManifestBuilder, ManifestError, DEFAULT_MANIFEST_DIR};
