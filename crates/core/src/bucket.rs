//! Worker bucket model.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Specs assigned to one parallel execution slot, plus their total weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerBucket {
    /// Sum of the weights of every spec in `list`
    pub weight: f64,

    /// Specs in assignment order
    pub list: Vec<PathBuf>,
}

impl WorkerBucket {
    /// Create an empty bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a spec and account for its weight.
    pub fn assign(&mut self, spec: PathBuf, weight: f64) {
        self.list.push(spec);
        self.weight += weight;
    }

    /// Number of specs in the bucket.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether nothing has been assigned yet.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}
