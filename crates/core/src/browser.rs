//! Execution target hints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser a worker should launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    /// Standard browser target
    Chrome,
    /// Alternate renderer, used for backend-heavy suites that crash the
    /// default renderer on memory-constrained hosts
    Electron,
}

impl Browser {
    /// Name passed to the runner's `--browser` flag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Electron => "electron",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
