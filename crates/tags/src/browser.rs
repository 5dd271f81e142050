//! Browser selection from a tag expression.
//!
//! Suites that select the backend marker tag run on the alternate renderer,
//! because the default renderer tends to crash on memory-constrained hosts
//! when running backend-heavy specs. Everything else runs on the standard
//! browser.

use regex::Regex;
use serde::{Deserialize, Serialize};
use specshard_core::{Browser, Expr};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::parser::ExpressionParser;

/// Default backend marker tag.
pub const BACKEND_TAG: &str = "@BE";

/// How the marker is located in the expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyMode {
    /// Walk the parsed expression tree
    #[default]
    Expression,
    /// Match the raw string with word-boundary patterns
    Pattern,
}

impl FromStr for PolicyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expression" => Ok(Self::Expression),
            "pattern" => Ok(Self::Pattern),
            other => Err(format!("unknown browser policy '{}', expected 'expression' or 'pattern'", other)),
        }
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression => f.write_str("expression"),
            Self::Pattern => f.write_str("pattern"),
        }
    }
}

/// Maps a tag expression to the browser the workers should launch.
#[derive(Debug, Clone)]
pub struct BrowserPolicy {
    marker: String,
    mode: PolicyMode,
    parser: ExpressionParser,
}

impl Default for BrowserPolicy {
    fn default() -> Self {
        Self::new(BACKEND_TAG)
    }
}

#[derive(Debug, Default)]
struct Mentions {
    positive: bool,
    negative: bool,
}

impl BrowserPolicy {
    /// Create a policy for the given marker tag. The marker is compared
    /// case-sensitively.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            mode: PolicyMode::default(),
            parser: ExpressionParser::default(),
        }
    }

    /// Set the matching mode.
    pub fn with_mode(mut self, mode: PolicyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the parser used in [`PolicyMode::Expression`].
    pub fn with_parser(mut self, parser: ExpressionParser) -> Self {
        self.parser = parser;
        self
    }

    /// Select a browser. `None` means no override: the runner keeps its
    /// own default.
    pub fn select(&self, expression: Option<&str>) -> Option<Browser> {
        let expression = expression.filter(|e| !e.trim().is_empty())?;

        let browser = match self.mode {
            PolicyMode::Expression => self.select_by_expression(expression),
            PolicyMode::Pattern => self.select_by_pattern(expression),
        };

        debug!("Browser for '{}': {}", expression, browser);
        Some(browser)
    }

    fn select_by_expression(&self, expression: &str) -> Browser {
        let tree = match self.parser.parse(expression) {
            Ok(Some(tree)) => tree,
            Ok(None) => return Browser::Chrome,
            Err(e) => {
                warn!("Cannot parse '{}' for browser selection ({}), matching patterns", expression, e);
                return self.select_by_pattern(expression);
            }
        };

        let mut mentions = Mentions::default();
        self.collect_mentions(&tree, false, &mut mentions);

        if mentions.negative {
            Browser::Chrome
        } else if mentions.positive {
            Browser::Electron
        } else {
            Browser::Chrome
        }
    }

    fn collect_mentions(&self, expr: &Expr, negated: bool, mentions: &mut Mentions) {
        match expr {
            Expr::Tag { value } => {
                let found = value
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .any(|word| word == self.marker);
                if found {
                    if negated {
                        mentions.negative = true;
                    } else {
                        mentions.positive = true;
                    }
                }
            }
            Expr::And { left, right } | Expr::Or { left, right } => {
                self.collect_mentions(left, negated, mentions);
                self.collect_mentions(right, negated, mentions);
            }
            Expr::Not { operand } => self.collect_mentions(operand, !negated, mentions),
            Expr::Unknown => {}
        }
    }

    fn select_by_pattern(&self, expression: &str) -> Browser {
        let marker = regex::escape(&self.marker);
        let negated = Regex::new(&format!(r"not\s+(\()?.*{}", marker));
        let standalone = Regex::new(&format!(
            r"(?:^|\s|,|\(|or\s|and\s){}(?:$|\s|,|\)|or\s|and\s)",
            marker
        ));

        let (negated, standalone) = match (negated, standalone) {
            (Ok(negated), Ok(standalone)) => (negated, standalone),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Invalid browser pattern for marker {}: {}", self.marker, e);
                return Browser::Chrome;
            }
        };

        if negated.is_match(expression) {
            Browser::Chrome
        } else if standalone.is_match(expression) {
            Browser::Electron
        } else {
            Browser::Chrome
        }
    }
}
