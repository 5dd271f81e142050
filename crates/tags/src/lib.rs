//! Tag extraction, tag expressions and spec filtering.
//!
//! ```text
//! spec paths → TagExtractor → SpecFilter(ExpressionParser + evaluate) → filtered paths
//! ```
//!
//! The browser policy reads the same expression string and shares no
//! state with the filter.

#![warn(missing_docs)]

pub mod extractor;
pub mod parser;
pub mod evaluator;
pub mod filter;
pub mod browser;

pub use extractor::{extract_feature_tags, TagCache, TagExtractor};
pub use parser::{ExpressionError, ExpressionParser, Grammar};
pub use evaluator::evaluate;
pub use filter::SpecFilter;
pub use browser::{BrowserPolicy, PolicyMode};
