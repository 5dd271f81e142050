//! Tag expression tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A compiled tag expression.
///
/// Every child is owned by its parent, so a tree can never reference one
/// of its ancestors. An absent tree (`None` at call sites) matches
/// everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Expr {
    /// A single tag literal, e.g. `@BE`.
    Tag {
        /// Literal as written in the expression
        value: String,
    },
    /// Both operands must match.
    And {
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Either operand must match.
    Or {
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// The operand must not match.
    Not {
        /// Negated operand
        operand: Box<Expr>,
    },
    /// A node kind this version does not know. Only reachable through
    /// deserialization; the parsers never build it.
    #[serde(other)]
    Unknown,
}

impl Expr {
    /// Build a tag leaf.
    pub fn tag(value: impl Into<String>) -> Self {
        Self::Tag { value: value.into() }
    }

    /// Build a conjunction.
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build a disjunction.
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Build a negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: Expr) -> Self {
        Self::Not {
            operand: Box::new(operand),
        }
    }

    /// Node kind as it appears in the serialized form.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tag { .. } => "tag",
            Self::And { .. } => "and",
            Self::Or { .. } => "or",
            Self::Not { .. } => "not",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag { value } => write!(f, "{}", value),
            Self::And { left, right } => write!(f, "({} and {})", left, right),
            Self::Or { left, right } => write!(f, "({} or {})", left, right),
            Self::Not { operand } => write!(f, "not {}", operand),
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}
