//! Tag expression parsing.
//!
//! Two grammars compile the same boolean language
//! (`or` < `and` < `not` < parenthesized group) into an [`Expr`] tree:
//!
//! - [`Grammar::Precedence`] tokenizes and runs one depth-aware descent
//!   for every operator. Binary operators associate to the left.
//! - [`Grammar::Legacy`] reproduces the older string-structural rules,
//!   including the greedy `<left> and not <right>` match that ignores
//!   parenthesis depth. It never fails.
//!
//! In both grammars `and`/`or` are matched case-insensitively while `not`
//! is only an operator in lowercase. A run of adjacent non-operator words
//! is a single tag leaf holding the exact source text, so `NOT @A` is the
//! tag literal `"NOT @A"`.

use serde::{Deserialize, Serialize};
use specshard_core::Expr;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use regex::Regex;

/// Error type for expression parsing.
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Errors reported by [`Grammar::Precedence`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// A parenthesis without its partner
    #[error("Unbalanced parenthesis at position {position}")]
    UnbalancedParen {
        /// Byte offset of the offending parenthesis
        position: usize,
    },

    /// A token where an operand or operator was not expected
    #[error("Unexpected '{token}' at position {position}")]
    UnexpectedToken {
        /// Token text
        token: String,
        /// Byte offset of the token
        position: usize,
    },

    /// Input ended where an operand was required
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
}

/// Which grammar the parser applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// Unified depth-aware precedence grammar
    #[default]
    Precedence,
    /// Older string-structural rules, kept for compatibility
    Legacy,
}

impl FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "precedence" => Ok(Self::Precedence),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown grammar '{}', expected 'precedence' or 'legacy'", other)),
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precedence => f.write_str("precedence"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

/// Compiles tag expression strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionParser {
    grammar: Grammar,
}

impl ExpressionParser {
    /// Create a parser for the given grammar.
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    /// Grammar in use.
    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Parse an expression. Blank input yields `None`, which matches
    /// every tag set.
    pub fn parse(&self, input: &str) -> Result<Option<Expr>> {
        match self.grammar {
            Grammar::Precedence => parse_precedence(input),
            Grammar::Legacy => Ok(parse_legacy(input)),
        }
    }
}

// ============================================================================
// Precedence grammar
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    LParen,
    RParen,
    And,
    Or,
    Not,
    Word,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            c if c.is_whitespace() => continue,
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if next.is_whitespace() || next == '(' || next == ')' {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                let word = &input[start..end];
                let kind = if word.eq_ignore_ascii_case("and") {
                    TokenKind::And
                } else if word.eq_ignore_ascii_case("or") {
                    TokenKind::Or
                } else if word == "not" {
                    TokenKind::Not
                } else {
                    TokenKind::Word
                };
                tokens.push(Token { kind, start, end });
                continue;
            }
        };
        tokens.push(Token {
            kind,
            start,
            end: start + 1,
        });
    }

    tokens
}

struct Descent<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Descent<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn unexpected(&self, token: Token) -> ExpressionError {
        ExpressionError::UnexpectedToken {
            token: self.input[token.start..token.end].to_string(),
            position: token.start,
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Some(t) if t.kind == TokenKind::And) {
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Not) {
            self.pos += 1;
            return Ok(Expr::not(self.parse_not()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().ok_or(ExpressionError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::LParen => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.peek() {
                    Some(t) if t.kind == TokenKind::RParen => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(ExpressionError::UnbalancedParen {
                        position: token.start,
                    }),
                }
            }
            TokenKind::Word => {
                let start = token.start;
                let mut end = token.end;
                self.pos += 1;
                while let Some(next) = self.peek() {
                    if next.kind != TokenKind::Word {
                        break;
                    }
                    end = next.end;
                    self.pos += 1;
                }
                Ok(Expr::tag(&self.input[start..end]))
            }
            _ => Err(self.unexpected(token)),
        }
    }
}

fn parse_precedence(input: &str) -> Result<Option<Expr>> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut descent = Descent {
        input,
        tokens,
        pos: 0,
    };
    let expr = descent.parse_or()?;

    match descent.peek() {
        None => Ok(Some(expr)),
        Some(t) if t.kind == TokenKind::RParen => {
            Err(ExpressionError::UnbalancedParen { position: t.start })
        }
        Some(t) => Err(descent.unexpected(t)),
    }
}

// ============================================================================
// Legacy grammar
// ============================================================================

fn and_not_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+)\s+(?i:and)\s+not\s+(.+)$").expect("and-not pattern is valid")
    })
}

fn or_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s+(?i:or)\s+").expect("or pattern is valid"))
}

fn and_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s+(?i:and)\s+").expect("and pattern is valid"))
}

fn not_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^not\s+(.+)$").expect("not pattern is valid"))
}

/// True when the outer parentheses of `expr` enclose all of it.
fn legacy_encloses(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    let len = bytes.len();
    let mut depth = 0i32;
    for (i, b) in bytes.iter().enumerate().take(len.saturating_sub(1)) {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        if depth == 0 && i + 2 < len {
            return false;
        }
    }
    true
}

/// Split at the first depth-0 match of `operator`.
fn split_top_level<'a>(expr: &'a str, operator: &Regex) -> Option<(&'a str, &'a str)> {
    let mut depth = 0i32;
    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth == 0 {
            if let Some(m) = operator.find(&expr[i..]) {
                return Some((&expr[..i], &expr[i + m.end()..]));
            }
        }
    }
    None
}

// An empty sub-expression matches everything, so it folds into its parent.
fn legacy_and(left: Option<Expr>, right: Option<Expr>) -> Option<Expr> {
    match (left, right) {
        (Some(l), Some(r)) => Some(Expr::and(l, r)),
        (Some(e), None) | (None, Some(e)) => Some(e),
        (None, None) => None,
    }
}

fn legacy_or(left: Option<Expr>, right: Option<Expr>) -> Option<Expr> {
    match (left, right) {
        (Some(l), Some(r)) => Some(Expr::or(l, r)),
        _ => None,
    }
}

fn legacy_not(operand: Option<Expr>) -> Option<Expr> {
    match operand {
        Some(e) => Some(Expr::not(e)),
        // The negation of match-all matches nothing.
        None => Some(Expr::and(Expr::tag(""), Expr::not(Expr::tag("")))),
    }
}

fn parse_legacy(input: &str) -> Option<Expr> {
    let expr = input.trim();
    if expr.is_empty() {
        return None;
    }

    if expr.starts_with('(') && expr.ends_with(')') && legacy_encloses(expr) {
        return parse_legacy(&expr[1..expr.len() - 1]);
    }

    // Greedy and not depth-aware: the left capture is as long as possible.
    if let Some(caps) = and_not_pattern().captures(expr) {
        let left = parse_legacy(&caps[1]);
        let right = legacy_not(parse_legacy(&caps[2]));
        return legacy_and(left, right);
    }

    if let Some((left, right)) = split_top_level(expr, or_pattern()) {
        return legacy_or(parse_legacy(left), parse_legacy(right));
    }

    if let Some((left, right)) = split_top_level(expr, and_pattern()) {
        return legacy_and(parse_legacy(left), parse_legacy(right));
    }

    if let Some(caps) = not_pattern().captures(expr) {
        return legacy_not(parse_legacy(&caps[1]));
    }

    Some(Expr::tag(expr))
}
