//! Tag expression evaluation.

use specshard_core::{tag_eq, Expr};
use tracing::warn;

/// Evaluate a parsed expression against a tag set.
///
/// An absent expression accepts every tag set. Tag literals match
/// case-insensitively.
pub fn evaluate<S: AsRef<str>>(expr: Option<&Expr>, tags: &[S]) -> bool {
    match expr {
        None => true,
        Some(expr) => evaluate_node(expr, tags),
    }
}

fn evaluate_node<S: AsRef<str>>(expr: &Expr, tags: &[S]) -> bool {
    match expr {
        Expr::Tag { value } => tags.iter().any(|t| tag_eq(t.as_ref(), value)),
        Expr::And { left, right } => evaluate_node(left, tags) && evaluate_node(right, tags),
        Expr::Or { left, right } => evaluate_node(left, tags) || evaluate_node(right, tags),
        Expr::Not { operand } => !evaluate_node(operand, tags),
        Expr::Unknown => {
            warn!("Unknown expression type: {}", expr.kind());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(v: &str) -> Expr {
        Expr::tag(v)
    }

    #[test]
    fn test_absent_expression_matches_everything() {
        assert!(evaluate::<&str>(None, &[]));
        assert!(evaluate(None, &["@BE"]));
    }

    #[test]
    fn test_tag_match_is_case_insensitive() {
        assert!(evaluate(Some(&tag("@be")), &["@BE"]));
        assert!(evaluate(Some(&tag("@Critical")), &["@CRITICAL"]));
        assert!(!evaluate(Some(&tag("@BE")), &["@BETTER"]));
    }

    #[test]
    fn test_operators_follow_boolean_laws() {
        let sets: [&[&str]; 4] = [&[], &["@A"], &["@B"], &["@A", "@B"]];
        let a = tag("@A");
        let b = tag("@B");

        for set in sets {
            let ea = evaluate(Some(&a), set);
            let eb = evaluate(Some(&b), set);
            assert_eq!(evaluate(Some(&Expr::not(a.clone())), set), !ea);
            assert_eq!(evaluate(Some(&Expr::and(a.clone(), b.clone())), set), ea && eb);
            assert_eq!(evaluate(Some(&Expr::or(a.clone(), b.clone())), set), ea || eb);
        }
    }

    #[test]
    fn test_complex_expression() {
        let expr = Expr::and(tag("@BE"), Expr::not(Expr::or(tag("@Deprecated"), tag("@CUTOFF"))));
        assert!(evaluate(Some(&expr), &["@BE"]));
        assert!(!evaluate(Some(&expr), &["@BE", "@Deprecated"]));
        assert!(!evaluate(Some(&expr), &["@BE", "@CUTOFF"]));
        assert!(!evaluate(Some(&expr), &["@FE"]));
    }

    #[test]
    fn test_unknown_node_is_false() {
        assert!(!evaluate(Some(&Expr::Unknown), &["@BE"]));
        assert!(evaluate(Some(&Expr::not(Expr::Unknown)), &["@BE"]));
    }
}
