//! Feature documents.
//!
//! Files are parsed with the `gherkin` crate, which handles every dialect
//! selected by a `# language:` header, and reduced to the structure needed
//! to count scenarios: the feature, its rules, scenarios and example
//! tables, with their tags and line numbers.

use gherkin::GherkinEnv;

/// Error type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors raised while turning a spec file into a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document has no `Feature:` node
    #[error("no Feature found")]
    MissingFeature,

    /// The document is not valid Gherkin
    #[error("parse error: {0}")]
    Parse(String),
}

/// A parsed feature document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GherkinDocument {
    /// The feature, absent for documents holding only comments
    pub feature: Option<FeatureNode>,
}

/// The `Feature:` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureNode {
    /// Feature name
    pub name: String,
    /// Tags above the feature keyword, `@`-prefixed
    pub tags: Vec<String>,
    /// Line of the feature keyword
    pub line: usize,
    /// Scenarios first, then rules
    pub children: Vec<Child>,
}

/// A block nested in a feature or a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    /// A scenario or outline
    Scenario(ScenarioNode),
    /// A rule grouping scenarios
    Rule(RuleNode),
}

/// A `Rule:` block. Never contains another rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleNode {
    /// Rule name
    pub name: String,
    /// Tags on the rule
    pub tags: Vec<String>,
    /// Line of the rule keyword
    pub line: usize,
    /// Scenarios of the rule
    pub children: Vec<Child>,
}

/// A scenario or outline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioNode {
    /// Scenario name, placeholders left as written
    pub name: String,
    /// Tags on the scenario
    pub tags: Vec<String>,
    /// Line reported for the scenario
    pub line: usize,
    /// Example tables, empty for a concrete scenario
    pub examples: Vec<ExamplesNode>,
}

impl ScenarioNode {
    /// Whether the block expands into one run per example row.
    pub fn is_outline(&self) -> bool {
        !self.examples.is_empty()
    }

    /// Body rows across every example table.
    pub fn example_count(&self) -> usize {
        self.examples.iter().map(|e| e.rows).sum()
    }
}

/// An `Examples:` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamplesNode {
    /// Tags on the table
    pub tags: Vec<String>,
    /// Line of the examples keyword
    pub line: usize,
    /// Body rows, the header excluded
    pub rows: usize,
}

/// Parse a feature document.
///
/// Documents holding nothing but blank lines and comments yield
/// `feature: None` rather than an error. A leading byte order mark is
/// ignored.
pub fn parse_document(content: &str) -> Result<GherkinDocument> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let has_content = content
        .lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with('#'));
    if !has_content {
        return Ok(GherkinDocument::default());
    }

    let feature = gherkin::Feature::parse(content, GherkinEnv::default())
        .map_err(|e| DocumentError::Parse(e.to_string()))?;

    Ok(GherkinDocument {
        feature: Some(feature_node(&feature)),
    })
}

fn feature_node(feature: &gherkin::Feature) -> FeatureNode {
    let mut children: Vec<Child> = feature
        .scenarios
        .iter()
        .map(|s| Child::Scenario(scenario_node(s)))
        .collect();

    children.extend(feature.rules.iter().map(|rule| {
        Child::Rule(RuleNode {
            name: rule.name.clone(),
            tags: tag_names(&rule.tags),
            line: rule.position.line,
            children: rule
                .scenarios
                .iter()
                .map(|s| Child::Scenario(scenario_node(s)))
                .collect(),
        })
    }));

    FeatureNode {
        name: feature.name.clone(),
        tags: tag_names(&feature.tags),
        line: feature.position.line,
        children,
    }
}

fn scenario_node(scenario: &gherkin::Scenario) -> ScenarioNode {
    ScenarioNode {
        name: scenario.name.clone(),
        tags: tag_names(&scenario.tags),
        line: scenario.position.line,
        examples: scenario
            .examples
            .iter()
            .map(|examples| ExamplesNode {
                tags: tag_names(&examples.tags),
                line: examples.position.line,
                rows: examples
                    .table
                    .as_ref()
                    .map_or(0, |table| table.rows.len().saturating_sub(1)),
            })
            .collect(),
    }
}

// The parser drops the `@`; the rest of the workspace compares tags with it.
fn tag_names(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| {
            if tag.starts_with('@') {
                tag.clone()
            } else {
                format!("@{}", tag)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKOUT: &str = r#"# language: en
@BE @Checkout
Feature: Checkout

  Background:
    Given a cart

  @Smoke
  Scenario: Pay by card
    When I pay
      """
      Scenario: not a real block
      """

  Scenario Outline: Pay with <method>
    When I pay with <method>

    @Primary
    Examples: Common
      | method |
      | card   |
      | cash   |

    Examples:
      | method  |
      | voucher |
"#;

    fn feature(content: &str) -> FeatureNode {
        parse_document(content).unwrap().feature.unwrap()
    }

    fn scenario(child: &Child) -> &ScenarioNode {
        match child {
            Child::Scenario(s) => s,
            Child::Rule(_) => panic!("expected scenario"),
        }
    }

    #[test]
    fn test_feature_header() {
        let feature = feature(CHECKOUT);
        assert_eq!(feature.name, "Checkout");
        assert_eq!(feature.tags, vec!["@BE", "@Checkout"]);
        assert_eq!(feature.children.len(), 2);
    }

    #[test]
    fn test_scenarios_and_outlines() {
        let feature = feature(CHECKOUT);

        let card = scenario(&feature.children[0]);
        assert_eq!(card.name, "Pay by card");
        assert_eq!(card.tags, vec!["@Smoke"]);
        assert!(!card.is_outline());

        let outline = scenario(&feature.children[1]);
        assert_eq!(outline.name, "Pay with <method>");
        assert_eq!(outline.line, 15);
        assert!(outline.is_outline());
        assert_eq!(outline.examples.len(), 2);
        assert_eq!(outline.examples[0].tags, vec!["@Primary"]);
        assert_eq!(outline.examples[0].rows, 2);
        assert_eq!(outline.example_count(), 3);
    }

    #[test]
    fn test_rules_hold_their_scenarios() {
        let feature = feature(
            "Feature: Rules\n\n  Rule: First\n\n    Scenario: a\n      Given x\n\n    Scenario: b\n      Given y\n\n  @R2\n  Rule: Second\n\n    Example: c\n      Given z\n",
        );
        assert_eq!(feature.children.len(), 2);
        let Child::Rule(second) = &feature.children[1] else {
            panic!("expected rule");
        };
        assert_eq!(second.name, "Second");
        assert_eq!(second.tags, vec!["@R2"]);
        assert_eq!(second.children.len(), 1);
    }

    #[test]
    fn test_step_tables_are_not_examples() {
        let feature = feature("Feature: F\n\n  Scenario: s\n    Given users\n      | name |\n      | bob  |\n");
        assert!(!scenario(&feature.children[0]).is_outline());
    }

    #[test]
    fn test_other_dialects() {
        let feature = feature("# language: fr\n@BE\nFonctionnalité: F\n\n  Scénario: un\n    Soit un panier\n");
        assert_eq!(feature.name, "F");
        assert_eq!(feature.tags, vec!["@BE"]);
        assert_eq!(feature.children.len(), 1);
        assert_eq!(scenario(&feature.children[0]).name, "un");
    }

    #[test]
    fn test_byte_order_mark_is_ignored() {
        let feature = feature("\u{feff}@BE\nFeature: B\n\n  Scenario: s\n    Given x\n");
        assert_eq!(feature.tags, vec!["@BE"]);
        assert_eq!(feature.children.len(), 1);
    }

    #[test]
    fn test_comment_only_document_has_no_feature() {
        assert_eq!(parse_document("# nothing here\n\n").unwrap().feature, None);
        assert_eq!(parse_document("").unwrap().feature, None);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(matches!(parse_document("Scenario: orphan\n"), Err(DocumentError::Parse(_))));
    }
}
