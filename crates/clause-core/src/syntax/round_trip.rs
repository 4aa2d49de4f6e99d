//! Round-trip validation
//!
//! A render is accepted when
//! 1. the rendered text equals the source once all whitespace is removed, and
//! 2. re-parsing the rendered text gives a tree equal to the source tree up to
//!    line-break placement.
//!
//! The same checks guard every file the merge engine writes.

use super::node::{ObjectNode, ParseNode};
use super::parser::{ParseError, parse_str};
use super::printer::render;
use crate::config::FormatConfig;

/// Result of round-trip validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    /// Original source code
    pub original: String,
    /// Rendered source code
    pub formatted: String,
    /// Whether the rendered text equals the source, ignoring whitespace
    pub text_preserved: bool,
    /// Semantic differences between the source tree and the re-parsed tree
    pub differences: Vec<SemanticDifference>,
    /// Error from parsing the source
    pub original_error: Option<ParseError>,
    /// Error from re-parsing the rendered text
    pub reparsed_error: Option<ParseError>,
}

impl ValidationResult {
    /// Both checks passed
    pub fn is_valid(&self) -> bool {
        self.original_error.is_none() && self.is_consistent() && self.text_preserved
    }

    /// The re-parsed tree matches the source tree
    pub fn is_consistent(&self) -> bool {
        self.reparsed_error.is_none() && self.differences.is_empty()
    }

    /// Get all validation issues
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Some(err) = &self.original_error {
            issues.push(format!("Original parsing failed: {err}"));
        }
        if let Some(err) = &self.reparsed_error {
            issues.push(format!("Re-parsing failed: {err}"));
        }
        if !self.text_preserved {
            issues.push("Rendered text differs from the source beyond whitespace".to_string());
        }
        if !self.differences.is_empty() {
            issues.push(format!("Found {} semantic differences", self.differences.len()));
        }

        issues
    }
}

/// A difference between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticDifference {
    pub kind: DifferenceKind,
    /// Path of keys and item indices to the differing node
    pub location: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl std::fmt::Display for SemanticDifference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} at {}: expected {}, found {}",
            self.kind,
            self.location,
            self.expected.as_deref().unwrap_or("nothing"),
            self.actual.as_deref().unwrap_or("nothing")
        )
    }
}

/// Types of semantic differences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Node missing from the re-parsed tree
    MissingNode,
    /// Node only in the re-parsed tree
    ExtraNode,
    /// Nodes of different variants
    NodeTypeDifference,
    /// Same variant, different key, word, operator or comment
    TextDifference,
}

/// Round-trip validator for script files
#[derive(Debug, Clone, Default)]
pub struct RoundTripValidator {
    config: FormatConfig,
}

impl RoundTripValidator {
    /// Create a validator rendering with the default layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator rendering with custom layout switches
    pub fn with_config(config: FormatConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Parse, render, re-parse and compare
    pub fn validate_round_trip(&self, source: &str) -> ValidationResult {
        let tree = match parse_str(source) {
            Ok(tree) => tree,
            Err(err) => {
                return ValidationResult {
                    original: source.to_string(),
                    formatted: String::new(),
                    text_preserved: false,
                    differences: Vec::new(),
                    original_error: Some(err),
                    reparsed_error: None,
                };
            }
        };

        let formatted = render(&tree, &self.config);
        let text_preserved = strip_whitespace(source) == strip_whitespace(&formatted);
        let (differences, reparsed_error) = match parse_str(&formatted) {
            Ok(reparsed) => (compare_trees(&tree, &reparsed), None),
            Err(err) => (Vec::new(), Some(err)),
        };

        ValidationResult {
            original: source.to_string(),
            formatted,
            text_preserved,
            differences,
            original_error: None,
            reparsed_error,
        }
    }

    /// Render a tree and check that the text parses back to it
    ///
    /// Returns the rendered text, or a description of the first mismatch.
    pub fn render_checked(&self, tree: &ParseNode) -> Result<String, String> {
        let formatted = render(tree, &self.config);
        let reparsed = parse_str(&formatted).map_err(|err| format!("rendered text does not parse: {err}"))?;
        match compare_trees(tree, &reparsed).first() {
            Some(difference) => Err(difference.to_string()),
            None => Ok(formatted),
        }
    }
}

/// Text with every whitespace character and byte-order mark removed
pub fn strip_whitespace(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{feff}')
        .collect()
}

/// Differences between two trees, ignoring line-break placement
pub fn compare_trees(expected: &ParseNode, actual: &ParseNode) -> Vec<SemanticDifference> {
    let mut differences = Vec::new();
    compare_node(
        &expected.without_layout(),
        &actual.without_layout(),
        "<root>",
        &mut differences,
    );
    differences
}

fn compare_node(
    expected: &ParseNode,
    actual: &ParseNode,
    location: &str,
    differences: &mut Vec<SemanticDifference>,
) {
    match (expected, actual) {
        (ParseNode::Sequence(left), ParseNode::Sequence(right)) => {
            compare_items(left, right, location, differences);
        }
        (
            ParseNode::Assignment {
                operator: left_op,
                key: left_key,
                value: left_value,
            },
            ParseNode::Assignment {
                operator: right_op,
                key: right_key,
                value: right_value,
            },
        ) => {
            if left_key != right_key {
                push_text_difference(differences, location, left_key, right_key);
            } else if left_op != right_op {
                push_text_difference(differences, location, left_op.as_str(), right_op.as_str());
            } else {
                let nested = format!("{location} > {left_key}");
                compare_node(left_value, right_value, &nested, differences);
            }
        }
        (ParseNode::Scalar(left), ParseNode::Scalar(right))
        | (ParseNode::FullLineComment(left), ParseNode::FullLineComment(right)) => {
            if left != right {
                push_text_difference(differences, location, left, right);
            }
        }
        (
            ParseNode::TrailingComment {
                inner: left_inner,
                text: left_text,
            },
            ParseNode::TrailingComment {
                inner: right_inner,
                text: right_text,
            },
        ) => {
            if left_text != right_text {
                push_text_difference(differences, location, left_text, right_text);
            } else {
                compare_node(left_inner, right_inner, location, differences);
            }
        }
        (ParseNode::Object(left), ParseNode::Object(right)) => {
            compare_objects(left, right, location, differences);
        }
        (ParseNode::Newline, ParseNode::Newline)
        | (ParseNode::DoubleNewline, ParseNode::DoubleNewline) => {}
        (left, right) => differences.push(SemanticDifference {
            kind: DifferenceKind::NodeTypeDifference,
            location: location.to_string(),
            expected: Some(left.describe()),
            actual: Some(right.describe()),
        }),
    }
}

fn push_text_difference(
    differences: &mut Vec<SemanticDifference>,
    location: &str,
    expected: &str,
    actual: &str,
) {
    differences.push(SemanticDifference {
        kind: DifferenceKind::TextDifference,
        location: location.to_string(),
        expected: Some(expected.to_string()),
        actual: Some(actual.to_string()),
    });
}

fn compare_objects(
    expected: &ObjectNode,
    actual: &ObjectNode,
    location: &str,
    differences: &mut Vec<SemanticDifference>,
) {
    for (left, right) in [
        (&expected.begin.comment, &actual.begin.comment),
        (&expected.end.comment, &actual.end.comment),
    ] {
        if left != right {
            differences.push(SemanticDifference {
                kind: DifferenceKind::TextDifference,
                location: location.to_string(),
                expected: left.clone(),
                actual: right.clone(),
            });
        }
    }
    compare_items(&expected.body, &actual.body, location, differences);
}

fn compare_items(
    expected: &[ParseNode],
    actual: &[ParseNode],
    location: &str,
    differences: &mut Vec<SemanticDifference>,
) {
    for index in 0..expected.len().max(actual.len()) {
        let item_location = format!("{location}[{index}]");
        match (expected.get(index), actual.get(index)) {
            (Some(left), Some(right)) => compare_node(left, right, &item_location, differences),
            (Some(left), None) => differences.push(SemanticDifference {
                kind: DifferenceKind::MissingNode,
                location: item_location,
                expected: Some(left.describe()),
                actual: None,
            }),
            (None, Some(right)) => differences.push(SemanticDifference {
                kind: DifferenceKind::ExtraNode,
                location: item_location,
                expected: None,
                actual: Some(right.describe()),
            }),
            (None, None) => {}
        }
    }
}
