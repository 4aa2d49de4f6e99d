//! Lossless parse tree
//!
//! Every comment, line break and blank line of the source has a node, so
//! rendering a tree reproduces the file up to horizontal whitespace.

use super::kind::RelationalOperator;

/// A node of the parse tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseNode {
    /// The items of a file or of an object body, in source order
    Sequence(Vec<ParseNode>),
    /// `key op value`; the value is a `Scalar` or an `Object`
    Assignment {
        operator: RelationalOperator,
        key: String,
        value: Box<ParseNode>,
    },
    /// A bare word: a flag entry, or an assignment value
    Scalar(String),
    FullLineComment(String),
    /// An item followed by a comment on the same line
    TrailingComment { inner: Box<ParseNode>, text: String },
    Object(ObjectNode),
    Newline,
    /// Two or more consecutive line breaks
    DoubleNewline,
}

/// `{ body }` with the comments that may follow either brace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectNode {
    pub begin: Brace,
    pub body: Vec<ParseNode>,
    pub end: Brace,
}

/// An object brace and the comment written after it on the same line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Brace {
    pub comment: Option<String>,
}

impl ObjectNode {
    pub fn new(body: Vec<ParseNode>) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    /// Number of body items that are not line breaks
    pub fn item_count(&self) -> usize {
        self.body.iter().filter(|node| !node.is_blank()).count()
    }
}

impl ParseNode {
    pub fn assignment(key: impl Into<String>, operator: RelationalOperator, value: ParseNode) -> Self {
        ParseNode::Assignment {
            operator,
            key: key.into(),
            value: Box::new(value),
        }
    }

    pub fn scalar(text: impl Into<String>) -> Self {
        ParseNode::Scalar(text.into())
    }

    pub fn object(body: Vec<ParseNode>) -> Self {
        ParseNode::Object(ObjectNode::new(body))
    }

    /// `Newline` or `DoubleNewline`
    pub fn is_blank(&self) -> bool {
        matches!(self, ParseNode::Newline | ParseNode::DoubleNewline)
    }

    /// The node with any trailing comment removed
    pub fn without_comment(&self) -> &ParseNode {
        match self {
            ParseNode::TrailingComment { inner, .. } => inner.without_comment(),
            other => other,
        }
    }

    pub fn without_comment_mut(&mut self) -> &mut ParseNode {
        match self {
            ParseNode::TrailingComment { inner, .. } => inner.without_comment_mut(),
            other => other,
        }
    }

    /// Key under which the item appears in its enclosing mapping
    ///
    /// Assignments use their key, flags their word, anonymous objects the
    /// empty string. Comments and line breaks have no key.
    pub fn entry_key(&self) -> Option<&str> {
        match self.without_comment() {
            ParseNode::Assignment { key, .. } => Some(key),
            ParseNode::Scalar(word) => Some(word),
            ParseNode::Object(_) => Some(""),
            _ => None,
        }
    }

    /// Object or an assignment of an object
    pub fn is_object_valued(&self) -> bool {
        match self.without_comment() {
            ParseNode::Object(_) => true,
            ParseNode::Assignment { value, .. } => matches!(**value, ParseNode::Object(_)),
            _ => false,
        }
    }

    /// Whether the rendered item runs to the end of its line
    pub fn ends_with_comment(&self) -> bool {
        match self {
            ParseNode::FullLineComment(_) | ParseNode::TrailingComment { .. } => true,
            ParseNode::Object(object) => object.end.comment.is_some(),
            ParseNode::Assignment { value, .. } => value.ends_with_comment(),
            _ => false,
        }
    }

    /// Items of a `Sequence`; any other node is its own single item
    pub fn items(&self) -> &[ParseNode] {
        match self {
            ParseNode::Sequence(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    /// Copy of the tree with every line-break node removed
    pub fn without_layout(&self) -> ParseNode {
        match self {
            ParseNode::Sequence(items) => ParseNode::Sequence(strip_layout(items)),
            ParseNode::Assignment {
                operator,
                key,
                value,
            } => ParseNode::Assignment {
                operator: *operator,
                key: key.clone(),
                value: Box::new(value.without_layout()),
            },
            ParseNode::TrailingComment { inner, text } => ParseNode::TrailingComment {
                inner: Box::new(inner.without_layout()),
                text: text.clone(),
            },
            ParseNode::Object(object) => ParseNode::Object(ObjectNode {
                begin: object.begin.clone(),
                body: strip_layout(&object.body),
                end: object.end.clone(),
            }),
            other => other.clone(),
        }
    }

    /// Equality ignoring where line breaks and blank lines fall
    pub fn semantic_eq(&self, other: &ParseNode) -> bool {
        self.without_layout() == other.without_layout()
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            ParseNode::Sequence(items) => format!("sequence of {} items", items.len()),
            ParseNode::Assignment { key, operator, .. } => format!("assignment '{key} {operator}'"),
            ParseNode::Scalar(word) => format!("scalar '{word}'"),
            ParseNode::FullLineComment(text) => format!("comment '{text}'"),
            ParseNode::TrailingComment { inner, .. } => {
                format!("{} with trailing comment", inner.describe())
            }
            ParseNode::Object(object) => format!("object with {} items", object.item_count()),
            ParseNode::Newline => "newline".to_string(),
            ParseNode::DoubleNewline => "blank line".to_string(),
        }
    }
}

fn strip_layout(items: &[ParseNode]) -> Vec<ParseNode> {
    items
        .iter()
        .filter(|node| !node.is_blank())
        .map(ParseNode::without_layout)
        .collect()
}
