//! Token kinds and relational operators of the script dialect

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator joining a key to its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationalOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "?=")]
    ExistsEqual,
    #[serde(rename = "!=")]
    NotEqual,
}

impl RelationalOperator {
    /// Two-character operators come first so they win over their prefixes
    pub const ALL: [RelationalOperator; 7] = [
        RelationalOperator::GreaterOrEqual,
        RelationalOperator::LessOrEqual,
        RelationalOperator::ExistsEqual,
        RelationalOperator::NotEqual,
        RelationalOperator::Equal,
        RelationalOperator::Greater,
        RelationalOperator::Less,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationalOperator::Equal => "=",
            RelationalOperator::GreaterOrEqual => ">=",
            RelationalOperator::LessOrEqual => "<=",
            RelationalOperator::Greater => ">",
            RelationalOperator::Less => "<",
            RelationalOperator::ExistsEqual => "?=",
            RelationalOperator::NotEqual => "!=",
        }
    }

    /// Match the longest operator at the start of `input`
    pub fn match_prefix(input: &str) -> Option<RelationalOperator> {
        Self::ALL
            .into_iter()
            .find(|op| input.starts_with(op.as_str()))
    }
}

impl fmt::Display for RelationalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a lexed token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier, number, quoted string, `@[...]` reference or colour literal
    Word,
    Operator(RelationalOperator),
    /// `{`
    BeginBlock,
    /// `}`
    EndBlock,
    /// `#` comment following other content on the same line
    Comment,
    /// `#` comment with nothing but spaces or tabs before it on its line
    FullLineComment,
    Newline,
}

impl TokenKind {
    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::FullLineComment)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Word => f.write_str("word"),
            TokenKind::Operator(op) => write!(f, "operator '{op}'"),
            TokenKind::BeginBlock => f.write_str("'{'"),
            TokenKind::EndBlock => f.write_str("'}'"),
            TokenKind::Comment => f.write_str("comment"),
            TokenKind::FullLineComment => f.write_str("full-line comment"),
            TokenKind::Newline => f.write_str("newline"),
        }
    }
}
