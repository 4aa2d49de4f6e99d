//! Syntax layer: tokenizer, parser, printer and round-trip checks
//!
//! ## Pipeline
//!
//! ```text
//! text ──tokenize──▶ tokens ──parse──▶ ParseNode ──render(FormatConfig)──▶ text
//! ```
//!
//! The tree is lossless up to horizontal whitespace: comments, line breaks and
//! blank lines are nodes, so `render(parse(source))` reproduces `source` once
//! whitespace is stripped from both.
//!
//! ## Example
//!
//! ```rust
//! use clause_core::config::FormatConfig;
//! use clause_core::syntax::{parse_str, render};
//!
//! let tree = parse_str("building = {\n\tlevel = 3 # start\n}\n").unwrap();
//! assert_eq!(
//!     render(&tree, &FormatConfig::default()),
//!     "building = {\n\tlevel = 3 # start\n}\n"
//! );
//! ```

mod kind;
mod lexer;
mod node;
mod parser;
mod printer;

pub mod round_trip;

pub use kind::{RelationalOperator, TokenKind};
pub use lexer::{LexResult, LexWarning, Span, Token, tokenize};
pub use node::{Brace, ObjectNode, ParseNode};
pub use parser::{ParseError, parse, parse_str};
pub use printer::{Break, LayoutMode, LayoutState, layout_mode, render};

use crate::error::ClauseError;
use crate::result::Result;
use std::path::Path;

/// Read a script file as UTF-8, dropping a leading byte-order mark
pub fn read_source(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path).map_err(|e| ClauseError::io_error(path, e))?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// Read and parse a script file
pub fn parse_file(path: &Path) -> Result<ParseNode> {
    let source = read_source(path)?;
    parse_str(&source).map_err(|e| ClauseError::parse_error(path, e))
}
