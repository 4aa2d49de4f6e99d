//! Recursive-descent parser producing a lossless [`ParseNode`] tree
//!
//! Grammar:
//!
//! ```text
//! program    := item*
//! body       := item*                                  (inside braces)
//! item       := NEWLINE+ | FULL_LINE_COMMENT | entry [COMMENT] | object
//! entry      := WORD OPERATOR value | WORD
//! value      := WORD | object
//! object     := '{' [COMMENT] body '}' [COMMENT]
//! ```
//!
//! Line breaks between a key, its operator and its value are accepted and
//! dropped. A bare `object` item is only valid inside a body.

use super::kind::TokenKind;
use super::lexer::{Token, tokenize};
use super::node::{Brace, ObjectNode, ParseNode};
use thiserror::Error;

/// A malformed file
///
/// Carries the offending token, how deeply nested the parser was and the
/// keys of the objects that were open at the time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} on line {line} (found {found}, depth {depth}, in {})", self.stack_trace())]
pub struct ParseError {
    pub message: String,
    /// Text of the offending token, or `end of input`
    pub found: String,
    pub line: usize,
    pub depth: usize,
    /// Keys of the open objects, outermost first
    pub stack: Vec<String>,
}

impl ParseError {
    /// Open objects as `outer > inner`, or `<root>`
    pub fn stack_trace(&self) -> String {
        if self.stack.is_empty() {
            "<root>".to_string()
        } else {
            self.stack.join(" > ")
        }
    }
}

/// Tokenize and parse a complete file
pub fn parse_str(source: &str) -> Result<ParseNode, ParseError> {
    let (tokens, _warnings) = tokenize(source);
    parse(&tokens)
}

/// Parse a token stream into a `Sequence` of top-level items
pub fn parse(tokens: &[Token]) -> Result<ParseNode, ParseError> {
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Keys of the objects currently open
    stack: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            stack: Vec::new(),
        }
    }

    fn parse_program(&mut self) -> Result<ParseNode, ParseError> {
        let items = self.parse_body(false)?;
        Ok(ParseNode::Sequence(items))
    }

    /// Items up to the closing brace (inside objects) or end of input
    fn parse_body(&mut self, in_object: bool) -> Result<Vec<ParseNode>, ParseError> {
        let mut items = Vec::new();

        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Newline => {
                    let count = self.consume_newlines();
                    items.push(if count >= 2 {
                        ParseNode::DoubleNewline
                    } else {
                        ParseNode::Newline
                    });
                }
                TokenKind::FullLineComment => {
                    items.push(ParseNode::FullLineComment(token.text.clone()));
                    self.advance();
                }
                TokenKind::Comment => {
                    let text = token.text.clone();
                    self.advance();
                    attach_comment(&mut items, text);
                }
                TokenKind::Word => {
                    let entry = self.parse_entry()?;
                    items.push(entry);
                }
                TokenKind::BeginBlock if in_object => {
                    let object = self.parse_object("<anonymous>")?;
                    items.push(ParseNode::Object(object));
                }
                TokenKind::BeginBlock => {
                    return Err(self.error("Anonymous object at top level"));
                }
                TokenKind::EndBlock if in_object => return Ok(items),
                TokenKind::EndBlock => {
                    return Err(self.error("Unexpected '}' without matching '{'"));
                }
                TokenKind::Operator(_) => {
                    return Err(self.error("Operator without a key"));
                }
            }
        }

        if in_object {
            return Err(self.error("Unclosed '{'"));
        }
        Ok(items)
    }

    /// `WORD OPERATOR value` or a bare `WORD`
    fn parse_entry(&mut self) -> Result<ParseNode, ParseError> {
        let key = self.current_text();
        self.advance();

        let Some(TokenKind::Operator(operator)) = self.kind_after_newlines() else {
            return Ok(ParseNode::Scalar(key));
        };
        self.skip_newlines();
        self.advance();
        self.skip_newlines();

        let value = match self.current_kind() {
            Some(TokenKind::Word) => {
                let word = self.current_text();
                self.advance();
                ParseNode::Scalar(word)
            }
            Some(TokenKind::BeginBlock) => ParseNode::Object(self.parse_object(&key)?),
            _ => {
                return Err(self.error(format!("Expected a value after '{key} {operator}'")));
            }
        };

        Ok(ParseNode::assignment(key, operator, value))
    }

    /// `'{' [COMMENT] body '}' [COMMENT]`
    fn parse_object(&mut self, name: &str) -> Result<ObjectNode, ParseError> {
        self.expect(TokenKind::BeginBlock)?;
        self.stack.push(name.to_string());

        let begin = Brace {
            comment: self.take_comment(),
        };
        let body = self.parse_body(true)?;
        self.expect(TokenKind::EndBlock)?;
        self.stack.pop();

        let end = Brace {
            comment: self.take_comment(),
        };
        Ok(ObjectNode { begin, body, end })
    }

    fn take_comment(&mut self) -> Option<String> {
        if self.at(TokenKind::Comment) {
            let text = self.current_text();
            self.advance();
            Some(text)
        } else {
            None
        }
    }

    fn consume_newlines(&mut self) -> usize {
        let mut count = 0;
        while self.at(TokenKind::Newline) {
            self.advance();
            count += 1;
        }
        count
    }

    fn skip_newlines(&mut self) {
        self.consume_newlines();
    }

    /// Kind of the next token that is not a line break
    fn kind_after_newlines(&self) -> Option<TokenKind> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|token| token.kind)
            .find(|kind| *kind != TokenKind::Newline)
    }

    fn current(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn current_text(&self) -> String {
        self.current().map(|t| t.text.clone()).unwrap_or_default()
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.at(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("Expected {kind}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let (found, line) = match self.current() {
            Some(token) => (format!("'{}'", token.text.escape_debug()), token.line),
            None => (
                "end of input".to_string(),
                self.tokens.last().map_or(1, |t| t.line),
            ),
        };
        ParseError {
            message: message.into(),
            found,
            line,
            depth: self.stack.len(),
            stack: self.stack.clone(),
        }
    }
}

/// Attach a same-line comment to the item it follows
///
/// Object-valued items never reach here: their end brace already took the
/// comment. A comment with nothing before it (the line only held skipped
/// characters) becomes a full-line comment.
fn attach_comment(items: &mut Vec<ParseNode>, text: String) {
    match items.pop() {
        Some(node @ (ParseNode::Assignment { .. } | ParseNode::Scalar(_))) => {
            items.push(ParseNode::TrailingComment {
                inner: Box::new(node),
                text,
            });
        }
        Some(other) => {
            items.push(other);
            items.push(ParseNode::FullLineComment(text));
        }
        None => items.push(ParseNode::FullLineComment(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::RelationalOperator;

    fn items(source: &str) -> Vec<ParseNode> {
        match parse_str(source).unwrap() {
            ParseNode::Sequence(items) => items,
            other => panic!("expected sequence, got {other:?}"),
        }
    }

    fn eq(key: &str, value: &str) -> ParseNode {
        ParseNode::assignment(key, RelationalOperator::Equal, ParseNode::scalar(value))
    }

    #[test]
    fn test_scalar_assignments_and_newlines() {
        assert_eq!(
            items("a = 1\nb = 2\n\n\nc = 3"),
            vec![
                eq("a", "1"),
                ParseNode::Newline,
                eq("b", "2"),
                ParseNode::DoubleNewline,
                eq("c", "3"),
            ]
        );
    }

    #[test]
    fn test_relational_assignment() {
        assert_eq!(
            items("age >= 16"),
            vec![ParseNode::assignment(
                "age",
                RelationalOperator::GreaterOrEqual,
                ParseNode::scalar("16")
            )]
        );
    }

    #[test]
    fn test_object_assignment() {
        let parsed = items("building = {\n\tlevel = 3\n}");
        let ParseNode::Assignment { key, value, .. } = &parsed[0] else {
            panic!("expected assignment");
        };
        assert_eq!(key, "building");
        let ParseNode::Object(object) = value.as_ref() else {
            panic!("expected object");
        };
        assert_eq!(
            object.body,
            vec![ParseNode::Newline, eq("level", "3"), ParseNode::Newline]
        );
        assert_eq!(object.item_count(), 1);
    }

    #[test]
    fn test_flags_inside_object() {
        let parsed = items("tags = { a b c }");
        let ParseNode::Assignment { value, .. } = &parsed[0] else {
            panic!("expected assignment");
        };
        let ParseNode::Object(object) = value.as_ref() else {
            panic!("expected object");
        };
        assert_eq!(
            object.body,
            vec![
                ParseNode::scalar("a"),
                ParseNode::scalar("b"),
                ParseNode::scalar("c")
            ]
        );
    }

    #[test]
    fn test_anonymous_objects_in_body() {
        let parsed = items("list = { { a = 1 } { a = 2 } }");
        let ParseNode::Assignment { value, .. } = &parsed[0] else {
            panic!("expected assignment");
        };
        let ParseNode::Object(object) = value.as_ref() else {
            panic!("expected object");
        };
        assert_eq!(object.item_count(), 2);
        assert!(object.body.iter().all(|n| matches!(n, ParseNode::Object(_))));
    }

    #[test]
    fn test_comments_attach_to_their_owner() {
        let parsed = items("# header\na = 1 # one\nb = { # open\n\tc = 2\n} # close\n");
        assert_eq!(parsed[0], ParseNode::FullLineComment("# header".into()));
        assert_eq!(
            parsed[2],
            ParseNode::TrailingComment {
                inner: Box::new(eq("a", "1")),
                text: "# one".into()
            }
        );
        let ParseNode::Assignment { value, .. } = &parsed[4] else {
            panic!("expected assignment, got {:?}", parsed[4]);
        };
        let ParseNode::Object(object) = value.as_ref() else {
            panic!("expected object");
        };
        assert_eq!(object.begin.comment.as_deref(), Some("# open"));
        assert_eq!(object.end.comment.as_deref(), Some("# close"));
    }

    #[test]
    fn test_trailing_comment_on_flag() {
        assert_eq!(
            items("unique # only one"),
            vec![ParseNode::TrailingComment {
                inner: Box::new(ParseNode::scalar("unique")),
                text: "# only one".into()
            }]
        );
    }

    #[test]
    fn test_value_on_next_line() {
        let parsed = items("a =\n{\n\tb = 1\n}");
        assert!(parsed[0].is_object_valued());
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_repeated_keys_are_kept() {
        assert_eq!(items("a = 1 a = 2"), vec![eq("a", "1"), eq("a", "2")]);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(items(""), vec![]);
        assert_eq!(items("\n\n"), vec![ParseNode::DoubleNewline]);
    }

    #[test]
    fn test_unclosed_object_reports_stack() {
        let err = parse_str("outer = {\n\tinner = {\n\t\ta = 1\n").unwrap_err();
        assert_eq!(err.message, "Unclosed '{'");
        assert_eq!(err.found, "end of input");
        assert_eq!(err.depth, 2);
        assert_eq!(err.stack, vec!["outer".to_string(), "inner".to_string()]);
        assert_eq!(err.stack_trace(), "outer > inner");
    }

    #[test]
    fn test_stray_close_brace() {
        let err = parse_str("a = 1\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.found, "'}'");
        assert_eq!(err.depth, 0);
        assert!(err.to_string().contains("<root>"));
    }

    #[test]
    fn test_missing_value() {
        let err = parse_str("a = }").unwrap_err();
        assert!(err.message.starts_with("Expected a value after 'a ='"));
        let err = parse_str("a = = 1").unwrap_err();
        assert_eq!(err.found, "'='");
    }

    #[test]
    fn test_operator_without_key() {
        let err = parse_str("= 1").unwrap_err();
        assert_eq!(err.message, "Operator without a key");
    }

    #[test]
    fn test_anonymous_object_at_top_level() {
        assert!(parse_str("{ a = 1 }").is_err());
    }
}
