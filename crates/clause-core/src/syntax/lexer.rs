//! Tokenizer for the script dialect
//!
//! Whitespace other than newlines is dropped; newlines and comments are kept
//! as tokens so the parser can rebuild the line structure. Tokenizing never
//! fails: characters that start no token are reported as [`LexWarning`]s and
//! skipped.

use super::kind::{RelationalOperator, TokenKind};
use std::ops::Range;

/// Byte range in the source text
pub type Span = Range<usize>;

/// A character the tokenizer could not place in any token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexWarning {
    pub message: String,
    pub span: Span,
    pub line: usize,
}

impl LexWarning {
    pub fn new(message: impl Into<String>, span: Span, line: usize) -> Self {
        Self {
            message: message.into(),
            span,
            line,
        }
    }
}

/// A token with its kind, source text and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    /// 1-based line the token starts on
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, span: Span, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
            line,
        }
    }

    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end
    }
}

/// Result returned by the tokenizer
pub type LexResult = (Vec<Token>, Vec<LexWarning>);

/// Split `input` into tokens
///
/// Priority at each position: `@[...]` references and quoted strings, colour
/// literals, comments, operators, braces, plain words.
pub fn tokenize(input: &str) -> LexResult {
    let mut tokens = Vec::new();
    let mut warnings = Vec::new();

    let len = input.len();
    let mut i = 0usize;
    let mut line = 1usize;
    // Set once anything other than spaces/tabs appears on the current line
    let mut line_has_content = false;

    while i < len {
        let Some((current, size)) = next_char(input, i) else {
            break;
        };
        let start = i;

        match current {
            '\n' => {
                tokens.push(Token::new(TokenKind::Newline, "\n", span(start, i + size), line));
                i += size;
                line += 1;
                line_has_content = false;
            }
            '\u{feff}' => {
                i += size;
            }
            c if c.is_whitespace() => {
                i += size;
            }
            '#' => {
                let end = line_end(input, start);
                let text = input[start..end].trim_end_matches('\r');
                let kind = if line_has_content {
                    TokenKind::Comment
                } else {
                    TokenKind::FullLineComment
                };
                tokens.push(Token::new(kind, text, span(start, start + text.len()), line));
                line_has_content = true;
                i = end;
            }
            '{' => {
                tokens.push(Token::new(TokenKind::BeginBlock, "{", span(start, i + size), line));
                line_has_content = true;
                i += size;
            }
            '}' => {
                tokens.push(Token::new(TokenKind::EndBlock, "}", span(start, i + size), line));
                line_has_content = true;
                i += size;
            }
            '=' | '>' | '<' | '?' | '!' => {
                if let Some(op) = RelationalOperator::match_prefix(&input[start..]) {
                    let end = start + op.as_str().len();
                    tokens.push(Token::new(
                        TokenKind::Operator(op),
                        op.as_str(),
                        span(start, end),
                        line,
                    ));
                    line_has_content = true;
                    i = end;
                } else {
                    warnings.push(unexpected_char(current, start, size, line));
                    i += size;
                }
            }
            c if is_word_char(c) => {
                let end = lex_special_word(input, start).unwrap_or_else(|| lex_word(input, start));
                let text = &input[start..end];
                tokens.push(Token::new(TokenKind::Word, text, span(start, end), line));
                line += text.matches('\n').count();
                line_has_content = true;
                i = end;
            }
            _ => {
                warnings.push(unexpected_char(current, start, size, line));
                line_has_content = true;
                i += size;
            }
        }
    }

    for warning in &warnings {
        tracing::warn!("{} on line {}", warning.message, warning.line);
    }

    (tokens, warnings)
}

fn unexpected_char(c: char, start: usize, size: usize, line: usize) -> LexWarning {
    LexWarning::new(
        format!("Illegal character {c:?}"),
        span(start, start + size),
        line,
    )
}

/// Words that may contain characters a plain word cannot: `@[...]`
/// references, quoted strings and colour literals
fn lex_special_word(input: &str, start: usize) -> Option<usize> {
    let rest = &input[start..];
    if rest.starts_with("@[") {
        return lex_reference(input, start);
    }
    if rest.starts_with('"') {
        return lex_quoted(input, start);
    }
    lex_color(input, start)
}

/// `@[ ... ]` up to the first `]` on the same line
fn lex_reference(input: &str, start: usize) -> Option<usize> {
    let body = &input[start + 2..line_end(input, start)];
    body.find(']').map(|close| start + 2 + close + 1)
}

/// `"..."` up to the next unescaped quote on the same line
fn lex_quoted(input: &str, start: usize) -> Option<usize> {
    let end_of_line = line_end(input, start);
    let mut escaped = false;
    for (offset, c) in input[start + 1..end_of_line].char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(start + 1 + offset + 1),
            _ => escaped = false,
        }
    }
    None
}

/// `rgb { 1 2 3 }`, `hsv { 0.1 0.2 0.3 }` or `hsv360 { 10 20 30 }`
///
/// Three or four numeric components; whitespace around the braces and
/// between components may include newlines.
fn lex_color(input: &str, start: usize) -> Option<usize> {
    let rest = &input[start..];
    let prefix = ["hsv360", "rgb", "hsv"]
        .into_iter()
        .find(|prefix| rest.starts_with(prefix))?;

    let mut pos = start + prefix.len();
    pos = skip_whitespace(input, pos);
    if !input[pos..].starts_with('{') {
        return None;
    }
    pos += 1;

    let mut components = 0;
    loop {
        let after_space = skip_whitespace(input, pos);
        if input[after_space..].starts_with('}') {
            pos = after_space + 1;
            break;
        }
        if components > 0 && after_space == pos {
            return None;
        }
        pos = lex_number(input, after_space)?;
        components += 1;
        if components > 4 {
            return None;
        }
    }

    (components >= 3).then_some(pos)
}

/// `-?\d+(\.\d+)*`
fn lex_number(input: &str, start: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut pos = start;
    if bytes.get(pos) == Some(&b'-') {
        pos += 1;
    }
    let digits_start = pos;
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    let number = &input[digits_start..pos];
    let well_formed = !number.is_empty()
        && number
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
    well_formed.then_some(pos)
}

fn lex_word(input: &str, start: usize) -> usize {
    let mut pos = start;
    while let Some((c, size)) = next_char(input, pos) {
        if !is_word_char(c) {
            break;
        }
        pos += size;
    }
    pos
}

/// Characters of a plain word; relational prefixes (`> < = ? !`) never are
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(
            c,
            '_' | '.'
                | '/'
                | ':'
                | '\''
                | '"'
                | '-'
                | '+'
                | '%'
                | '*'
                | '('
                | ')'
                | ';'
                | '['
                | ']'
                | '@'
                | '$'
                | '|'
        )
}

fn skip_whitespace(input: &str, start: usize) -> usize {
    let mut pos = start;
    while let Some((c, size)) = next_char(input, pos) {
        if !c.is_whitespace() {
            break;
        }
        pos += size;
    }
    pos
}

/// Offset of the next `\n` at or after `start`, or the end of input
fn line_end(input: &str, start: usize) -> usize {
    input[start..]
        .find('\n')
        .map_or(input.len(), |offset| start + offset)
}

fn next_char(input: &str, pos: usize) -> Option<(char, usize)> {
    input[pos..].chars().next().map(|c| (c, c.len_utf8()))
}

fn span(start: usize, end: usize) -> Span {
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let (tokens, warnings) = tokenize(input);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    fn texts(input: &str) -> Vec<String> {
        tokenize(input).0.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("a = 1"),
            vec![
                TokenKind::Word,
                TokenKind::Operator(RelationalOperator::Equal),
                TokenKind::Word
            ]
        );
    }

    #[test]
    fn test_relational_operators() {
        let (tokens, _) = tokenize("a >= 1 b <= 2 c ?= x d != y e > 1 f < 2");
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Operator(_)))
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec![">=", "<=", "?=", "!=", ">", "<"]);
    }

    #[test]
    fn test_operator_not_absorbed_into_word() {
        assert_eq!(texts("level>=5"), vec!["level", ">=", "5"]);
    }

    #[test]
    fn test_full_line_versus_trailing_comment() {
        let (tokens, _) = tokenize("# header\na = 1 # note\n\t# indented\n");
        let comments: Vec<(TokenKind, &str)> = tokens
            .iter()
            .filter(|t| t.kind.is_comment())
            .map(|t| (t.kind, t.text.as_str()))
            .collect();
        assert_eq!(
            comments,
            vec![
                (TokenKind::FullLineComment, "# header"),
                (TokenKind::Comment, "# note"),
                (TokenKind::FullLineComment, "# indented"),
            ]
        );
    }

    #[test]
    fn test_comment_after_brace_is_trailing() {
        let (tokens, _) = tokenize("a = { # open\n}");
        assert_eq!(tokens[3].kind, TokenKind::Comment);
    }

    #[test]
    fn test_quoted_string_with_spaces_and_hash() {
        assert_eq!(
            texts(r#"name = "Steel Mill # 2" x"#),
            vec!["name", "=", "\"Steel Mill # 2\"", "x"]
        );
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        assert_eq!(texts(r#"a = "say \"hi\"""#), vec!["a", "=", r#""say \"hi\"""#]);
    }

    #[test]
    fn test_unterminated_quote_falls_back_to_word() {
        assert_eq!(texts("a = \"open\nb"), vec!["a", "=", "\"open", "\n", "b"]);
    }

    #[test]
    fn test_reference_word() {
        assert_eq!(
            texts("value = @[ base_cost * 2 ]"),
            vec!["value", "=", "@[ base_cost * 2 ]"]
        );
    }

    #[test]
    fn test_color_literals() {
        assert_eq!(
            texts("color = rgb { 255 128 0 }"),
            vec!["color", "=", "rgb { 255 128 0 }"]
        );
        assert_eq!(
            texts("color = hsv360{ 10 20.5 30 }"),
            vec!["color", "=", "hsv360{ 10 20.5 30 }"]
        );
        assert_eq!(
            texts("color = hsv {\n 0.1 0.2 0.3 }\nb = 1"),
            vec!["color", "=", "hsv {\n 0.1 0.2 0.3 }", "\n", "b", "=", "1"]
        );
    }

    #[test]
    fn test_color_prefix_without_block_is_word() {
        assert_eq!(texts("rgb_value = rgb"), vec!["rgb_value", "=", "rgb"]);
        assert_eq!(
            texts("rgb = { a b c }"),
            vec!["rgb", "=", "{", "a", "b", "c", "}"]
        );
    }

    #[test]
    fn test_multiline_color_advances_line_count() {
        let (tokens, _) = tokenize("c = rgb {\n1\n2\n3\n}\nnext = 1");
        let next = tokens.iter().find(|t| t.text == "next").unwrap();
        assert_eq!(next.line, 6);
    }

    #[test]
    fn test_word_characters() {
        assert_eq!(
            texts("path = gfx/interface/icons/a_b.dds scope:owner.var"),
            vec!["path", "=", "gfx/interface/icons/a_b.dds", "scope:owner.var"]
        );
        assert_eq!(texts("x = -0.25"), vec!["x", "=", "-0.25"]);
    }

    #[test]
    fn test_illegal_character_is_skipped_with_warning() {
        let (tokens, warnings) = tokenize("a = 1 ~ b = 2");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 1);
        assert!(warnings[0].message.contains('~'));
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_lone_bang_is_warning() {
        let (_, warnings) = tokenize("a ! b");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_crlf_and_bom_are_skipped() {
        assert_eq!(
            kinds("\u{feff}a = 1\r\nb = 2"),
            vec![
                TokenKind::Word,
                TokenKind::Operator(RelationalOperator::Equal),
                TokenKind::Word,
                TokenKind::Newline,
                TokenKind::Word,
                TokenKind::Operator(RelationalOperator::Equal),
                TokenKind::Word,
            ]
        );
    }

    #[test]
    fn test_comment_strips_carriage_return() {
        let (tokens, _) = tokenize("# note\r\n");
        assert_eq!(tokens[0].text, "# note");
        assert_eq!(tokens[1].kind, TokenKind::Newline);
    }

    #[test]
    fn test_spans_and_lines() {
        let (tokens, _) = tokenize("a = 1\nbb = 2");
        let bb = &tokens[4];
        assert_eq!(bb.text, "bb");
        assert_eq!(bb.span, 6..8);
        assert_eq!(bb.line, 2);
    }
}
