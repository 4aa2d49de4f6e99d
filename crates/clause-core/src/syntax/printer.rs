//! Reconstructs script text from a [`ParseNode`] tree
//!
//! Every object body is laid out in two steps. First each item gets a planned
//! [`Break`] in front of it, taken from the line breaks recorded in the tree
//! and from the body's layout mode. Then each planned break goes through
//! [`resolve_break`], one table of rules covering comments, blank lines and
//! closing braces, so the decision for a break never depends on how the
//! previous item was printed.
//!
//! Output uses tab indentation and `\n` line endings.

use super::node::{ObjectNode, ParseNode};
use crate::config::FormatConfig;

/// What separates an item from the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Break {
    /// Same line, one space
    Space,
    /// New line
    Line,
    /// New line after one empty line
    Blank,
}

/// How a body's recorded line breaks are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Keep the source's line structure
    Preserve,
    /// Everything on the opening brace's line
    SingleLine,
    /// Every item on its own line
    MultiLine,
}

/// Context for laying out one item of a body
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    /// Tab depth of the body's items
    pub depth: usize,
    /// Position of the item among the body's non-blank items
    pub index: usize,
    /// Item count of the previous sibling's object body, when it had one
    pub previous_object_items: Option<usize>,
}

impl LayoutState {
    fn previous_was_object_close(&self) -> bool {
        self.previous_object_items.is_some()
    }

    /// The previous sibling's body was short enough to be forced onto one line
    fn previous_was_single_line(&self, config: &FormatConfig) -> bool {
        matches!(
            (self.previous_object_items, config.force_single_line_below_item_count),
            (Some(count), Some(threshold)) if count <= threshold
        )
    }

    fn advance(&mut self, node: &ParseNode) {
        self.index += 1;
        self.previous_object_items = object_item_count(node);
    }
}

/// Where a break sits within its body
#[derive(Debug, Clone, Copy)]
enum Slot<'a> {
    /// In front of the item
    Before(&'a ParseNode),
    /// In front of the closing brace
    Close,
}

/// Render a tree to text
///
/// A non-`Sequence` node is rendered as a file holding just that item.
pub fn render(node: &ParseNode, config: &FormatConfig) -> String {
    let mut printer = Printer::new(config);
    printer.print_program(node.items());
    printer.finish()
}

/// Layout mode of an object body with `item_count` non-blank items
pub fn layout_mode(item_count: usize, config: &FormatConfig) -> LayoutMode {
    if config
        .force_single_line_below_item_count
        .is_some_and(|threshold| item_count <= threshold)
    {
        LayoutMode::SingleLine
    } else if config
        .force_multi_line_above_item_count
        .is_some_and(|threshold| item_count > threshold)
    {
        LayoutMode::MultiLine
    } else {
        LayoutMode::Preserve
    }
}

/// Final break in front of an item or closing brace
fn resolve_break(
    planned: Break,
    slot: Slot<'_>,
    previous: Option<&ParseNode>,
    state: &LayoutState,
    config: &FormatConfig,
) -> Break {
    let mut resolved = planned;

    if previous.is_some_and(ParseNode::ends_with_comment) {
        resolved = resolved.max(Break::Line);
    }
    if let Slot::Before(ParseNode::FullLineComment(_)) = slot {
        resolved = resolved.max(Break::Line);
    }

    match (resolved, slot) {
        (Break::Blank, Slot::Close) => Break::Line,
        (Break::Blank, _) if state.previous_was_single_line(config) => Break::Line,
        (Break::Blank, _)
            if config.default_no_double_blank_line
                && !(config.object_forces_double_blank_line
                    && state.previous_was_object_close()) =>
        {
            Break::Line
        }
        (Break::Line, Slot::Before(_))
            if config.default_yes_double_blank_line
                && state.index > 0
                && !state.previous_was_single_line(config) =>
        {
            Break::Blank
        }
        (Break::Line, Slot::Before(next))
            if config.object_forces_double_blank_line
                && state.previous_was_object_close()
                && !state.previous_was_single_line(config)
                && next.is_object_valued() =>
        {
            Break::Blank
        }
        (other, _) => other,
    }
}

/// Non-blank items in the body of an object-valued node
fn object_item_count(node: &ParseNode) -> Option<usize> {
    let object = match node.without_comment() {
        ParseNode::Object(object) => object,
        ParseNode::Assignment { value, .. } => match &**value {
            ParseNode::Object(object) => object,
            _ => return None,
        },
        _ => return None,
    };
    Some(object.body.iter().filter(|n| !n.is_blank()).count())
}

/// Planned breaks of a body: one per non-blank item, plus the closing one
fn plan_breaks(body: &[ParseNode]) -> (Vec<(&ParseNode, Break)>, Break) {
    let mut planned = Vec::new();
    let mut pending: Option<Break> = None;

    for node in body {
        match node {
            ParseNode::Newline => pending = Some(pending.map_or(Break::Line, |b| b.max(Break::Line))),
            ParseNode::DoubleNewline => pending = Some(Break::Blank),
            item => {
                planned.push((item, pending.take().unwrap_or(Break::Space)));
            }
        }
    }

    (planned, pending.unwrap_or(Break::Space))
}

struct Printer<'c> {
    config: &'c FormatConfig,
    output: String,
}

impl<'c> Printer<'c> {
    fn new(config: &'c FormatConfig) -> Self {
        Self {
            config,
            output: String::new(),
        }
    }

    /// Top-level items are never joined onto one line
    fn print_program(&mut self, items: &[ParseNode]) {
        let (planned, _) = plan_breaks(items);
        let mode = match layout_mode(planned.len(), self.config) {
            LayoutMode::SingleLine => LayoutMode::Preserve,
            other => other,
        };
        let mut state = LayoutState::default();
        let mut previous: Option<&ParseNode> = None;

        for &(node, planned_break) in &planned {
            if previous.is_some() {
                let resolved = resolve_break(
                    apply_mode(planned_break, mode),
                    Slot::Before(node),
                    previous,
                    &state,
                    self.config,
                );
                self.write_break(resolved, state.depth);
            }
            self.print_item(node, &state);
            state.advance(node);
            previous = Some(node);
        }

        if previous.is_some() {
            self.output.push('\n');
        }
    }

    fn print_object(&mut self, object: &ObjectNode, depth: usize) {
        self.output.push('{');
        if let Some(comment) = &object.begin.comment {
            self.write_comment(comment);
        }

        let (planned, closing) = plan_breaks(&object.body);
        if planned.is_empty() {
            if object.begin.comment.is_some() {
                self.write_break(Break::Line, depth);
            } else {
                self.output.push(' ');
            }
            self.output.push('}');
            self.write_end_comment(object);
            return;
        }

        let mode = layout_mode(planned.len(), self.config);
        let mut state = LayoutState {
            depth: depth + 1,
            ..LayoutState::default()
        };
        let mut previous: Option<&ParseNode> = None;

        for &(node, planned_break) in &planned {
            let mut planned_break = apply_mode(planned_break, mode);
            if state.index == 0 && object.begin.comment.is_some() {
                planned_break = planned_break.max(Break::Line);
            }
            let resolved =
                resolve_break(planned_break, Slot::Before(node), previous, &state, self.config);
            self.write_break(resolved, state.depth);

            self.print_item(node, &state);
            state.advance(node);
            previous = Some(node);
        }

        let resolved = resolve_break(
            apply_mode(closing, mode),
            Slot::Close,
            previous,
            &state,
            self.config,
        );
        self.write_break(resolved, depth);
        self.output.push('}');
        self.write_end_comment(object);
    }

    fn print_item(&mut self, node: &ParseNode, state: &LayoutState) {
        match node {
            ParseNode::Assignment {
                operator,
                key,
                value,
            } => {
                self.output.push_str(key);
                self.output.push(' ');
                self.output.push_str(operator.as_str());
                self.output.push(' ');
                self.print_item(value, state);
            }
            ParseNode::Scalar(text) | ParseNode::FullLineComment(text) => {
                self.output.push_str(text);
            }
            ParseNode::TrailingComment { inner, text } => {
                self.print_item(inner, state);
                self.write_comment(text);
            }
            ParseNode::Object(object) => {
                // The object's own braces sit one level out from its body
                self.print_object(object, state.depth);
            }
            ParseNode::Sequence(items) => {
                // Only produced by callers building trees by hand; flatten
                for (index, item) in items.iter().filter(|n| !n.is_blank()).enumerate() {
                    if index > 0 {
                        self.output.push(' ');
                    }
                    self.print_item(item, state);
                }
            }
            ParseNode::Newline | ParseNode::DoubleNewline => {}
        }
    }

    fn write_break(&mut self, resolved: Break, depth: usize) {
        match resolved {
            Break::Space => self.output.push(' '),
            Break::Line => {
                self.output.push('\n');
                self.write_indent(depth);
            }
            Break::Blank => {
                self.output.push_str("\n\n");
                self.write_indent(depth);
            }
        }
    }

    fn write_indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.output.push('\t');
        }
    }

    fn write_comment(&mut self, comment: &str) {
        self.output.push_str(&self.config.single_line_separator);
        self.output.push_str(comment);
    }

    fn write_end_comment(&mut self, object: &ObjectNode) {
        if let Some(comment) = &object.end.comment {
            self.write_comment(comment);
        }
    }

    fn finish(self) -> String {
        self.output
    }
}

fn apply_mode(planned: Break, mode: LayoutMode) -> Break {
    match mode {
        LayoutMode::Preserve => planned,
        LayoutMode::SingleLine => Break::Space,
        LayoutMode::MultiLine => planned.max(Break::Line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_str;

    fn format(source: &str, config: &FormatConfig) -> String {
        render(&parse_str(source).unwrap(), config)
    }

    fn format_default(source: &str) -> String {
        format(source, &FormatConfig::default())
    }

    #[test]
    fn test_normalizes_horizontal_whitespace() {
        assert_eq!(format_default("a   =    1\nb=2"), "a = 1\nb = 2\n");
    }

    #[test]
    fn test_indents_with_tabs() {
        assert_eq!(
            format_default("a = {\n  b = {\n c = 1\n }\n}"),
            "a = {\n\tb = {\n\t\tc = 1\n\t}\n}\n"
        );
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(format_default("a = {}"), "a = { }\n");
        assert_eq!(format_default("a = {\n\n}"), "a = { }\n");
    }

    #[test]
    fn test_inline_object_preserved() {
        assert_eq!(format_default("a = { b c d }"), "a = { b c d }\n");
    }

    #[test]
    fn test_blank_lines_preserved_by_default() {
        assert_eq!(format_default("a = 1\n\n\n\nb = 2\n"), "a = 1\n\nb = 2\n");
    }

    #[test]
    fn test_blank_line_before_close_is_dropped() {
        assert_eq!(format_default("a = {\n\tb = 1\n\n}"), "a = {\n\tb = 1\n}\n");
    }

    #[test]
    fn test_default_no_double_blank_line() {
        let config = FormatConfig {
            default_no_double_blank_line: true,
            ..FormatConfig::default()
        };
        assert_eq!(format("a = 1\n\nb = 2\n", &config), "a = 1\nb = 2\n");
    }

    #[test]
    fn test_object_forces_double_blank_line() {
        let config = FormatConfig {
            default_no_double_blank_line: true,
            object_forces_double_blank_line: true,
            ..FormatConfig::default()
        };
        assert_eq!(
            format("a = { x = 1 }\n\nb = 2\n\nc = 3\n", &config),
            "a = { x = 1 }\n\nb = 2\nc = 3\n"
        );
        assert_eq!(
            format("a = { x = 1 }\nb = { y = 2 }\n", &config),
            "a = { x = 1 }\n\nb = { y = 2 }\n"
        );
    }

    #[test]
    fn test_force_single_line() {
        let config = FormatConfig {
            force_single_line_below_item_count: Some(2),
            ..FormatConfig::default()
        };
        assert_eq!(
            format("a = {\n\tx = 1\n\ty = 2\n}\n", &config),
            "a = { x = 1 y = 2 }\n"
        );
        assert_eq!(
            format("a = {\n\tx = 1\n\ty = 2\n\tz = 3\n}\n", &config),
            "a = {\n\tx = 1\n\ty = 2\n\tz = 3\n}\n"
        );
    }

    #[test]
    fn test_blank_line_after_single_line_object_collapses() {
        let config = FormatConfig {
            force_single_line_below_item_count: Some(3),
            ..FormatConfig::default()
        };
        assert_eq!(
            format("a = {\n\tx = 1\n}\n\nb = 2\n", &config),
            "a = { x = 1 }\nb = 2\n"
        );
        assert_eq!(
            format("a = { w x y z }\n\nb = 2\n", &config),
            "a = { w x y z }\n\nb = 2\n"
        );
    }

    #[test]
    fn test_default_yes_double_blank_line() {
        let config = FormatConfig {
            default_yes_double_blank_line: true,
            ..FormatConfig::default()
        };
        assert_eq!(
            format("a = 1\nb = {\n\tc = 1\n\td = 2\n}\ne = { f g }\n", &config),
            "a = 1\n\nb = {\n\tc = 1\n\n\td = 2\n}\n\ne = { f g }\n"
        );
    }

    #[test]
    fn test_top_level_multi_line() {
        let config = FormatConfig {
            force_multi_line_above_item_count: Some(3),
            ..FormatConfig::default()
        };
        assert_eq!(format("a=1 b=2 c=3 d=4", &config), "a = 1\nb = 2\nc = 3\nd = 4\n");
        assert_eq!(format("a=1 b=2", &config), "a = 1 b = 2\n");
    }

    #[test]
    fn test_force_multi_line() {
        let config = FormatConfig {
            force_multi_line_above_item_count: Some(2),
            ..FormatConfig::default()
        };
        assert_eq!(
            format("a = { x y z }\nb = { x y }\n", &config),
            "a = {\n\tx\n\ty\n\tz\n}\nb = { x y }\n"
        );
    }

    #[test]
    fn test_single_line_keeps_comments_on_their_lines() {
        let config = FormatConfig {
            force_single_line_below_item_count: Some(5),
            ..FormatConfig::default()
        };
        assert_eq!(
            format("a = {\n\tx = 1 # note\n\ty = 2\n}\n", &config),
            "a = { x = 1 # note\n\ty = 2 }\n"
        );
        assert_eq!(
            format("a = {\n\t# lead\n\tx = 1\n}\n", &config),
            "a = {\n\t# lead\n\tx = 1 }\n"
        );
        assert_eq!(
            format("a = {\n\tx = 1\n\ty = 2 # last\n}\n", &config),
            "a = { x = 1 y = 2 # last\n}\n"
        );
    }

    #[test]
    fn test_begin_and_end_brace_comments() {
        assert_eq!(
            format_default("a = { # open\nb = 1 } # close\nc = 2"),
            "a = { # open\n\tb = 1 } # close\nc = 2\n"
        );
        assert_eq!(format_default("a = { # open\n}"), "a = { # open\n}\n");
    }

    #[test]
    fn test_trailing_comment_separator() {
        let config = FormatConfig {
            single_line_separator: "\t".to_string(),
            ..FormatConfig::default()
        };
        assert_eq!(format("a = 1 # note\n", &config), "a = 1\t# note\n");
    }

    #[test]
    fn test_relational_operators_rendered() {
        assert_eq!(
            format_default("limit = { age>=16 tag!=ABC exists?=yes }"),
            "limit = { age >= 16 tag != ABC exists ?= yes }\n"
        );
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(format_default(""), "");
        assert_eq!(format_default("\n\n\n"), "");
    }

    #[test]
    fn test_layout_mode_thresholds() {
        let config = FormatConfig {
            force_single_line_below_item_count: Some(1),
            force_multi_line_above_item_count: Some(3),
            ..FormatConfig::default()
        };
        assert_eq!(layout_mode(1, &config), LayoutMode::SingleLine);
        assert_eq!(layout_mode(2, &config), LayoutMode::Preserve);
        assert_eq!(layout_mode(3, &config), LayoutMode::Preserve);
        assert_eq!(layout_mode(4, &config), LayoutMode::MultiLine);
    }
}
