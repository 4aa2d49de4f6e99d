//! Edits applied to parse trees in place
//!
//! Only the nodes of the changed key are touched. Comments, blank lines and
//! sibling entries stay as they are, so an untouched part of a file renders
//! exactly as it was loaded. Trailing comments survive value edits.

use crate::logical::{LogicalMap, LogicalValue, to_nodes, value_node};
use crate::syntax::{ParseNode, RelationalOperator};

/// Make the occurrences of `key` in `items` match `value`
///
/// `None` removes every occurrence. Existing occurrences are patched in
/// order; surplus ones are removed and missing ones are inserted after the
/// last existing occurrence, or at the end of the body. `inline` bodies get
/// no line breaks around inserted items.
pub fn patch_key(items: &mut Vec<ParseNode>, key: &str, value: Option<&LogicalValue>, inline: bool) {
    let desired = value.map(LogicalValue::occurrences).unwrap_or_default();
    let positions = key_positions(items, key);

    for (&index, occurrence) in positions.iter().zip(desired) {
        patch_node(&mut items[index], key, occurrence);
    }

    if positions.len() > desired.len() {
        for &index in positions[desired.len()..].iter().rev() {
            remove_item(items, index);
        }
        return;
    }

    let mut insert_at = positions.last().map_or(items.len(), |index| index + 1);
    for occurrence in &desired[positions.len()..] {
        for node in to_nodes(key, occurrence) {
            insert_at = insert_item(items, insert_at, node, inline);
        }
    }
}

/// Bring an object body in line with `map`, keeping what already matches
pub fn patch_body(body: &mut Vec<ParseNode>, map: &LogicalMap) {
    let inline = !body.iter().any(ParseNode::is_blank) && !body.is_empty();

    let mut stale = Vec::new();
    for item in body.iter() {
        if let Some(key) = item.entry_key()
            && !map.contains_key(key)
            && !stale.iter().any(|k: &String| k == key)
        {
            stale.push(key.to_string());
        }
    }
    for key in stale {
        patch_key(body, &key, None, inline);
    }

    for (key, value) in map {
        patch_key(body, key, Some(value), inline);
    }
}

/// Positions of the items holding `key`
pub fn key_positions(items: &[ParseNode], key: &str) -> Vec<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.entry_key() == Some(key))
        .map(|(index, _)| index)
        .collect()
}

/// Nodes of `key` together with the full-line comments directly above each
///
/// Used to carry a base definition, with its documentation, into an
/// override file. The result starts and ends without line breaks.
pub fn key_block(items: &[ParseNode], key: &str) -> Vec<ParseNode> {
    let mut block = Vec::new();

    for index in key_positions(items, key) {
        let mut start = index;
        while start > 0 {
            match &items[start - 1] {
                ParseNode::Newline | ParseNode::FullLineComment(_) => start -= 1,
                _ => break,
            }
        }
        while items.get(start).is_some_and(ParseNode::is_blank) {
            start += 1;
        }

        if !block.is_empty() {
            block.push(ParseNode::Newline);
        }
        block.extend(items[start..=index].iter().cloned());
    }

    block
}

/// Append nodes to a file body on lines of their own
pub fn append_block(items: &mut Vec<ParseNode>, block: Vec<ParseNode>) {
    if block.is_empty() {
        return;
    }
    match items.last() {
        None => {}
        Some(ParseNode::Newline) => {
            items.pop();
            items.push(ParseNode::DoubleNewline);
        }
        Some(ParseNode::DoubleNewline) => {}
        Some(_) => items.push(ParseNode::DoubleNewline),
    }
    items.extend(block);
    items.push(ParseNode::Newline);
}

fn patch_node(node: &mut ParseNode, key: &str, value: &LogicalValue) {
    let inner = node.without_comment_mut();

    match (&mut *inner, value) {
        (ParseNode::Scalar(_), LogicalValue::Flag) => {}
        (ParseNode::Object(object), LogicalValue::Mapping(map)) => patch_body(&mut object.body, map),
        (
            ParseNode::Assignment {
                operator,
                value: current,
                ..
            },
            desired,
        ) if *desired != LogicalValue::Flag => {
            let (new_operator, new_value) = match desired {
                LogicalValue::Comparison { operator, value } => (*operator, value.as_ref()),
                other => (RelationalOperator::Equal, other),
            };
            *operator = new_operator;
            patch_value(current, new_value);
        }
        (inner, desired) => {
            if let Some(replacement) = to_nodes(key, desired).into_iter().next() {
                *inner = replacement;
            }
        }
    }
}

fn patch_value(current: &mut ParseNode, desired: &LogicalValue) {
    match (&mut *current, desired) {
        (ParseNode::Scalar(text), LogicalValue::Scalar(new_text)) => {
            if text != new_text {
                *text = new_text.clone();
            }
        }
        (ParseNode::Object(object), LogicalValue::Mapping(map)) => patch_body(&mut object.body, map),
        (current, desired) => *current = value_node(desired),
    }
}

/// Remove an item and the line break that separated it from its neighbour
fn remove_item(items: &mut Vec<ParseNode>, index: usize) {
    items.remove(index);
    if index > 0 && items[index - 1] == ParseNode::Newline {
        items.remove(index - 1);
    } else if items.get(index) == Some(&ParseNode::Newline) {
        items.remove(index);
    }
}

/// Insert an item, returning the position after it
fn insert_item(items: &mut Vec<ParseNode>, mut index: usize, node: ParseNode, inline: bool) -> usize {
    if !inline && index > 0 && !items[index - 1].is_blank() {
        items.insert(index, ParseNode::Newline);
        index += 1;
    }
    items.insert(index, node);
    index += 1;
    if !inline && items.get(index).is_none_or(|next| !next.is_blank()) {
        items.insert(index, ParseNode::Newline);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormatConfig;
    use crate::logical::extract_entries;
    use crate::syntax::{parse_str, render};

    fn patched(source: &str, key: &str, value: Option<LogicalValue>) -> String {
        let mut items = parse_str(source).unwrap().items().to_vec();
        patch_key(&mut items, key, value.as_ref(), false);
        render(&ParseNode::Sequence(items), &FormatConfig::default())
    }

    fn value_of(source: &str, key: &str) -> LogicalValue {
        extract_entries(&parse_str(source).unwrap()).0[key].clone()
    }

    #[test]
    fn test_scalar_edit_keeps_comments() {
        let source = "# goods\nwood = 20 # base price\n\niron = 40\n";
        assert_eq!(
            patched(source, "wood", Some(LogicalValue::scalar("25"))),
            "# goods\nwood = 25 # base price\n\niron = 40\n"
        );
    }

    #[test]
    fn test_nested_edit_touches_only_changed_leaf() {
        let source = "building = {\n\t# cost block\n\tcosts = { iron = 5 wood = 2 }\n\n\tlevel = 1 # start\n}\n";
        let value = value_of(
            "building = {\n\tcosts = { iron = 7 wood = 2 }\n\tlevel = 1\n}\n",
            "building",
        );
        assert_eq!(
            patched(source, "building", Some(value)),
            "building = {\n\t# cost block\n\tcosts = { iron = 7 wood = 2 }\n\n\tlevel = 1 # start\n}\n"
        );
    }

    #[test]
    fn test_add_and_remove_nested_keys() {
        let source = "b = {\n\tx = 1\n\ty = 2\n}\n";
        let value = value_of("b = {\n\tx = 1\n\tz = 3\n}\n", "b");
        assert_eq!(
            patched(source, "b", Some(value)),
            "b = {\n\tx = 1\n\tz = 3\n}\n"
        );
    }

    #[test]
    fn test_inline_body_stays_inline() {
        let source = "b = { x = 1 }\n";
        let value = value_of("b = { x = 1 y = 2 }", "b");
        assert_eq!(patched(source, "b", Some(value)), "b = { x = 1 y = 2 }\n");
    }

    #[test]
    fn test_operator_change() {
        let source = "trigger = { age >= 16 }\n";
        let value = value_of("trigger = { age > 18 }", "trigger");
        assert_eq!(patched(source, "trigger", Some(value)), "trigger = { age > 18 }\n");
    }

    #[test]
    fn test_remove_top_level_key() {
        let source = "a = 1\nb = 2\nc = 3\n";
        assert_eq!(patched(source, "b", None), "a = 1\nc = 3\n");
        assert_eq!(patched(source, "a", None), "b = 2\nc = 3\n");
    }

    #[test]
    fn test_repeated_key_grows_after_last_occurrence() {
        let source = "a = 1\na = 2\nb = 3\n";
        let value = LogicalValue::Sequence(vec![
            LogicalValue::scalar("1"),
            LogicalValue::scalar("2"),
            LogicalValue::scalar("4"),
        ]);
        assert_eq!(
            patched(source, "a", Some(value)),
            "a = 1\na = 2\na = 4\nb = 3\n"
        );
    }

    #[test]
    fn test_repeated_key_shrinks_to_single() {
        let source = "a = 1\na = 2\nb = 3\n";
        assert_eq!(
            patched(source, "a", Some(LogicalValue::scalar("9"))),
            "a = 9\nb = 3\n"
        );
    }

    #[test]
    fn test_new_key_appended() {
        assert_eq!(
            patched("a = 1\n", "b", Some(LogicalValue::scalar("2"))),
            "a = 1\nb = 2\n"
        );
        assert_eq!(patched("", "b", Some(LogicalValue::scalar("2"))), "b = 2\n");
    }

    #[test]
    fn test_key_block_takes_comment_header() {
        let tree = parse_str("a = 1\n\n# about b\n# more\nb = { x = 1 }\nc = 2\n").unwrap();
        let block = key_block(tree.items(), "b");
        assert_eq!(
            render(&ParseNode::Sequence(block), &FormatConfig::default()),
            "# about b\n# more\nb = { x = 1 }\n"
        );
    }

    #[test]
    fn test_append_block_separates_with_blank_line() {
        let mut items = parse_str("a = 1\n").unwrap().items().to_vec();
        append_block(&mut items, vec![ParseNode::FullLineComment("# b".into()), ParseNode::Newline, ParseNode::scalar("b")]);
        assert_eq!(
            render(&ParseNode::Sequence(items), &FormatConfig::default()),
            "a = 1\n\n# b\nb\n"
        );
    }
}
