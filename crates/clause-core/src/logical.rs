//! Simplified key/value view of a parse tree
//!
//! Comments and line breaks are dropped, assignments become mapping entries
//! and bare words become flags. A key assigned more than once in the same body
//! becomes a [`LogicalValue::Sequence`] of its values in source order; a key
//! assigned once keeps its plain value. Anonymous objects are stored under
//! the empty key, which no word can spell.
//!
//! The promotion cannot tell `a = 1 a = 2` from a list that happens to have
//! one element, and it hides the order in which different repeated keys were
//! interleaved. Bodies where one key is used with values of different shapes
//! are reported as [`Ambiguity`] so callers can flag the file.

use indexmap::IndexMap;
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::path::PathBuf;

use crate::error::ClauseError;
use crate::result::Result;
use crate::syntax::{ParseNode, RelationalOperator};

/// Ordered mapping of keys to values
pub type LogicalMap = IndexMap<String, LogicalValue>;

/// Value of a logical entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalValue {
    Scalar(String),
    /// A bare word; presence means true
    Flag,
    /// A value joined to its key by an operator other than `=`
    Comparison {
        operator: RelationalOperator,
        value: Box<LogicalValue>,
    },
    Mapping(LogicalMap),
    /// Values of a repeated key
    Sequence(Vec<LogicalValue>),
}

/// Coarse kind of a value, used to detect changes the merge engine cannot route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    Mapping,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Scalar => f.write_str("scalar"),
            ValueShape::Mapping => f.write_str("object"),
        }
    }
}

/// One step into a logical value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// `a/b[2]/c`
pub fn format_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(key);
            }
            PathSegment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

/// A top-level key with its value and the file that defines it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalEntry {
    pub key: String,
    pub value: LogicalValue,
    pub source_file: PathBuf,
    /// Further files defining the same key; their values are in the sequence
    pub also_defined_in: Vec<PathBuf>,
}

impl LogicalEntry {
    pub fn new(key: impl Into<String>, value: LogicalValue, source_file: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            value,
            source_file: source_file.into(),
            also_defined_in: Vec::new(),
        }
    }
}

/// A key whose repeated uses do not agree on what kind of value it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// Keys of the enclosing objects, `a/b`
    pub location: String,
    pub key: String,
    pub reason: String,
}

impl fmt::Display for Ambiguity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "'{}': {}", self.key, self.reason)
        } else {
            write!(f, "'{}' in {}: {}", self.key, self.location, self.reason)
        }
    }
}

impl LogicalValue {
    pub fn scalar(text: impl Into<String>) -> Self {
        LogicalValue::Scalar(text.into())
    }

    /// Text of a scalar, looking through comparisons
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            LogicalValue::Scalar(text) => Some(text),
            LogicalValue::Comparison { value, .. } => value.as_scalar(),
            _ => None,
        }
    }

    /// Scalar text without surrounding quotes
    pub fn as_unquoted(&self) -> Option<&str> {
        self.as_scalar().map(|text| {
            text.strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .unwrap_or(text)
        })
    }

    pub fn as_mapping(&self) -> Option<&LogicalMap> {
        match self {
            LogicalValue::Mapping(map) => Some(map),
            LogicalValue::Comparison { value, .. } => value.as_mapping(),
            _ => None,
        }
    }

    /// Every value a key holds: the elements of a sequence, otherwise itself
    pub fn occurrences(&self) -> &[LogicalValue] {
        match self {
            LogicalValue::Sequence(values) => values,
            other => std::slice::from_ref(other),
        }
    }

    /// Shape of the value; `None` for a sequence mixing shapes
    pub fn shape(&self) -> Option<ValueShape> {
        match self {
            LogicalValue::Scalar(_) | LogicalValue::Flag => Some(ValueShape::Scalar),
            LogicalValue::Comparison { value, .. } => value.shape(),
            LogicalValue::Mapping(_) => Some(ValueShape::Mapping),
            LogicalValue::Sequence(values) => {
                let mut shapes = values.iter().map(LogicalValue::shape);
                let first = shapes.next().flatten()?;
                shapes.all(|shape| shape == Some(first)).then_some(first)
            }
        }
    }

    /// Add another value for the same key, promoting to a sequence
    pub fn push_repeated(&mut self, value: LogicalValue) {
        match self {
            LogicalValue::Sequence(values) => values.push(value),
            single => {
                let first = std::mem::replace(single, LogicalValue::Flag);
                *single = LogicalValue::Sequence(vec![first, value]);
            }
        }
    }

    pub fn get_path(&self, path: &[PathSegment]) -> Option<&LogicalValue> {
        let Some((segment, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, segment) {
            (LogicalValue::Comparison { value, .. }, _) => return value.get_path(path),
            (LogicalValue::Mapping(map), PathSegment::Key(key)) => map.get(key)?,
            (LogicalValue::Sequence(values), PathSegment::Index(index)) => values.get(*index)?,
            _ => return None,
        };
        child.get_path(rest)
    }

    pub fn get_path_mut(&mut self, path: &[PathSegment]) -> Option<&mut LogicalValue> {
        let Some((segment, rest)) = path.split_first() else {
            return Some(self);
        };
        let child = match (self, segment) {
            (LogicalValue::Comparison { value, .. }, _) => return value.get_path_mut(path),
            (LogicalValue::Mapping(map), PathSegment::Key(key)) => map.get_mut(key)?,
            (LogicalValue::Sequence(values), PathSegment::Index(index)) => values.get_mut(*index)?,
            _ => return None,
        };
        child.get_path_mut(rest)
    }

    /// Replace or insert the value at `path`, returning the previous one
    ///
    /// The parent must exist. A key segment inserts into a mapping; an index
    /// segment must address an existing sequence element, or the element just
    /// past the end to append.
    pub fn set_path(
        &mut self,
        path: &[PathSegment],
        value: LogicalValue,
    ) -> std::result::Result<Option<LogicalValue>, String> {
        let Some((last, parent_path)) = path.split_last() else {
            return Ok(Some(std::mem::replace(self, value)));
        };
        let parent = self
            .get_path_mut(parent_path)
            .ok_or_else(|| format!("no value at '{}'", format_path(parent_path)))?;
        let parent = match parent {
            LogicalValue::Comparison { value, .. } => value.as_mut(),
            other => other,
        };

        match (parent, last) {
            (LogicalValue::Mapping(map), PathSegment::Key(key)) => Ok(map.insert(key.clone(), value)),
            (LogicalValue::Sequence(values), PathSegment::Index(index)) if *index < values.len() => {
                Ok(Some(std::mem::replace(&mut values[*index], value)))
            }
            (LogicalValue::Sequence(values), PathSegment::Index(index)) if *index == values.len() => {
                values.push(value);
                Ok(None)
            }
            (LogicalValue::Sequence(values), PathSegment::Index(index)) => Err(format!(
                "index {index} out of range for {} values",
                values.len()
            )),
            (_, PathSegment::Key(key)) => Err(format!("cannot set key '{key}' on a non-object value")),
            (_, PathSegment::Index(index)) => Err(format!("cannot set index {index} on a non-sequence value")),
        }
    }

    /// Remove the value at `path`; an emptied sequence of one collapses to its element
    pub fn remove_path(&mut self, path: &[PathSegment]) -> Option<LogicalValue> {
        let (last, parent_path) = path.split_last()?;
        let parent = self.get_path_mut(parent_path)?;
        let parent = match parent {
            LogicalValue::Comparison { value, .. } => value.as_mut(),
            other => other,
        };

        match (parent, last) {
            (LogicalValue::Mapping(map), PathSegment::Key(key)) => map.shift_remove(key),
            (parent, PathSegment::Index(index)) => {
                let LogicalValue::Sequence(values) = &mut *parent else {
                    return None;
                };
                if *index >= values.len() {
                    return None;
                }
                let removed = values.remove(*index);
                if values.len() == 1 {
                    let only = values.remove(0);
                    *parent = only;
                }
                Some(removed)
            }
            _ => None,
        }
    }
}

impl Serialize for LogicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LogicalValue::Scalar(text) => serializer.serialize_str(text),
            LogicalValue::Flag => serializer.serialize_bool(true),
            LogicalValue::Comparison { operator, value } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("operator", operator)?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            LogicalValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            LogicalValue::Sequence(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

/// Why two values for one key conflict, if they do
pub fn repeat_conflict(existing: &LogicalValue, added: &LogicalValue) -> Option<String> {
    let existing_is_flag = existing.occurrences().iter().any(|v| *v == LogicalValue::Flag);
    let added_is_flag = *added == LogicalValue::Flag;
    if existing_is_flag != added_is_flag {
        return Some("used both as a flag and as an assignment".to_string());
    }
    match (existing.shape(), added.shape()) {
        (Some(left), Some(right)) if left != right => {
            Some(format!("repeated with both {left} and {right} values"))
        }
        _ => None,
    }
}

/// Logical value of a node: bodies become mappings, words scalars
pub fn extract(node: &ParseNode) -> LogicalValue {
    let mut ambiguities = Vec::new();
    extract_value(node, "", &mut ambiguities)
}

/// Top-level entries of a file, with any ambiguous repeated keys
pub fn extract_entries(node: &ParseNode) -> (LogicalMap, Vec<Ambiguity>) {
    let mut ambiguities = Vec::new();
    let entries = extract_body(node.items(), "", &mut ambiguities);
    (entries, ambiguities)
}

fn extract_value(node: &ParseNode, location: &str, ambiguities: &mut Vec<Ambiguity>) -> LogicalValue {
    match node.without_comment() {
        ParseNode::Scalar(text) => LogicalValue::Scalar(text.clone()),
        ParseNode::Object(object) => LogicalValue::Mapping(extract_body(&object.body, location, ambiguities)),
        ParseNode::Sequence(items) => LogicalValue::Mapping(extract_body(items, location, ambiguities)),
        other => LogicalValue::Mapping(extract_body(std::slice::from_ref(other), location, ambiguities)),
    }
}

fn extract_body(items: &[ParseNode], location: &str, ambiguities: &mut Vec<Ambiguity>) -> LogicalMap {
    let mut entries = LogicalMap::new();

    for item in items {
        let Some(key) = item.entry_key() else {
            continue;
        };
        let child_location = match (location.is_empty(), key.is_empty()) {
            (true, _) => key.to_string(),
            (false, true) => location.to_string(),
            (false, false) => format!("{location}/{key}"),
        };

        let value = match item.without_comment() {
            ParseNode::Assignment {
                operator, value, ..
            } => {
                let inner = extract_value(value, &child_location, ambiguities);
                if *operator == RelationalOperator::Equal {
                    inner
                } else {
                    LogicalValue::Comparison {
                        operator: *operator,
                        value: Box::new(inner),
                    }
                }
            }
            ParseNode::Scalar(_) => LogicalValue::Flag,
            ParseNode::Object(object) => {
                LogicalValue::Mapping(extract_body(&object.body, &child_location, ambiguities))
            }
            _ => continue,
        };

        match entries.get_mut(key) {
            Some(existing) => {
                if let Some(reason) = repeat_conflict(existing, &value) {
                    ambiguities.push(Ambiguity {
                        location: location.to_string(),
                        key: key.to_string(),
                        reason,
                    });
                }
                existing.push_repeated(value);
            }
            None => {
                entries.insert(key.to_string(), value);
            }
        }
    }

    entries
}

/// Parse nodes spelling `key` with `value`, one per occurrence
///
/// Line breaks between the nodes are left to the caller.
pub fn to_nodes(key: &str, value: &LogicalValue) -> Vec<ParseNode> {
    value
        .occurrences()
        .iter()
        .map(|occurrence| to_node(key, occurrence))
        .collect()
}

fn to_node(key: &str, value: &LogicalValue) -> ParseNode {
    match value {
        LogicalValue::Flag => ParseNode::scalar(key),
        LogicalValue::Mapping(map) if key.is_empty() => ParseNode::object(mapping_body(map)),
        LogicalValue::Comparison { operator, value } => {
            ParseNode::assignment(key, *operator, value_node(value))
        }
        other => ParseNode::assignment(key, RelationalOperator::Equal, value_node(other)),
    }
}

/// Node standing for a value on the right of an operator
pub fn value_node(value: &LogicalValue) -> ParseNode {
    match value {
        LogicalValue::Scalar(text) => ParseNode::scalar(text.clone()),
        LogicalValue::Flag => ParseNode::scalar("yes"),
        LogicalValue::Comparison { value, .. } => value_node(value),
        LogicalValue::Mapping(map) => ParseNode::object(mapping_body(map)),
        LogicalValue::Sequence(values) => {
            let mut wrapped = LogicalMap::new();
            wrapped.insert(String::new(), LogicalValue::Sequence(values.clone()));
            ParseNode::object(mapping_body(&wrapped))
        }
    }
}

/// Object body for a mapping: one entry per line, or a single line of flags
pub fn mapping_body(map: &LogicalMap) -> Vec<ParseNode> {
    let all_flags = map
        .values()
        .all(|value| value.occurrences().iter().all(|v| *v == LogicalValue::Flag));

    let mut body = Vec::new();
    for (key, value) in map {
        for node in to_nodes(key, value) {
            if !all_flags {
                body.push(ParseNode::Newline);
            }
            body.push(node);
        }
    }
    if !all_flags && !body.is_empty() {
        body.push(ParseNode::Newline);
    }
    body
}

/// Parse an entry path written as `key/child/[2]/leaf`
pub fn parse_path(text: &str) -> Result<Vec<PathSegment>> {
    text.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| match part.strip_prefix('[').and_then(|p| p.strip_suffix(']')) {
            Some(index) => index
                .parse()
                .map(PathSegment::Index)
                .map_err(|_| ClauseError::invalid_path("", text, format!("bad index '{part}'"))),
            None => Ok(PathSegment::Key(part.to_string())),
        })
        .collect()
}
