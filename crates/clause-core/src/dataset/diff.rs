//! Structural diff between the loaded and the edited logical view

use indexmap::IndexMap;

use crate::logical::{LogicalEntry, LogicalValue, PathSegment, format_path};

/// One top-level key that differs between two views
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(LogicalEntry),
    Removed(LogicalEntry),
    Modified {
        before: LogicalEntry,
        after: LogicalEntry,
    },
}

impl Change {
    pub fn key(&self) -> &str {
        match self {
            Change::Added(entry) | Change::Removed(entry) => &entry.key,
            Change::Modified { after, .. } => &after.key,
        }
    }

    /// Entry as loaded, if the key existed
    pub fn before(&self) -> Option<&LogicalEntry> {
        match self {
            Change::Added(_) => None,
            Change::Removed(entry) | Change::Modified { before: entry, .. } => Some(entry),
        }
    }

    /// Entry as edited, unless the key was removed
    pub fn after(&self) -> Option<&LogicalEntry> {
        match self {
            Change::Removed(_) => None,
            Change::Added(entry) | Change::Modified { after: entry, .. } => Some(entry),
        }
    }
}

/// Changes from `original` to `edited`
///
/// Modifications and removals come in the order of `original`, additions in
/// the order of `edited`. Only values are compared; an entry whose
/// `source_file` alone differs is not a change.
pub fn diff_entries(
    original: &IndexMap<String, LogicalEntry>,
    edited: &IndexMap<String, LogicalEntry>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for (key, before) in original {
        match edited.get(key) {
            Some(after) if after.value != before.value => changes.push(Change::Modified {
                before: before.clone(),
                after: after.clone(),
            }),
            Some(_) => {}
            None => changes.push(Change::Removed(before.clone())),
        }
    }

    for (key, after) in edited {
        if !original.contains_key(key) {
            changes.push(Change::Added(after.clone()));
        }
    }

    changes
}

/// First place where a value turns from a scalar into an object or back
///
/// Returns the path to it and a description. Parts of the two values that
/// have no counterpart in the other are additions or removals, not shape
/// changes.
pub fn shape_change(before: &LogicalValue, after: &LogicalValue) -> Option<(String, String)> {
    let mut path = Vec::new();
    find_shape_change(before, after, &mut path)
}

fn find_shape_change(
    before: &LogicalValue,
    after: &LogicalValue,
    path: &mut Vec<PathSegment>,
) -> Option<(String, String)> {
    match (before, after) {
        (LogicalValue::Comparison { value: left, .. }, LogicalValue::Comparison { value: right, .. }) => {
            find_shape_change(left, right, path)
        }
        (LogicalValue::Comparison { value: left, .. }, right) => find_shape_change(left, right, path),
        (left, LogicalValue::Comparison { value: right, .. }) => find_shape_change(left, right, path),
        (LogicalValue::Mapping(left), LogicalValue::Mapping(right)) => {
            for (key, left_value) in left {
                if let Some(right_value) = right.get(key) {
                    path.push(PathSegment::Key(key.clone()));
                    let found = find_shape_change(left_value, right_value, path);
                    path.pop();
                    if found.is_some() {
                        return found;
                    }
                }
            }
            None
        }
        (left, right) if matches!(left, LogicalValue::Sequence(_)) || matches!(right, LogicalValue::Sequence(_)) => {
            let pairs = left.occurrences().iter().zip(right.occurrences());
            for (index, (left_value, right_value)) in pairs.enumerate() {
                path.push(PathSegment::Index(index));
                let found = find_shape_change(left_value, right_value, path);
                path.pop();
                if found.is_some() {
                    return found;
                }
            }
            None
        }
        (left, right) => match (left.shape(), right.shape()) {
            (Some(from), Some(to)) if from != to => {
                Some((format_path(path), format!("value changes from {from} to {to}")))
            }
            _ => None,
        },
    }
}
