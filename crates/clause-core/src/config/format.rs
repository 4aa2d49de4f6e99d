//! Layout switches consumed by the printer

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ClauseError;
use crate::result::Result;
use crate::syntax::ParseNode;

/// Layout switches for one render call
///
/// Never mutated while rendering. Item counts exclude line breaks but include
/// comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatConfig {
    /// Collapse blank lines to a single line break
    pub default_no_double_blank_line: bool,

    /// Widen every line break between items to a blank line
    pub default_yes_double_blank_line: bool,

    /// Keep a blank line after an object even when blank lines are collapsed,
    /// and put one between consecutive object entries
    pub object_forces_double_blank_line: bool,

    /// Object bodies with at most this many items render on one line, and a
    /// blank line after such an object shrinks to a line break
    pub force_single_line_below_item_count: Option<usize>,

    /// Object bodies, and the top level, with more than this many items put
    /// every item on its own line
    pub force_multi_line_above_item_count: Option<usize>,

    /// Written between an item and the comment that follows it on the same line
    pub single_line_separator: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            default_no_double_blank_line: false,
            default_yes_double_blank_line: false,
            object_forces_double_blank_line: false,
            force_single_line_below_item_count: None,
            force_multi_line_above_item_count: None,
            single_line_separator: " ".to_string(),
        }
    }
}

impl FormatConfig {
    /// Reject combinations the printer cannot honour
    pub fn validate(&self) -> Result<()> {
        if let (Some(single), Some(multi)) = (
            self.force_single_line_below_item_count,
            self.force_multi_line_above_item_count,
        ) && single > multi
        {
            return Err(ClauseError::config_error(format!(
                "forceSingleLineBelowItemCount ({single}) must not exceed forceMultiLineAboveItemCount ({multi})"
            )));
        }

        if self.default_yes_double_blank_line {
            if self.default_no_double_blank_line {
                return Err(ClauseError::config_error(
                    "defaultYesDoubleBlankLine cannot be combined with defaultNoDoubleBlankLine",
                ));
            }
            if self.force_multi_line_above_item_count.is_some() {
                return Err(ClauseError::config_error(
                    "defaultYesDoubleBlankLine cannot be combined with forceMultiLineAboveItemCount",
                ));
            }
        }

        let separator = &self.single_line_separator;
        if separator.is_empty() || !separator.chars().all(|c| c == ' ' || c == '\t') {
            return Err(ClauseError::config_error(format!(
                "singleLineSeparator must be spaces or tabs, got {separator:?}"
            )));
        }

        Ok(())
    }

    /// The style a file already follows, for checking that it round-trips as is
    ///
    /// Blank lines are collapsed only when the file has none.
    pub fn inferred_from(tree: &ParseNode) -> Self {
        Self {
            default_no_double_blank_line: !contains_blank_line(tree),
            ..Self::default()
        }
    }
}

fn contains_blank_line(node: &ParseNode) -> bool {
    match node {
        ParseNode::DoubleNewline => true,
        ParseNode::Sequence(items) => items.iter().any(contains_blank_line),
        ParseNode::Assignment { value, .. } => contains_blank_line(value),
        ParseNode::TrailingComment { inner, .. } => contains_blank_line(inner),
        ParseNode::Object(object) => object.body.iter().any(contains_blank_line),
        _ => false,
    }
}
