//! Configuration merging
//!
//! Command-line switches become a [`ClauseConfig`] layered over the file
//! configuration with `merge_with`.

use super::clause_config::*;

impl ClauseConfig {
    /// Merge another config into this one (current takes precedence)
    pub fn merge_with(&mut self, other: ClauseConfig) {
        if let Some(other_formatter) = other.formatter {
            match self.formatter {
                Some(ref mut formatter) => formatter.merge_with(other_formatter),
                None => self.formatter = Some(other_formatter),
            }
        }

        if let Some(other_files) = other.files {
            match self.files {
                Some(ref mut files) => files.merge_with(other_files),
                None => self.files = Some(other_files),
            }
        }

        if let Some(other_directories) = other.directories {
            match self.directories {
                Some(ref mut directories) => directories.merge_with(other_directories),
                None => self.directories = Some(other_directories),
            }
        }
    }
}

impl FormatterConfiguration {
    pub fn merge_with(&mut self, other: FormatterConfiguration) {
        if self.default_no_double_blank_line.is_none() {
            self.default_no_double_blank_line = other.default_no_double_blank_line;
        }
        if self.default_yes_double_blank_line.is_none() {
            self.default_yes_double_blank_line = other.default_yes_double_blank_line;
        }
        if self.object_forces_double_blank_line.is_none() {
            self.object_forces_double_blank_line = other.object_forces_double_blank_line;
        }
        if self.force_single_line_below_item_count.is_none() {
            self.force_single_line_below_item_count = other.force_single_line_below_item_count;
        }
        if self.force_multi_line_above_item_count.is_none() {
            self.force_multi_line_above_item_count = other.force_multi_line_above_item_count;
        }
        if self.single_line_separator.is_none() {
            self.single_line_separator = other.single_line_separator;
        }
    }
}

impl FilesConfiguration {
    /// Exclude patterns are appended, not replaced
    pub fn merge_with(&mut self, other: FilesConfiguration) {
        if let Some(other_patterns) = other.exclude {
            match self.exclude {
                Some(ref mut patterns) => {
                    for pattern in other_patterns {
                        if !patterns.contains(&pattern) {
                            patterns.push(pattern);
                        }
                    }
                }
                None => self.exclude = Some(other_patterns),
            }
        }
        if self.min_file_size.is_none() {
            self.min_file_size = other.min_file_size;
        }
    }
}

impl DirectoriesConfiguration {
    pub fn merge_with(&mut self, other: DirectoriesConfiguration) {
        if self.base.is_none() {
            self.base = other.base;
        }
        if self.override_dir.is_none() {
            self.override_dir = other.override_dir;
        }
    }
}
