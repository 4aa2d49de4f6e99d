//! Configuration file sections

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::format::FormatConfig;
use crate::error::ClauseError;
use crate::result::Result;

/// Contents of a configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClauseConfig {
    /// Layout switches for rendered files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterConfiguration>,

    /// Which script files are processed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<FilesConfiguration>,

    /// Base and override roots of the dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directories: Option<DirectoriesConfiguration>,
}

/// Formatter section; unset fields fall back to [`FormatConfig::default`]
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormatterConfiguration {
    #[schemars(description = "Collapse blank lines to a single line break")]
    pub default_no_double_blank_line: Option<bool>,

    #[schemars(description = "Widen every line break between items to a blank line")]
    pub default_yes_double_blank_line: Option<bool>,

    #[schemars(description = "Keep blank lines after objects and between consecutive objects")]
    pub object_forces_double_blank_line: Option<bool>,

    #[schemars(description = "Object bodies with at most this many items render on one line")]
    pub force_single_line_below_item_count: Option<usize>,

    #[schemars(description = "Object bodies and the top level with more items than this put every item on its own line")]
    pub force_multi_line_above_item_count: Option<usize>,

    #[schemars(description = "Whitespace written before a comment that follows an item")]
    pub single_line_separator: Option<String>,
}

/// File discovery section
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilesConfiguration {
    /// Glob patterns, relative to the walked root, of files to skip
    #[schemars(description = "Glob patterns of files to skip")]
    pub exclude: Option<Vec<String>>,

    /// Files of at most this many bytes are skipped
    #[schemars(description = "Skip files of at most this many bytes")]
    pub min_file_size: Option<u64>,
}

/// Dataset roots
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoriesConfiguration {
    /// Read-only game data
    #[schemars(description = "Read-only base directory")]
    pub base: Option<PathBuf>,

    /// User-writable directory whose files take precedence
    #[serde(rename = "override")]
    #[schemars(description = "Writable override directory")]
    pub override_dir: Option<PathBuf>,
}

impl ClauseConfig {
    /// Load configuration from file
    ///
    /// The format follows the extension: `.toml`, `.json`, `.yaml` or `.yml`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ClauseError::io_error(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str());

        let parsed = match ext {
            Some("toml") => toml::from_str(&content).map_err(|e| e.to_string()),
            Some("json") => serde_json::from_str(&content).map_err(|e| e.to_string()),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| e.to_string()),
            _ => Err("unsupported file extension (expected .toml, .json, .yaml or .yml)".to_string()),
        };

        parsed.map_err(|message| {
            ClauseError::config_error(format!("Failed to load '{}': {message}", path.display()))
        })
    }

    /// Make relative directories relative to `dir`
    pub fn resolve_relative_to(&mut self, dir: &Path) {
        if let Some(directories) = &mut self.directories {
            for path in [&mut directories.base, &mut directories.override_dir]
                .into_iter()
                .flatten()
            {
                if path.is_relative() {
                    *path = dir.join(&*path);
                }
            }
        }
    }

    /// Validated layout switches
    pub fn format_config(&self) -> Result<FormatConfig> {
        let config = self
            .formatter
            .as_ref()
            .map(FormatterConfiguration::to_format_config)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        self.files
            .as_ref()
            .and_then(|f| f.exclude.clone())
            .unwrap_or_default()
    }

    pub fn min_file_size(&self) -> u64 {
        self.files.as_ref().and_then(|f| f.min_file_size).unwrap_or(0)
    }

    /// JSON Schema of the configuration file
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(ClauseConfig);
        serde_json::to_string_pretty(&schema)
            .map_err(|e| ClauseError::internal_error(format!("Failed to serialize schema: {e}")))
    }
}

impl FormatterConfiguration {
    pub fn to_format_config(&self) -> FormatConfig {
        let defaults = FormatConfig::default();
        FormatConfig {
            default_no_double_blank_line: self
                .default_no_double_blank_line
                .unwrap_or(defaults.default_no_double_blank_line),
            default_yes_double_blank_line: self
                .default_yes_double_blank_line
                .unwrap_or(defaults.default_yes_double_blank_line),
            object_forces_double_blank_line: self
                .object_forces_double_blank_line
                .unwrap_or(defaults.object_forces_double_blank_line),
            force_single_line_below_item_count: self
                .force_single_line_below_item_count
                .or(defaults.force_single_line_below_item_count),
            force_multi_line_above_item_count: self
                .force_multi_line_above_item_count
                .or(defaults.force_multi_line_above_item_count),
            single_line_separator: self
                .single_line_separator
                .clone()
                .unwrap_or(defaults.single_line_separator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clause.toml");
        fs::write(
            &path,
            r#"
[formatter]
defaultNoDoubleBlankLine = true
forceSingleLineBelowItemCount = 2

[files]
exclude = ["**/00_defines.txt"]

[directories]
base = "game"
override = "mod"
"#,
        )
        .unwrap();

        let config = ClauseConfig::load(&path).unwrap();
        let format = config.format_config().unwrap();
        assert!(format.default_no_double_blank_line);
        assert_eq!(format.force_single_line_below_item_count, Some(2));
        assert_eq!(config.exclude_patterns(), vec!["**/00_defines.txt".to_string()]);
        let directories = config.directories.unwrap();
        assert_eq!(directories.override_dir, Some(PathBuf::from("mod")));
    }

    #[test]
    fn test_load_yaml_and_json() {
        let temp_dir = TempDir::new().unwrap();
        let yaml = temp_dir.path().join("clause.yaml");
        fs::write(&yaml, "formatter:\n  objectForcesDoubleBlankLine: true\n").unwrap();
        let config = ClauseConfig::load(&yaml).unwrap();
        assert!(config.format_config().unwrap().object_forces_double_blank_line);

        let json = temp_dir.path().join("clause.json");
        fs::write(&json, r#"{ "files": { "minFileSize": 3 } }"#).unwrap();
        assert_eq!(ClauseConfig::load(&json).unwrap().min_file_size(), 3);
    }

    #[test]
    fn test_invalid_formatter_rejected() {
        let config = ClauseConfig {
            formatter: Some(FormatterConfiguration {
                force_single_line_below_item_count: Some(8),
                force_multi_line_above_item_count: Some(4),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(config.format_config().is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clause.ini");
        fs::write(&path, "").unwrap();
        let err = ClauseConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported file extension"));
    }

    #[test]
    fn test_resolve_relative_directories() {
        let mut config = ClauseConfig {
            directories: Some(DirectoriesConfiguration {
                base: Some(PathBuf::from("game")),
                override_dir: Some(PathBuf::from("/abs/mod")),
            }),
            ..Default::default()
        };
        config.resolve_relative_to(Path::new("/work"));
        let directories = config.directories.unwrap();
        assert_eq!(directories.base, Some(PathBuf::from("/work/game")));
        assert_eq!(directories.override_dir, Some(PathBuf::from("/abs/mod")));
    }

    #[test]
    fn test_json_schema_names_sections() {
        let schema = ClauseConfig::json_schema().unwrap();
        assert!(schema.contains("formatter"));
        assert!(schema.contains("forceSingleLineBelowItemCount"));
    }
}
