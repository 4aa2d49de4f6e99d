//! Configuration file discovery and loading

use super::clause_config::ClauseConfig;
use crate::error::ClauseError;
use crate::result::Result;
use std::path::{Path, PathBuf};

/// Names searched for in every directory, in priority order
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".clauserc.toml",
    ".clauserc.json",
    "clause.toml",
    "clause.yaml",
    "clause.yml",
    "clause.json",
];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Find a config file in `start_path` or the nearest ancestor that has one
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| ClauseError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILE_NAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load a config file, resolving its directories against the file's location
    pub fn load_from_file(path: &Path) -> Result<ClauseConfig> {
        let mut config = ClauseConfig::load(path)?;
        if let Some(dir) = path.parent() {
            config.resolve_relative_to(dir);
        }
        config.format_config()?;
        Ok(config)
    }

    /// Load config from an explicit path, or auto-discover one
    ///
    /// Without an explicit path and without a discovered file the defaults apply.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<ClauseConfig> {
        if let Some(path) = custom_path {
            if !path.exists() {
                return Err(ClauseError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));
        match Self::auto_discover(search_dir)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(ClauseConfig::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_config(dir: &Path, filename: &str, content: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_auto_discover_from_nested_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("common/buildings");
        fs::create_dir_all(&nested).unwrap();
        create_temp_config(temp_dir.path(), "clause.toml", "");

        let found = ConfigLoader::auto_discover(&nested).unwrap().unwrap();
        assert!(found.ends_with("clause.toml"));
    }

    #[test]
    fn test_auto_discover_priority() {
        let temp_dir = TempDir::new().unwrap();
        create_temp_config(temp_dir.path(), "clause.json", "{}");
        create_temp_config(temp_dir.path(), ".clauserc.toml", "");

        let found = ConfigLoader::auto_discover(temp_dir.path()).unwrap().unwrap();
        assert!(found.ends_with(".clauserc.toml"));
    }

    #[test]
    fn test_load_resolves_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(
            temp_dir.path(),
            "clause.toml",
            "[directories]\nbase = \"game\"\noverride = \"mod\"\n",
        );

        let config = ConfigLoader::load_from_file(&path).unwrap();
        let directories = config.directories.unwrap();
        assert_eq!(directories.base, Some(temp_dir.path().join("game")));
        assert_eq!(directories.override_dir, Some(temp_dir.path().join("mod")));
    }

    #[test]
    fn test_load_rejects_invalid_formatter() {
        let temp_dir = TempDir::new().unwrap();
        let path = create_temp_config(
            temp_dir.path(),
            "clause.toml",
            "[formatter]\nsingleLineSeparator = \"x\"\n",
        );
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let err = ConfigLoader::load(Some(Path::new("nonexistent.toml")), None).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        // Ancestors of a temp dir normally carry no config file
        if ConfigLoader::auto_discover(temp_dir.path()).unwrap().is_none() {
            let config = ConfigLoader::load(None, Some(temp_dir.path())).unwrap();
            assert_eq!(config, ClauseConfig::default());
        }
    }
}
