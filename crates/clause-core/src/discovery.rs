//! Script file discovery
//!
//! Walks a directory tree for `.txt` script files, skipping symlinks, files
//! matched by the configured exclude globs and files at or below the
//! configured minimum size. Results are sorted so that load order, and with
//! it first-definition provenance, is stable.

use crate::config::ClauseConfig;
use crate::error::ClauseError;
use crate::result::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Extension of script files
pub const SCRIPT_EXTENSION: &str = "txt";

/// Trait for file discovery functionality
pub trait FileDiscovery {
    /// Script files under the root, sorted by path
    fn discover_files(&self, config: &ClauseConfig) -> Result<Vec<PathBuf>>;

    /// Check if a file should be included based on configuration
    fn should_include(&self, path: &Path, config: &ClauseConfig) -> bool;
}

/// Walks one root directory
#[derive(Debug, Clone)]
pub struct ScriptDiscovery {
    /// Root directory for file discovery
    pub root_dir: PathBuf,
}

impl ScriptDiscovery {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn exclude_patterns(config: &ClauseConfig) -> Result<Vec<Pattern>> {
        config
            .exclude_patterns()
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| {
                    ClauseError::config_error(format!("Invalid glob pattern '{pattern}': {e}"))
                })
            })
            .collect()
    }

    /// Check if a path matches any exclude pattern, relative to the root
    fn is_excluded(&self, path: &Path, patterns: &[Pattern]) -> bool {
        let relative_path = path.strip_prefix(&self.root_dir).unwrap_or(path);
        let path_str = relative_path.to_string_lossy().replace('\\', "/");
        patterns.iter().any(|pattern| pattern.matches(&path_str))
    }

    fn is_script(path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(SCRIPT_EXTENSION))
            .unwrap_or(false)
    }

    fn is_large_enough(path: &Path, min_size: u64) -> bool {
        if min_size == 0 {
            return true;
        }
        match std::fs::metadata(path) {
            Ok(metadata) => metadata.len() > min_size,
            Err(e) => {
                warn!("Failed to read metadata of {}: {}", path.display(), e);
                false
            }
        }
    }
}

impl FileDiscovery for ScriptDiscovery {
    fn discover_files(&self, config: &ClauseConfig) -> Result<Vec<PathBuf>> {
        info!("Discovering script files in {}", self.root_dir.display());

        if !self.root_dir.is_dir() {
            return Err(ClauseError::config_error(format!(
                "Not a directory: {}",
                self.root_dir.display()
            )));
        }

        let patterns = Self::exclude_patterns(config)?;
        let min_size = config.min_file_size();
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root_dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !Self::is_script(path) {
                continue;
            }
            if self.is_excluded(path, &patterns) {
                debug!("Excluded {}", path.display());
                continue;
            }
            if !Self::is_large_enough(path, min_size) {
                debug!("Skipping small file {}", path.display());
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        debug!("Discovered {} script files", files.len());
        Ok(files)
    }

    fn should_include(&self, path: &Path, config: &ClauseConfig) -> bool {
        let patterns = match Self::exclude_patterns(config) {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        };
        Self::is_script(path)
            && !self.is_excluded(path, &patterns)
            && Self::is_large_enough(path, config.min_file_size())
    }
}

/// Expand command-line inputs: directories are walked, files are kept as given
pub fn collect_inputs(inputs: &[PathBuf], config: &ClauseConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(ScriptDiscovery::new(input).discover_files(config)?);
        } else if input.is_file() {
            files.push(input.clone());
        } else {
            return Err(ClauseError::io_error(
                input,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        }
    }
    files.dedup();
    Ok(files)
}
