//! Configuration for formatting, file discovery and the dataset roots
//!
//! ## Configuration Files
//!
//! Searched for from the working directory upwards, first match wins:
//! `.clauserc.toml`, `.clauserc.json`, `clause.toml`, `clause.yaml`,
//! `clause.yml`, `clause.json`.
//!
//! ## Example Configuration (clause.toml)
//!
//! ```toml
//! [formatter]
//! defaultNoDoubleBlankLine = true
//! objectForcesDoubleBlankLine = true
//! forceSingleLineBelowItemCount = 2
//! forceMultiLineAboveItemCount = 6
//!
//! [files]
//! exclude = ["**/00_defines.txt", "common/history/**"]
//!
//! [directories]
//! base = "game"
//! override = "mod"
//! ```
//!
//! Relative directories are resolved against the file's own directory.

mod clause_config;
mod format;
mod loader;
mod merge;

pub use clause_config::{
    ClauseConfig, DirectoriesConfiguration, FilesConfiguration, FormatterConfiguration,
};
pub use format::FormatConfig;
pub use loader::ConfigLoader;
