//! Clause Core
//!
//! Lossless parsing, reformatting and base/override merging for
//! Clausewitz-style game script files.
//!
//! External callers need three operations:
//!
//! - read a file: [`syntax::parse_file`] plus [`logical::extract_entries`],
//!   or [`Dataset::load`] for whole trees;
//! - render a tree: [`syntax::render`] with a [`FormatConfig`];
//! - write edits back: [`Dataset::save`] or [`Dataset::export`].

pub mod config;
pub mod dataset;
pub mod discovery;
pub mod error;
pub mod logical;
pub mod result;
pub mod syntax;

// Re-export commonly used types
pub use config::{
    ClauseConfig, ConfigLoader, DirectoriesConfiguration, FilesConfiguration, FormatConfig,
    FormatterConfiguration,
};
pub use dataset::{
    Change, Dataset, ExcludedFile, Layer, LoadReport, SaveOutcome, SourceFile, WriteReport,
};
pub use discovery::{FileDiscovery, ScriptDiscovery, collect_inputs};
pub use error::{ClauseError, ErrorKind};
pub use logical::{
    Ambiguity, LogicalEntry, LogicalMap, LogicalValue, PathSegment, ValueShape, extract,
    extract_entries, parse_path,
};
pub use result::{Result, ResultExt};
pub use syntax::round_trip::{RoundTripValidator, ValidationResult};
pub use syntax::{ParseError, ParseNode, RelationalOperator, parse_file, parse_str, render};

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "clause=info";

/// Initialize the tracing subscriber for logging
///
/// `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
