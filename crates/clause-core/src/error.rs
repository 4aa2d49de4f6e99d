//! Error types for parsing, formatting and writing script files

use std::path::PathBuf;
use thiserror::Error;

use crate::syntax::ParseError;

/// Main error type for clause operations
#[derive(Debug, Error)]
pub enum ClauseError {
    /// A file could not be parsed; the file is excluded from the load
    #[error("Parse error in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File system I/O errors
    #[error("IO error for path '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rendered text did not re-parse to the tree it came from
    #[error("Reconstruction mismatch for '{}': {detail}", path.display())]
    ReconstructionMismatch { path: PathBuf, detail: String },

    /// The structural differ met a change it cannot route into the override tree
    #[error("Unsupported change for key '{key}' at '{path}': {reason}")]
    UnsupportedDiffKind {
        key: String,
        path: String,
        reason: String,
    },

    /// A value path that does not lead anywhere in a logical entry
    #[error("Invalid path '{path}' in '{key}': {message}")]
    InvalidPath {
        key: String,
        path: String,
        message: String,
    },

    /// Internal errors (should not happen)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Error kind for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Config,
    Io,
    Reconstruction,
    UnsupportedDiff,
    InvalidPath,
    Internal,
}

impl ClauseError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClauseError::Parse { .. } => ErrorKind::Parse,
            ClauseError::Config { .. } => ErrorKind::Config,
            ClauseError::Io { .. } => ErrorKind::Io,
            ClauseError::ReconstructionMismatch { .. } => ErrorKind::Reconstruction,
            ClauseError::UnsupportedDiffKind { .. } => ErrorKind::UnsupportedDiff,
            ClauseError::InvalidPath { .. } => ErrorKind::InvalidPath,
            ClauseError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error only affects one file or key, so processing can go on
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Parse
                | ErrorKind::Io
                | ErrorKind::Reconstruction
                | ErrorKind::UnsupportedDiff
        )
    }

    /// Create a parse error for a file
    pub fn parse_error(path: impl Into<PathBuf>, source: ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a reconstruction mismatch error
    pub fn reconstruction_mismatch(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::ReconstructionMismatch {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create an unsupported diff error
    pub fn unsupported_diff(
        key: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnsupportedDiffKind {
            key: key.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(
        key: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPath {
            key: key.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ClauseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}
