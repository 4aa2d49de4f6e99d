//! Result type alias for clause operations

use crate::error::ClauseError;

/// Standard Result type for clause operations
pub type Result<T> = std::result::Result<T, ClauseError>;

/// Extension trait for Result to provide additional convenience methods
pub trait ResultExt<T> {
    /// Hand an error confined to one file or key to `on_error` and carry on
    ///
    /// Returns `Ok(None)` for such errors; any other error is returned as is.
    fn recover_with(self, on_error: impl FnOnce(ClauseError)) -> Result<Option<T>>;
}

impl<T> ResultExt<T> for Result<T> {
    fn recover_with(self, on_error: impl FnOnce(ClauseError)) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_recoverable() => {
                on_error(err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_recover_with_collects_file_errors() {
        let mut skipped = Vec::new();
        let parsed: Result<u32> = Err(ClauseError::io_error(
            Path::new("mod/a.txt"),
            std::io::Error::new(std::io::ErrorKind::InvalidData, "not UTF-8"),
        ));
        let value = parsed.recover_with(|err| skipped.push(err)).unwrap();
        assert_eq!(value, None);
        assert_eq!(skipped.len(), 1);

        let ok: Result<u32> = Ok(3);
        assert_eq!(ok.recover_with(|err| skipped.push(err)).unwrap(), Some(3));
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_recover_with_keeps_fatal_errors() {
        let mut skipped = Vec::new();
        let fatal: Result<u32> = Err(ClauseError::internal_error("boom"));
        assert!(fatal.recover_with(|err| skipped.push(err)).is_err());
        assert!(skipped.is_empty());
    }
}
