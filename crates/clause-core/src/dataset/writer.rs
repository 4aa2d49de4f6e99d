//! Writing override files and reporting what happened

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ClauseError;
use crate::result::Result;

/// Byte-order mark written at the start of every override file
pub const BOM: char = '\u{feff}';

/// Result of a save that found changes
#[derive(Debug, Default)]
pub struct WriteReport {
    /// Files written, in write order
    pub written: Vec<PathBuf>,
    /// The write that failed and stopped the save
    pub failed: Vec<ClauseError>,
    /// Files left unwritten after a failed write
    pub not_attempted: Vec<PathBuf>,
    /// Files whose rendering failed the round-trip check
    pub rejected: Vec<ClauseError>,
    /// Keys whose change cannot be routed into the override tree
    pub unsupported: Vec<ClauseError>,
    /// Saved changes the caller should know about
    pub warnings: Vec<String>,
    /// Keys whose change reached disk
    pub saved_keys: Vec<String>,
    /// Keys whose change did not reach disk
    pub unsaved_keys: Vec<String>,
}

impl WriteReport {
    /// Every change was written
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
            && self.not_attempted.is_empty()
            && self.rejected.is_empty()
            && self.unsupported.is_empty()
    }

    /// One line per problem, for display
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.failed.iter().map(|e| format!("Write failed: {e}")));
        issues.extend(
            self.not_attempted
                .iter()
                .map(|p| format!("Not written: {}", p.display())),
        );
        issues.extend(self.rejected.iter().map(|e| format!("Rejected: {e}")));
        issues.extend(self.unsupported.iter().map(|e| format!("Unsupported: {e}")));
        issues
    }
}

/// What a save did
#[derive(Debug)]
pub enum SaveOutcome {
    /// The edited view matches the loaded one; nothing was written
    Unchanged,
    Written(WriteReport),
}

impl SaveOutcome {
    pub fn report(&self) -> Option<&WriteReport> {
        match self {
            SaveOutcome::Unchanged => None,
            SaveOutcome::Written(report) => Some(report),
        }
    }
}

/// Write `text` with a leading byte-order mark, creating parent directories
pub fn write_with_bom(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ClauseError::io_error(parent, e))?;
    }

    let mut content = String::with_capacity(text.len() + BOM.len_utf8());
    content.push(BOM);
    content.push_str(text.strip_prefix(BOM).unwrap_or(text));

    fs::write(path, content).map_err(|e| ClauseError::io_error(path, e))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Write files in order until one fails
///
/// Returns the files written, the failure and the files after it.
pub fn write_all(files: &[(PathBuf, String)], report: &mut WriteReport) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for (position, (path, text)) in files.iter().enumerate() {
        match write_with_bom(path, text) {
            Ok(()) => {
                written.push(path.clone());
                report.written.push(path.clone());
            }
            Err(err) => {
                warn!("Save aborted: {}", err);
                report.failed.push(err);
                report
                    .not_attempted
                    .extend(files[position + 1..].iter().map(|(p, _)| p.clone()));
                break;
            }
        }
    }

    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_with_bom_creates_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("common/goods/00_goods.txt");
        write_with_bom(&path, "wood = 25\n").unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(&bytes[3..], b"wood = 25\n");
    }

    #[test]
    fn test_write_with_bom_does_not_double_mark() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        write_with_bom(&path, "\u{feff}a = 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "\u{feff}a = 1\n");
    }

    #[test]
    fn test_write_all_stops_at_first_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();

        let files = vec![
            (temp_dir.path().join("a.txt"), "a = 1\n".to_string()),
            (blocker.join("b.txt"), "b = 1\n".to_string()),
            (temp_dir.path().join("c.txt"), "c = 1\n".to_string()),
        ];
        let mut report = WriteReport::default();
        let written = write_all(&files, &mut report);

        assert_eq!(written, vec![temp_dir.path().join("a.txt")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.not_attempted, vec![temp_dir.path().join("c.txt")]);
        assert!(!temp_dir.path().join("c.txt").exists());
        assert!(!report.is_complete());
    }
}
