//! Report printing for the `check` and `fmt` commands

use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Per-file result of a round-trip check
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub path: PathBuf,
    /// Rendered text equals the source once whitespace is removed
    pub reconstructed: bool,
    /// Rendered text parses back to the same tree
    pub consistent: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl FileCheck {
    pub fn passed(&self) -> bool {
        self.reconstructed && self.consistent
    }
}

/// Totals over every checked file
#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    pub files_checked: usize,
    pub reconstructed: usize,
    pub consistent: usize,
    pub failed: Vec<FileCheck>,
}

impl CheckSummary {
    pub fn from_checks(checks: Vec<FileCheck>) -> Self {
        Self {
            files_checked: checks.len(),
            reconstructed: checks.iter().filter(|c| c.reconstructed).count(),
            consistent: checks.iter().filter(|c| c.consistent).count(),
            failed: checks.into_iter().filter(|c| !c.passed()).collect(),
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Percentage of `count` over the checked files; 100 when nothing was checked
    pub fn rate(&self, count: usize) -> f64 {
        if self.files_checked == 0 {
            100.0
        } else {
            count as f64 * 100.0 / self.files_checked as f64
        }
    }

    pub fn print_human(&self) {
        println!(
            "{} {} files",
            "Checked".bold(),
            self.files_checked.to_string().cyan()
        );
        println!(
            "  reconstruction: {}/{} ({:.1}%)",
            self.reconstructed,
            self.files_checked,
            self.rate(self.reconstructed)
        );
        println!(
            "  consistency:    {}/{} ({:.1}%)",
            self.consistent,
            self.files_checked,
            self.rate(self.consistent)
        );

        if self.failed.is_empty() {
            println!("{}", "All files round-trip".green().bold());
            return;
        }

        println!();
        for check in &self.failed {
            println!("{} {}", "✗".red().bold(), check.path.display());
            for issue in &check.issues {
                println!("    {}", issue.dimmed());
            }
        }
        println!();
        println!(
            "{}",
            format!("{} files failed", self.failed.len()).red().bold()
        );
    }

    pub fn print_json(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// Summary line for the `fmt` command
pub fn print_format_summary(changed: usize, unchanged: usize, skipped: usize, check: bool) {
    let verb = if check { "would be reformatted" } else { "reformatted" };
    let mut line = format!("{changed} files {verb}, {unchanged} files left unchanged");
    if skipped > 0 {
        line.push_str(&format!(", {skipped} files skipped"));
    }
    if changed > 0 && check {
        println!("{}", line.yellow().bold());
    } else {
        println!("{}", line.green());
    }
}

/// Unified diff between the current and the rendered text of a file
pub fn unified_diff(original: &str, modified: &str, path: &Path) -> String {
    use similar::{ChangeTag, TextDiff};

    let diff = TextDiff::from_lines(original, modified);
    let mut output = String::new();

    output.push_str(&format!("{}\n", format!("--- {}", path.display()).bold()));
    output.push_str(&format!(
        "{}\n",
        format!("+++ {} (formatted)", path.display()).bold()
    ));

    for (idx, group) in diff.grouped_ops(3).iter().enumerate() {
        if idx > 0 {
            output.push('\n');
        }

        let old_line = group[0].old_range().start;
        let new_line = group[0].new_range().start;
        let old_len = group.iter().map(|op| op.old_range().len()).sum::<usize>();
        let new_len = group.iter().map(|op| op.new_range().len()).sum::<usize>();

        let header = format!(
            "@@ -{},{} +{},{} @@",
            old_line + 1,
            old_len,
            new_line + 1,
            new_len
        );
        output.push_str(&format!("{}\n", header.cyan()));

        for op in group {
            for change in diff.iter_changes(op) {
                let line = format!(
                    "{}{}",
                    match change.tag() {
                        ChangeTag::Delete => "-",
                        ChangeTag::Insert => "+",
                        ChangeTag::Equal => " ",
                    },
                    change.value()
                );
                let line = line.trim_end_matches('\n');
                let painted = match change.tag() {
                    ChangeTag::Delete => line.red().to_string(),
                    ChangeTag::Insert => line.green().to_string(),
                    ChangeTag::Equal => line.to_string(),
                };
                output.push_str(&painted);
                output.push('\n');
            }
        }
    }

    output
}
