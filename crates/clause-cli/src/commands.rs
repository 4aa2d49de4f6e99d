//! Command implementations

use anyhow::{Context, Result};
use clause_core::dataset::{BOM, write_with_bom};
use clause_core::syntax::read_source;
use clause_core::{
    ClauseConfig, ConfigLoader, FilesConfiguration, FormatConfig, FormatterConfiguration,
    RoundTripValidator, collect_inputs, extract_entries, parse_file, parse_str,
};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::LayoutArgs;
use crate::output::{CheckSummary, FileCheck, print_format_summary, unified_diff};

/// Outcome of formatting one file
enum Formatted {
    Unchanged,
    Changed {
        original: String,
        formatted: String,
        bom: bool,
    },
    Skipped(String),
}

/// Reformat files, writing only renders that pass the round-trip check
pub fn format_command(
    paths: Vec<PathBuf>,
    check: bool,
    diff: bool,
    exclude: Vec<String>,
    layout: LayoutArgs,
    config_path: Option<PathBuf>,
) -> Result<()> {
    debug!("Running format command on paths: {:?}", paths);

    let mut config = ClauseConfig {
        formatter: Some(layout.into_formatter()),
        files: (!exclude.is_empty()).then(|| FilesConfiguration {
            exclude: Some(exclude),
            min_file_size: None,
        }),
        directories: None,
    };
    config.merge_with(load_config(config_path.as_deref(), &paths)?);

    let format = config.format_config()?;
    let files = resolve_inputs(&paths, &config)?;
    info!("Formatting {} files", files.len());

    let validator = RoundTripValidator::with_config(format);
    let results: Vec<(PathBuf, Formatted)> = files
        .par_iter()
        .map(|path| (path.clone(), format_file(&validator, path)))
        .collect();

    let mut changed = 0;
    let mut unchanged = 0;
    let mut skipped = 0;
    for (path, result) in results {
        match result {
            Formatted::Unchanged => unchanged += 1,
            Formatted::Skipped(reason) => {
                skipped += 1;
                eprintln!("skipped {}: {}", path.display(), reason);
            }
            Formatted::Changed {
                original,
                formatted,
                bom,
            } => {
                changed += 1;
                if diff {
                    print!("{}", unified_diff(&original, &formatted, &path));
                }
                if check {
                    if !diff {
                        println!("would reformat {}", path.display());
                    }
                } else {
                    write_formatted(&path, &formatted, bom)?;
                    debug!("Reformatted {}", path.display());
                }
            }
        }
    }

    print_format_summary(changed, unchanged, skipped, check);

    if skipped > 0 {
        anyhow::bail!("{skipped} files could not be formatted");
    }
    if check && changed > 0 {
        anyhow::bail!("{changed} files are not formatted");
    }
    Ok(())
}

fn format_file(validator: &RoundTripValidator, path: &Path) -> Formatted {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => return Formatted::Skipped(e.to_string()),
    };
    let (source, bom) = match raw.strip_prefix(BOM) {
        Some(stripped) => (stripped, true),
        None => (raw.as_str(), false),
    };

    let result = validator.validate_round_trip(source);
    if !result.is_valid() {
        warn!("Not formatting {}: {:?}", path.display(), result.issues());
        return Formatted::Skipped(result.issues().join("; "));
    }

    if result.formatted == source {
        Formatted::Unchanged
    } else {
        Formatted::Changed {
            original: source.to_string(),
            formatted: result.formatted,
            bom,
        }
    }
}

/// Files that started with a byte-order mark keep it
fn write_formatted(path: &Path, formatted: &str, bom: bool) -> Result<()> {
    if bom {
        write_with_bom(path, formatted)?;
    } else {
        fs::write(path, formatted).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Round-trip report over files, each rendered in the style it already uses
pub fn check_command(
    paths: Vec<PathBuf>,
    json: bool,
    exclude: Vec<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = ClauseConfig {
        files: (!exclude.is_empty()).then(|| FilesConfiguration {
            exclude: Some(exclude),
            min_file_size: None,
        }),
        ..ClauseConfig::default()
    };
    config.merge_with(load_config(config_path.as_deref(), &paths)?);

    let files = resolve_inputs(&paths, &config)?;
    info!("Checking {} files", files.len());

    let checks: Vec<FileCheck> = files.par_iter().map(|path| check_file(path)).collect();
    let summary = CheckSummary::from_checks(checks);

    if json {
        summary.print_json()?;
    } else {
        summary.print_human();
    }

    if summary.has_failures() {
        anyhow::bail!(
            "{} of {} files failed the round-trip check",
            summary.failed.len(),
            summary.files_checked
        );
    }
    Ok(())
}

fn check_file(path: &Path) -> FileCheck {
    let failed = |issue: String| FileCheck {
        path: path.to_path_buf(),
        reconstructed: false,
        consistent: false,
        issues: vec![issue],
    };

    let source = match read_source(path) {
        Ok(source) => source,
        Err(e) => return failed(e.to_string()),
    };
    let tree = match parse_str(&source) {
        Ok(tree) => tree,
        Err(e) => return failed(format!("Original parsing failed: {e}")),
    };

    let validator = RoundTripValidator::with_config(FormatConfig::inferred_from(&tree));
    let result = validator.validate_round_trip(&source);
    let mut issues = result.issues();
    issues.extend(result.differences.iter().take(3).map(ToString::to_string));

    debug!("Checked {}", path.display());
    FileCheck {
        path: path.to_path_buf(),
        reconstructed: result.text_preserved,
        consistent: result.is_consistent(),
        issues,
    }
}

/// Print the key/value view of one file
pub fn dump_command(file: &Path) -> Result<()> {
    let tree = parse_file(file)?;
    let (entries, ambiguities) = extract_entries(&tree);
    for ambiguity in &ambiguities {
        eprintln!("ambiguous: {ambiguity}");
    }
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

pub fn config_schema_command() -> Result<()> {
    println!("{}", ClauseConfig::json_schema()?);
    Ok(())
}

pub fn config_show_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_deref(), &[])?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

/// Explicit config file, or the first one found walking up from the inputs
fn load_config(config_path: Option<&Path>, paths: &[PathBuf]) -> Result<ClauseConfig> {
    let start = match paths.first() {
        Some(path) if path.is_file() => match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
        Some(path) => path.clone(),
        None => PathBuf::from("."),
    };
    Ok(ConfigLoader::load(config_path, Some(&start))?)
}

/// Given paths, else the configured dataset roots that exist, else `.`
fn resolve_inputs(paths: &[PathBuf], config: &ClauseConfig) -> Result<Vec<PathBuf>> {
    let roots: Vec<PathBuf> = if paths.is_empty() {
        let configured: Vec<PathBuf> = config
            .directories
            .iter()
            .flat_map(|d| [d.base.clone(), d.override_dir.clone()])
            .flatten()
            .filter(|dir| dir.is_dir())
            .collect();
        if configured.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            configured
        }
    } else {
        paths.to_vec()
    };
    Ok(collect_inputs(&roots, config)?)
}

impl LayoutArgs {
    fn into_formatter(self) -> FormatterConfiguration {
        FormatterConfiguration {
            default_no_double_blank_line: self.default_no_double_blank_line.then_some(true),
            default_yes_double_blank_line: self.default_yes_double_blank_line.then_some(true),
            object_forces_double_blank_line: self.object_forces_double_blank_line.then_some(true),
            force_single_line_below_item_count: self.force_single_line_below,
            force_multi_line_above_item_count: self.force_multi_line_above,
            single_line_separator: self.separator,
        }
    }
}
