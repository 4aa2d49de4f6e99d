//! Base/override dataset and the merge engine that saves edits
//!
//! ## Loading
//!
//! Both roots are walked for script files, which are parsed in parallel.
//! Files that fail to parse are left out and listed in the [`LoadReport`].
//! Every top-level key becomes a [`LogicalEntry`] tagged with the file that
//! defines it. A key defined in several files of one tree collapses into a
//! sequence; the first file, in path order, is its `source_file`. Keys
//! defined in the override tree replace the base entries of the same name.
//!
//! ## Saving
//!
//! The edited view is diffed against the view as loaded and every change is
//! routed to an override file:
//!
//! - a key from the base tree goes to the override file with the same
//!   relative path, seeded with a copy of the base definition when needed;
//! - a key from the override tree is patched where it is;
//! - a removed key is deleted from its override file, which is written even
//!   when it ends up empty.
//!
//! Each touched file is rendered, checked to parse back to the same tree and
//! written with a byte-order mark. Base files are never written.

mod diff;
mod patch;
mod writer;

pub use diff::{Change, diff_entries, shape_change};
pub use patch::{append_block, key_block, key_positions, patch_body, patch_key};
pub use writer::{BOM, SaveOutcome, WriteReport, write_all, write_with_bom};

use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{ClauseConfig, FormatConfig};
use crate::discovery::{FileDiscovery, ScriptDiscovery};
use crate::error::ClauseError;
use crate::logical::{
    Ambiguity, LogicalEntry, LogicalMap, LogicalValue, PathSegment, extract_entries, format_path,
};
use crate::result::{Result, ResultExt};
use crate::syntax::round_trip::RoundTripValidator;
use crate::syntax::{ParseNode, parse, read_source, tokenize};

/// Which tree a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Base,
    Override,
}

/// A parsed script file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path below the root of its tree
    pub relative: PathBuf,
    pub tree: ParseNode,
    pub entries: LogicalMap,
}

/// A file left out of the dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// What happened while loading
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub base_files: usize,
    pub override_files: usize,
    pub excluded: Vec<ExcludedFile>,
    /// Repeated keys whose values disagree in shape
    pub ambiguities: Vec<(PathBuf, Ambiguity)>,
    /// Base files that have an override file with the same name
    pub shadowed: Vec<PathBuf>,
    pub lex_warnings: usize,
}

/// Both trees, the logical view built from them and the view as loaded
#[derive(Debug, Clone)]
pub struct Dataset {
    base_dir: PathBuf,
    override_dir: PathBuf,
    base_files: BTreeMap<PathBuf, SourceFile>,
    override_files: BTreeMap<PathBuf, SourceFile>,
    logical: IndexMap<String, LogicalEntry>,
    original: IndexMap<String, LogicalEntry>,
    report: LoadReport,
    format: FormatConfig,
}

/// An override file being rebuilt during a save
struct DirtyFile {
    items: Vec<ParseNode>,
    changes: Vec<Change>,
}

impl Dataset {
    /// Load with the default configuration
    pub fn load(base_dir: impl Into<PathBuf>, override_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::load_with_config(base_dir, override_dir, &ClauseConfig::default())
    }

    /// Load, honouring the configured exclusions and layout
    ///
    /// A missing override directory is an empty override tree; it is
    /// created on the first save.
    pub fn load_with_config(
        base_dir: impl Into<PathBuf>,
        override_dir: impl Into<PathBuf>,
        config: &ClauseConfig,
    ) -> Result<Self> {
        let base_dir = base_dir.into();
        let override_dir = override_dir.into();
        let format = config.format_config()?;

        info!(
            "Loading base tree {} with override tree {}",
            base_dir.display(),
            override_dir.display()
        );

        let mut report = LoadReport::default();
        let base_files = load_tree(&base_dir, config, &mut report)?;
        let override_files = if override_dir.is_dir() {
            load_tree(&override_dir, config, &mut report)?
        } else {
            debug!("Override tree {} does not exist yet", override_dir.display());
            BTreeMap::new()
        };
        report.base_files = base_files.len();
        report.override_files = override_files.len();

        let mut dataset = Self {
            base_dir,
            override_dir,
            base_files,
            override_files,
            logical: IndexMap::new(),
            original: IndexMap::new(),
            report,
            format,
        };
        dataset.build_logical();

        info!(
            "Loaded {} entries from {} base and {} override files ({} excluded)",
            dataset.logical.len(),
            dataset.report.base_files,
            dataset.report.override_files,
            dataset.report.excluded.len()
        );
        Ok(dataset)
    }

    fn build_logical(&mut self) {
        let mut logical = collect_entries(&self.base_files);
        for (key, entry) in collect_entries(&self.override_files) {
            logical.insert(key, entry);
        }

        for file in self.override_files.values() {
            let Some(name) = file.relative.file_name() else {
                continue;
            };
            for base in self.base_files.values() {
                if base.relative.file_name() == Some(name) {
                    debug!("{} shadows {}", file.path.display(), base.path.display());
                    self.report.shadowed.push(base.path.clone());
                }
            }
        }

        self.original = logical.clone();
        self.logical = logical;
    }

    pub fn with_format_config(mut self, format: FormatConfig) -> Self {
        self.format = format;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn override_dir(&self) -> &Path {
        &self.override_dir
    }

    pub fn base_files(&self) -> &BTreeMap<PathBuf, SourceFile> {
        &self.base_files
    }

    pub fn override_files(&self) -> &BTreeMap<PathBuf, SourceFile> {
        &self.override_files
    }

    /// The logical view, including unsaved edits
    pub fn logical(&self) -> &IndexMap<String, LogicalEntry> {
        &self.logical
    }

    /// The logical view as loaded, or as of the last save
    pub fn original(&self) -> &IndexMap<String, LogicalEntry> {
        &self.original
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn format_config(&self) -> &FormatConfig {
        &self.format
    }

    pub fn has_unsaved_changes(&self) -> bool {
        !diff_entries(&self.original, &self.logical).is_empty()
    }

    /// Tree a file belongs to and its path below that tree's root
    ///
    /// Relative paths are taken to be below the override root.
    pub fn locate(&self, path: &Path) -> Option<(Layer, PathBuf)> {
        if path.is_relative() {
            return Some((Layer::Override, path.to_path_buf()));
        }
        if let Ok(relative) = path.strip_prefix(&self.override_dir) {
            return Some((Layer::Override, relative.to_path_buf()));
        }
        if let Ok(relative) = path.strip_prefix(&self.base_dir) {
            return Some((Layer::Base, relative.to_path_buf()));
        }
        None
    }

    /// Whether any base file defines `key`
    pub fn base_defines(&self, key: &str) -> bool {
        self.base_files.values().any(|file| file.entries.contains_key(key))
    }

    pub fn get_logical_entry(&self, key: &str) -> Option<&LogicalEntry> {
        self.logical.get(key)
    }

    /// Set the value at `path` inside the entry for `key`
    ///
    /// An empty path replaces the whole value. Returns the value replaced.
    pub fn set_logical_value(
        &mut self,
        key: &str,
        path: &[PathSegment],
        value: LogicalValue,
    ) -> Result<Option<LogicalValue>> {
        let entry = self
            .logical
            .get_mut(key)
            .ok_or_else(|| ClauseError::invalid_path(key, format_path(path), "no such entry"))?;
        entry
            .value
            .set_path(path, value)
            .map_err(|message| ClauseError::invalid_path(key, format_path(path), message))
    }

    /// Add a new top-level entry, to be saved to `relative_file` in the override tree
    pub fn insert_logical_entry(
        &mut self,
        key: impl Into<String>,
        value: LogicalValue,
        relative_file: impl AsRef<Path>,
    ) -> Result<()> {
        let key = key.into();
        let relative_file = relative_file.as_ref();

        if self.logical.contains_key(&key) {
            return Err(ClauseError::invalid_path(&key, "", "entry already exists"));
        }
        if relative_file.is_absolute() {
            return Err(ClauseError::invalid_path(
                &key,
                "",
                format!(
                    "'{}' must be relative to the override directory",
                    relative_file.display()
                ),
            ));
        }

        let source_file = self.override_dir.join(relative_file);
        self.logical
            .insert(key.clone(), LogicalEntry::new(key, value, source_file));
        Ok(())
    }

    pub fn remove_logical_entry(&mut self, key: &str) -> Option<LogicalEntry> {
        self.logical.shift_remove(key)
    }

    /// Save the dataset's own edited view
    pub fn export(&mut self) -> Result<SaveOutcome> {
        let edited = self.logical.clone();
        self.save(&edited)
    }

    /// Write the differences between `edited` and the loaded view to the override tree
    ///
    /// Problems confined to a key or a file are listed in the report; the
    /// rest of the save goes ahead. A failed write stops the save.
    pub fn save(&mut self, edited: &IndexMap<String, LogicalEntry>) -> Result<SaveOutcome> {
        let changes = diff_entries(&self.original, edited);
        if changes.is_empty() {
            debug!("No changes to save");
            return Ok(SaveOutcome::Unchanged);
        }
        info!("Saving {} changed entries", changes.len());

        let mut report = WriteReport::default();
        let mut dirty: BTreeMap<PathBuf, DirtyFile> = BTreeMap::new();

        for change in changes {
            let relative = match self.route(&change) {
                Ok(relative) => relative,
                Err(err) => {
                    warn!("{}", err);
                    report.unsupported.push(err);
                    report.unsaved_keys.push(change.key().to_string());
                    continue;
                }
            };

            let file = dirty.entry(relative.clone()).or_insert_with(|| DirtyFile {
                items: self
                    .override_files
                    .get(&relative)
                    .map(|file| file.tree.items().to_vec())
                    .unwrap_or_default(),
                changes: Vec::new(),
            });
            self.apply_change(&relative, &change, &mut file.items, &mut report.warnings);
            file.changes.push(change);
        }

        let validator = RoundTripValidator::with_config(self.format.clone());
        let mut pending = Vec::new();
        for (relative, file) in dirty {
            let path = self.override_dir.join(&relative);
            let tree = ParseNode::Sequence(file.items);
            match validator.render_checked(&tree) {
                Ok(text) => pending.push((relative, path, tree, text, file.changes)),
                Err(detail) => {
                    let err = ClauseError::reconstruction_mismatch(&path, detail);
                    warn!("{}", err);
                    report.rejected.push(err);
                    report
                        .unsaved_keys
                        .extend(file.changes.iter().map(|c| c.key().to_string()));
                }
            }
        }

        let files: Vec<(PathBuf, String)> = pending
            .iter()
            .map(|(_, path, _, text, _)| (path.clone(), text.clone()))
            .collect();
        let written = write_all(&files, &mut report);

        for (relative, path, tree, _, changes) in pending {
            if written.contains(&path) {
                self.commit(relative, path, tree, &changes, &mut report);
            } else {
                report
                    .unsaved_keys
                    .extend(changes.iter().map(|c| c.key().to_string()));
            }
        }

        for warning in &report.warnings {
            warn!("{}", warning);
        }
        info!(
            "Wrote {} files, {} keys saved, {} keys not saved",
            report.written.len(),
            report.saved_keys.len(),
            report.unsaved_keys.len()
        );
        Ok(SaveOutcome::Written(report))
    }

    /// Override file, relative to the override root, that receives a change
    fn route(&self, change: &Change) -> Result<PathBuf> {
        let key = change.key();

        if let Some(before) = change.before()
            && !before.also_defined_in.is_empty()
        {
            return Err(ClauseError::unsupported_diff(
                key,
                "",
                format!("defined in {} files", before.also_defined_in.len() + 1),
            ));
        }
        if let Change::Modified { before, after } = change
            && let Some((path, reason)) = shape_change(&before.value, &after.value)
        {
            return Err(ClauseError::unsupported_diff(key, path, reason));
        }

        let source = change
            .before()
            .or_else(|| change.after())
            .map(|entry| entry.source_file.as_path())
            .ok_or_else(|| ClauseError::internal_error("change without an entry"))?;

        match self.locate(source) {
            Some((layer, relative)) => {
                debug!("Routing '{}' from {:?} file {}", key, layer, relative.display());
                Ok(relative)
            }
            None => Err(ClauseError::unsupported_diff(
                key,
                "",
                format!("source file {} is outside both trees", source.display()),
            )),
        }
    }

    fn apply_change(
        &self,
        relative: &Path,
        change: &Change,
        items: &mut Vec<ParseNode>,
        warnings: &mut Vec<String>,
    ) {
        let key = change.key();

        match change.after() {
            None => {
                patch_key(items, key, None, false);
                if self.base_defines(key) {
                    warnings.push(format!(
                        "'{key}' was removed from {} but the base tree still defines it; \
                         it will be inherited again on the next load",
                        self.override_dir.join(relative).display()
                    ));
                }
            }
            Some(after) => {
                if key_positions(items, key).is_empty()
                    && let Some(base) = self.base_files.get(relative)
                {
                    append_block(items, key_block(base.tree.items(), key));
                }
                patch_key(items, key, Some(&after.value), false);
            }
        }
    }

    /// Record a written file as the new state of the override tree
    fn commit(
        &mut self,
        relative: PathBuf,
        path: PathBuf,
        tree: ParseNode,
        changes: &[Change],
        report: &mut WriteReport,
    ) {
        let (entries, _) = extract_entries(&tree);
        self.override_files.insert(
            relative.clone(),
            SourceFile {
                path: path.clone(),
                relative,
                tree,
                entries,
            },
        );

        for change in changes {
            let key = change.key().to_string();
            match change.after() {
                Some(after) => {
                    let mut entry = after.clone();
                    entry.source_file = path.clone();
                    entry.also_defined_in.clear();
                    self.original.insert(key.clone(), entry.clone());
                    self.logical.insert(key.clone(), entry);
                }
                None => {
                    self.original.shift_remove(&key);
                    self.logical.shift_remove(&key);
                }
            }
            report.saved_keys.push(key);
        }
    }
}

/// Parse every script file under `root`, in parallel
fn load_tree(
    root: &Path,
    config: &ClauseConfig,
    report: &mut LoadReport,
) -> Result<BTreeMap<PathBuf, SourceFile>> {
    let paths = ScriptDiscovery::new(root).discover_files(config)?;

    let results: Vec<_> = paths
        .par_iter()
        .map(|path| load_file(root, path))
        .collect();

    let mut files = BTreeMap::new();
    for (path, result) in paths.iter().zip(results) {
        let loaded = result.recover_with(|err| {
            warn!("Excluding {}: {}", path.display(), err);
            report.excluded.push(ExcludedFile {
                path: path.clone(),
                reason: err.to_string(),
            });
        })?;
        let Some((file, ambiguities, lex_warnings)) = loaded else {
            continue;
        };

        report.lex_warnings += lex_warnings;
        for ambiguity in ambiguities {
            warn!("Ambiguous repeated key in {}: {}", path.display(), ambiguity);
            report.ambiguities.push((path.clone(), ambiguity));
        }
        files.insert(file.relative.clone(), file);
    }

    Ok(files)
}

fn load_file(root: &Path, path: &Path) -> Result<(SourceFile, Vec<Ambiguity>, usize)> {
    debug!("Parsing {}", path.display());
    let source = read_source(path)?;
    let (tokens, warnings) = tokenize(&source);
    let tree = parse(&tokens).map_err(|e| ClauseError::parse_error(path, e))?;
    let (entries, ambiguities) = extract_entries(&tree);
    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

    Ok((
        SourceFile {
            path: path.to_path_buf(),
            relative,
            tree,
            entries,
        },
        ambiguities,
        warnings.len(),
    ))
}

/// Top-level entries of one tree, in file order
fn collect_entries(files: &BTreeMap<PathBuf, SourceFile>) -> IndexMap<String, LogicalEntry> {
    let mut entries: IndexMap<String, LogicalEntry> = IndexMap::new();

    for file in files.values() {
        for (key, value) in &file.entries {
            match entries.get_mut(key) {
                Some(existing) => {
                    for occurrence in value.occurrences() {
                        existing.value.push_repeated(occurrence.clone());
                    }
                    existing.also_defined_in.push(file.path.clone());
                }
                None => {
                    entries.insert(
                        key.clone(),
                        LogicalEntry::new(key.clone(), value.clone(), file.path.clone()),
                    );
                }
            }
        }
    }

    entries
}
