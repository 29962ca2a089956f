use crate::error::RenameError;
use crate::extract::{filesystem_timestamp, is_media_file, MetadataReader};
use crate::metadata::{MetadataRecord, MetadataSource};
use crate::sequence::{is_protected, Resolver};
use crate::template::{Template, DEFAULT_TEMPLATE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub inputs: Vec<PathBuf>,
    pub recursive: bool,
    pub include_hidden: bool,
    pub template: String,
    pub sequence_start: u64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            recursive: false,
            include_hidden: false,
            template: DEFAULT_TEMPLATE.to_string(),
            sequence_start: 1,
        }
    }
}

/// Where one file should end up. Consumed right after it is computed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenamePlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub metadata_source: MetadataSource,
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    Hidden,
    Protected,
    Unsupported,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, SkipReason)>,
    pub dir_counts: BTreeMap<PathBuf, usize>,
}

impl ScanResult {
    fn push(&mut self, path: PathBuf, include_hidden: bool, explicit: bool) {
        if is_protected(&path) {
            self.skipped.push((path, SkipReason::Protected));
        } else if !explicit && !include_hidden && is_hidden(&path) {
            self.skipped.push((path, SkipReason::Hidden));
        } else if !is_media_file(&path) {
            self.skipped.push((path, SkipReason::Unsupported));
        } else {
            if let Some(parent) = path.parent() {
                *self.dir_counts.entry(parent.to_path_buf()).or_default() += 1;
            }
            self.files.push(path);
        }
    }
}

/// Expands the input paths into the ordered list of files to process.
///
/// Directories are listed sorted by file name; without `recursive` only
/// their direct children are taken. A missing input aborts the run.
pub fn scan_inputs(options: &PlanOptions) -> Result<ScanResult, RenameError> {
    let mut result = ScanResult::default();
    let mut seen = HashSet::<PathBuf>::new();

    for input in &options.inputs {
        let root = fs::canonicalize(input).map_err(|err| {
            RenameError::Fatal(format!("invalid input path {}: {}", input.display(), err))
        })?;

        if root.is_file() {
            if seen.insert(root.clone()) {
                result.push(root, options.include_hidden, true);
            }
            continue;
        }

        if !options.include_hidden && is_hidden(&root) {
            log::info!("skipping hidden directory {}", root.display());
            continue;
        }

        let max_depth = if options.recursive { usize::MAX } else { 1 };
        let include_hidden = options.include_hidden;
        let walker = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0
                    || include_hidden
                    || !(entry.file_type().is_dir() && is_hidden(entry.path()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("cannot read directory entry under {}: {}", root.display(), err);
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                log::debug!("processing folder: {}", entry.path().display());
                continue;
            }
            let path = entry.into_path();
            if seen.insert(path.clone()) {
                result.push(path, options.include_hidden, false);
            }
        }
    }

    Ok(result)
}

/// Extracts metadata for `path` and resolves its destination.
pub fn plan_file<R: MetadataReader + ?Sized>(
    path: &Path,
    reader: &R,
    template: &Template,
    resolver: &mut Resolver,
) -> Result<RenamePlan, RenameError> {
    let partial = match reader.read(path)? {
        Some(partial) => partial,
        None => {
            log::debug!("{} has no usable metadata, using file timestamps", path.display());
            Default::default()
        }
    };

    let fallback_date = match partial.date {
        Some(date) => date,
        None => filesystem_timestamp(path).ok_or_else(|| RenameError::PerFile {
            path: path.to_path_buf(),
            reason: "cannot read file timestamps".to_string(),
        })?,
    };

    let folder = path
        .parent()
        .and_then(Path::file_name)
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    let record = MetadataRecord::build(partial, fallback_date, &folder);

    let extension = path
        .extension()
        .map(|v| format!(".{}", v.to_string_lossy()))
        .unwrap_or_default();

    let destination = resolver.resolve(path, template, &record, &extension)?;
    let changed = destination != path;

    Ok(RenamePlan {
        source: path.to_path_buf(),
        destination,
        metadata_source: record.source,
        changed,
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
