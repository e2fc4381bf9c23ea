//! Newest-wins recursive directory merge.
//!
//! Every entry under the source root is mirrored at the same relative path
//! under the destination root:
//! - absent destination entries are copied (directories recursively), and
//!   copied files keep the source modification time
//! - directories present on both sides are merged, never replaced
//! - files present on both sides are overwritten only when the destination
//!   is strictly older than the source; equal timestamps skip
//!
//! Nothing is ever removed from the destination. A failure stops the merge
//! where it happened; work already done stays in place.

mod exclude;
mod report;

pub use exclude::{ExcludeError, ExcludeRules, DEFAULT_EXCLUDES};
pub use report::{EntryKind, MergeAction, MergeReport};

use filetime::FileTime;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Errors for merge operations
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Source directory not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Source is not a directory: {0}")]
    SourceNotDirectory(PathBuf),

    #[error("Type mismatch at {path}: source is a {source_kind}, destination is a {destination_kind}")]
    TypeMismatch {
        path: PathBuf,
        source_kind: EntryKind,
        destination_kind: EntryKind,
    },

    #[error("Failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Exclude rules error: {0}")]
    Exclude(#[from] ExcludeError),
}

impl MergeError {
    fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        MergeError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The path the failure is attached to
    pub fn path(&self) -> Option<&Path> {
        match self {
            MergeError::SourceMissing(p) | MergeError::SourceNotDirectory(p) => Some(p),
            MergeError::TypeMismatch { path, .. }
            | MergeError::Io { path, .. }
            | MergeError::Walk { path, .. } => Some(path),
            MergeError::Exclude(_) => None,
        }
    }
}

/// Options for a merge call
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    exclude: ExcludeRules,
}

impl MergeOptions {
    /// Default options: built-in exclusions only
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that merge every entry, hidden ones included
    pub fn include_all() -> Self {
        Self {
            exclude: ExcludeRules::empty(),
        }
    }

    /// Add exclusion patterns on top of the current rules
    pub fn with_excludes<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, MergeError> {
        self.exclude = self.exclude.with_patterns(patterns)?;
        Ok(self)
    }

    /// Exclusion rules in effect
    pub fn exclude_rules(&self) -> &ExcludeRules {
        &self.exclude
    }
}

/// Merge `source` into `destination` with the default options.
pub fn merge(source: &Path, destination: &Path) -> Result<MergeReport, MergeError> {
    merge_with(source, destination, &MergeOptions::default())
}

/// Merge `source` into `destination`.
///
/// The destination root is created if it does not exist yet.
pub fn merge_with(
    source: &Path,
    destination: &Path,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    Merger::new(source, destination, options, true).run()
}

/// Compute what [`merge_with`] would do without touching the destination.
pub fn plan(
    source: &Path,
    destination: &Path,
    options: &MergeOptions,
) -> Result<MergeReport, MergeError> {
    Merger::new(source, destination, options, false).run()
}

struct Merger<'a> {
    source: &'a Path,
    destination: &'a Path,
    options: &'a MergeOptions,
    apply: bool,
    report: MergeReport,
}

impl<'a> Merger<'a> {
    fn new(source: &'a Path, destination: &'a Path, options: &'a MergeOptions, apply: bool) -> Self {
        Self {
            source,
            destination,
            options,
            apply,
            report: MergeReport::default(),
        }
    }

    fn run(mut self) -> Result<MergeReport, MergeError> {
        self.check_roots()?;

        let source = self.source;
        let options = self.options;
        let rules = options.exclude_rules();
        let mut excluded: Vec<PathBuf> = Vec::new();

        let walker = WalkDir::new(source)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let rel = match entry.path().strip_prefix(source) {
                    Ok(rel) if !rel.as_os_str().is_empty() => rel,
                    _ => return true,
                };
                if rules.is_excluded(rel) {
                    excluded.push(rel.to_path_buf());
                    false
                } else {
                    true
                }
            });

        for entry in walker {
            let entry = entry.map_err(|e| MergeError::Walk {
                path: e.path().unwrap_or(source).to_path_buf(),
                source: e,
            })?;
            self.merge_entry(&entry)?;
        }

        for rel in excluded {
            debug!(path = %rel.display(), "excluded from merge");
            self.report.record(MergeAction::Excluded, rel);
        }

        Ok(self.report)
    }

    fn check_roots(&self) -> Result<(), MergeError> {
        match fs::metadata(self.source) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(MergeError::SourceNotDirectory(self.source.to_path_buf())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MergeError::SourceMissing(self.source.to_path_buf()))
            }
            Err(e) => return Err(MergeError::io("read", self.source, e)),
        }

        // The destination root itself may be reached through a link.
        let root = match fs::metadata(self.destination) {
            Ok(meta) => Some(meta),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(MergeError::io("stat", self.destination, e)),
        };

        match root {
            Some(meta) if meta.is_dir() => Ok(()),
            Some(meta) => Err(MergeError::TypeMismatch {
                path: self.destination.to_path_buf(),
                source_kind: EntryKind::Directory,
                destination_kind: EntryKind::of(meta.file_type()),
            }),
            None => {
                if self.apply {
                    fs::create_dir_all(self.destination)
                        .map_err(|e| MergeError::io("create directory", self.destination, e))?;
                }
                Ok(())
            }
        }
    }

    fn merge_entry(&mut self, entry: &walkdir::DirEntry) -> Result<(), MergeError> {
        let src_path = entry.path();
        let rel = src_path
            .strip_prefix(self.source)
            .map(Path::to_path_buf)
            .map_err(|_| MergeError::io("resolve", src_path, io::Error::other("entry outside source root")))?;
        let dst_path = self.destination.join(&rel);
        let src_kind = EntryKind::of(entry.file_type());
        let dst_meta = lstat(&dst_path)?;

        if src_kind == EntryKind::Directory {
            return match dst_meta {
                None => {
                    if self.apply {
                        fs::create_dir(&dst_path)
                            .map_err(|e| MergeError::io("create directory", &dst_path, e))?;
                    }
                    debug!(path = %rel.display(), "created directory");
                    self.report.record(MergeAction::CreatedDir, rel);
                    Ok(())
                }
                Some(meta) if meta.is_dir() => Ok(()),
                // A link to a directory is merged into like the directory itself.
                Some(meta) if meta.file_type().is_symlink() && points_to_dir(&dst_path) => Ok(()),
                Some(meta) => Err(MergeError::TypeMismatch {
                    path: dst_path,
                    source_kind: src_kind,
                    destination_kind: EntryKind::of(meta.file_type()),
                }),
            };
        }

        let src_meta = entry
            .metadata()
            .map_err(|e| MergeError::Walk {
                path: src_path.to_path_buf(),
                source: e,
            })?;

        let action = match dst_meta {
            None => MergeAction::Copied,
            Some(meta) if meta.is_dir() => {
                return Err(MergeError::TypeMismatch {
                    path: dst_path,
                    source_kind: src_kind,
                    destination_kind: EntryKind::Directory,
                });
            }
            Some(meta) => {
                let src_mtime = FileTime::from_last_modification_time(&src_meta);
                let dst_mtime = FileTime::from_last_modification_time(&meta);
                if dst_mtime < src_mtime {
                    MergeAction::Overwritten
                } else {
                    MergeAction::Skipped
                }
            }
        };

        if self.apply && action != MergeAction::Skipped {
            copy_entry(src_path, &dst_path, &src_meta, src_kind)?;
        }

        debug!(path = %rel.display(), ?action, "merged entry");
        self.report.record(action, rel);
        Ok(())
    }
}

/// `symlink_metadata` with NotFound mapped to `None`.
fn lstat(path: &Path) -> Result<Option<Metadata>, MergeError> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MergeError::io("stat", path, e)),
    }
}

fn points_to_dir(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_dir())
}

fn copy_entry(src: &Path, dst: &Path, src_meta: &Metadata, kind: EntryKind) -> Result<(), MergeError> {
    let mtime = FileTime::from_last_modification_time(src_meta);

    if kind == EntryKind::Symlink {
        let target = fs::read_link(src).map_err(|e| MergeError::io("read link", src, e))?;
        if lstat(dst)?.is_some() {
            fs::remove_file(dst).map_err(|e| MergeError::io("replace", dst, e))?;
        }
        create_symlink(&target, dst)?;
        let atime = FileTime::from_last_access_time(src_meta);
        return filetime::set_symlink_file_times(dst, atime, mtime)
            .map_err(|e| MergeError::io("set modification time of", dst, e));
    }

    // Replace rather than write through: a link would redirect the write to
    // its target and a read-only file would refuse it.
    if lstat(dst)?.is_some() {
        fs::remove_file(dst).map_err(|e| MergeError::io("replace", dst, e))?;
    }

    fs::copy(src, dst).map_err(|e| MergeError::io("copy", dst, e))?;
    filetime::set_file_mtime(dst, mtime).map_err(|e| MergeError::io("set modification time of", dst, e))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> Result<(), MergeError> {
    std::os::unix::fs::symlink(target, link).map_err(|e| MergeError::io("create link", link, e))
}

#[cfg(not(unix))]
fn create_symlink(_target: &Path, link: &Path) -> Result<(), MergeError> {
    Err(MergeError::io(
        "create link",
        link,
        io::Error::new(io::ErrorKind::Unsupported, "symbolic links are not supported on this platform"),
    ))
}
