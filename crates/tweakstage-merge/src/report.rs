//! Merge outcome bookkeeping.

use std::fmt;
use std::path::PathBuf;

/// Kind of a filesystem entry as seen by the merge (links are not followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

impl EntryKind {
    pub(crate) fn of(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
            EntryKind::Symlink => write!(f, "symlink"),
        }
    }
}

/// What the merge did (or would do) with a single source entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// Destination was absent; the entry was copied.
    Copied,
    /// Destination was strictly older; its content was replaced.
    Overwritten,
    /// Destination was newer or equally old; left untouched.
    Skipped,
    /// Destination directory was absent and has been created.
    CreatedDir,
    /// Entry matched an exclusion rule.
    Excluded,
}

/// Relative paths (to the merge roots) grouped by the action taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub copied: Vec<PathBuf>,
    pub overwritten: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub created_dirs: Vec<PathBuf>,
    pub excluded: Vec<PathBuf>,
}

impl MergeReport {
    pub(crate) fn record(&mut self, action: MergeAction, path: PathBuf) {
        match action {
            MergeAction::Copied => self.copied.push(path),
            MergeAction::Overwritten => self.overwritten.push(path),
            MergeAction::Skipped => self.skipped.push(path),
            MergeAction::CreatedDir => self.created_dirs.push(path),
            MergeAction::Excluded => self.excluded.push(path),
        }
    }

    /// Number of files whose destination content changed
    pub fn files_written(&self) -> usize {
        self.copied.len() + self.overwritten.len()
    }

    /// True when the destination was not modified at all
    pub fn is_noop(&self) -> bool {
        self.files_written() == 0 && self.created_dirs.is_empty()
    }

    /// Fold another report into this one (used when several sources share a
    /// destination).
    pub fn absorb(&mut self, other: MergeReport) {
        self.copied.extend(other.copied);
        self.overwritten.extend(other.overwritten);
        self.skipped.extend(other.skipped);
        self.created_dirs.extend(other.created_dirs);
        self.excluded.extend(other.excluded);
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} copied, {} overwritten, {} skipped, {} dirs created, {} excluded",
            self.copied.len(),
            self.overwritten.len(),
            self.skipped.len(),
            self.created_dirs.len(),
            self.excluded.len()
        )
    }
}
