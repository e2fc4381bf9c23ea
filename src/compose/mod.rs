//! Overlay composition
//!
//! Rebuilds the staging directory from the enabled tweaks: staging is
//! emptied first, then each tweak's workspace directory is merged into it in
//! the set's enumeration order. Conflicts between tweaks resolve through the
//! merge engine's newest-wins rule, which makes the result independent of
//! that order.

mod digest;

pub use digest::{digest_tree, TreeDigest};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use tweakstage_merge::{MergeError, MergeOptions, MergeReport};

use crate::tweak::{TweakId, TweakSet};

/// Errors for overlay composition
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Failed to reset {path}: {source}")]
    StagingResetFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to merge tweak '{tweak}': {source}")]
    Overlay {
        tweak: TweakId,
        #[source]
        source: MergeError,
    },
}

/// What a composition contributed to staging
#[derive(Debug, Clone, Default)]
pub struct ComposeReport {
    /// Tweaks whose directory was merged
    pub composed: Vec<TweakId>,
    /// Enabled tweaks with no directory in the workspace
    pub missing: Vec<TweakId>,
    /// Combined merge outcome across all composed tweaks
    pub merge: MergeReport,
}

/// Remove every child of `path`, or create it if absent. The directory
/// itself is kept.
pub fn reset_directory(path: &Path) -> Result<(), ComposeError> {
    let reset_err = |source: io::Error| ComposeError::StagingResetFailed {
        path: path.to_path_buf(),
        source,
    };

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(reset_err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "exists and is not a directory",
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(reset_err)?;
            debug!(path = %path.display(), "created directory");
            return Ok(());
        }
        Err(e) => return Err(reset_err(e)),
    }

    for entry in fs::read_dir(path).map_err(reset_err)? {
        let entry = entry.map_err(reset_err)?;
        let child = entry.path();
        let file_type = entry.file_type().map_err(reset_err)?;
        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&child)
        } else {
            fs::remove_file(&child)
        };
        removed.map_err(|source| ComposeError::StagingResetFailed { path: child, source })?;
    }

    debug!(path = %path.display(), "emptied directory");
    Ok(())
}

/// Reset `staging` and merge each enabled tweak's workspace directory into it.
///
/// Tweaks without a directory in the workspace contribute nothing. The first
/// merge failure aborts; tweaks merged before it stay in staging.
pub fn compose_overlays(
    enabled: &TweakSet,
    workspace: &Path,
    staging: &Path,
    options: &MergeOptions,
) -> Result<ComposeReport, ComposeError> {
    reset_directory(staging)?;

    let mut report = ComposeReport::default();
    for tweak in enabled {
        let overlay = workspace.join(tweak.as_str());
        if !overlay.exists() {
            warn!(%tweak, "tweak has no workspace directory, nothing to compose");
            report.missing.push(tweak.clone());
            continue;
        }

        let merged = tweakstage_merge::merge_with(&overlay, staging, options).map_err(|source| {
            ComposeError::Overlay {
                tweak: tweak.clone(),
                source,
            }
        })?;
        info!(%tweak, %merged, "tweak composed");
        report.merge.absorb(merged);
        report.composed.push(tweak.clone());
    }

    Ok(report)
}
