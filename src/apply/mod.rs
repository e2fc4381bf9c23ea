//! Apply pipeline
//!
//! Rebuilds staging from the session's enabled tweaks, packages it into a
//! backup and restores that backup onto the selected device. Stages run in
//! order and the first failure ends the run; nothing is retried. Every run
//! that gets past session validation leaves a summary at
//! `<data root>/last_apply.json`.

mod stage;
mod summary;

pub use stage::ApplyStage;
pub use summary::{ApplyStatus, ApplySummary, StageTransition, APPLY_SUMMARY_SCHEMA_ID, APPLY_SUMMARY_SCHEMA_VERSION};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, warn};
use tweakstage_merge::MergeOptions;

use crate::compose::{compose_overlays, digest_tree, reset_directory, ComposeError};
use crate::device::Device;
use crate::layout::{AppLayout, BACKUP_DIR, STAGING_DIR};
use crate::session::{Session, SessionError};
use crate::tools::{ApplyTools, ToolError};
use crate::tweak::{TweakSet, THEMES};

/// Apply errors
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{0}")]
    Session(#[from] SessionError),

    #[error("Staging reset failed: {0}")]
    StagingReset(#[source] ComposeError),

    #[error("Theme rendering failed: {0}")]
    Theme(#[source] ToolError),

    #[error("Composition failed: {0}")]
    Compose(#[source] ComposeError),

    #[error("Failed to digest {path}: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Backup generation failed: {0}")]
    BackupArchive(#[source] ToolError),

    #[error("Restore failed: {0}")]
    Restore(#[source] ToolError),

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: ApplyStage, to: ApplyStage },

    #[error("Failed to write summary {path}: {source}")]
    Summary {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApplyError {
    /// Stage the run was in when this error occurred
    pub fn stage(&self) -> ApplyStage {
        match self {
            ApplyError::Session(_) => ApplyStage::Idle,
            ApplyError::StagingReset(_) => ApplyStage::ResetStaging,
            ApplyError::Theme(_) | ApplyError::Compose(_) | ApplyError::Digest { .. } => {
                ApplyStage::ComposeOverlays
            }
            ApplyError::BackupArchive(_) => ApplyStage::GenerateBackupArchive,
            ApplyError::Restore(_) => ApplyStage::RestoreToDevice,
            ApplyError::InvalidTransition { from, .. } => *from,
            ApplyError::Summary { .. } => ApplyStage::Done,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ApplyError::Session(_) => 2,
            ApplyError::StagingReset(_) => 10,
            ApplyError::Theme(_) => 20,
            ApplyError::Compose(_) | ApplyError::Digest { .. } => 21,
            ApplyError::BackupArchive(_) => 30,
            ApplyError::Restore(_) => 40,
            ApplyError::InvalidTransition { .. } | ApplyError::Summary { .. } => 1,
        }
    }
}

/// Result type for the apply pipeline
pub type ApplyResult<T> = Result<T, ApplyError>;

/// Generate a new run ID
pub fn new_run_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

/// Orchestrates one apply run against the session's selected device
pub struct ApplyPipeline<'a> {
    layout: AppLayout,
    tools: &'a dyn ApplyTools,
    options: MergeOptions,
    dry_run: bool,
}

impl<'a> ApplyPipeline<'a> {
    pub fn new(layout: AppLayout, tools: &'a dyn ApplyTools) -> Self {
        Self {
            layout,
            tools,
            options: MergeOptions::default(),
            dry_run: false,
        }
    }

    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    /// Stop after composing staging; archive and restore are not invoked
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run every stage for the session's current device.
    ///
    /// The enabled set is snapshotted at the start. On failure the summary is
    /// still written and the stage error is returned.
    pub fn run(&self, session: &Session) -> ApplyResult<ApplySummary> {
        let (device, workspace) = session.active_target()?;
        let enabled = session.enabled_tweaks().clone();

        let start = Instant::now();
        let mut summary = ApplySummary::begin(new_run_id(), device.identifier.clone(), self.dry_run);
        info!(run_id = %summary.run_id, device = %device.identifier, tweaks = enabled.len(), dry_run = self.dry_run, "apply started");

        let outcome = self.execute(&mut summary, device, workspace, &enabled);
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                summary.succeed(duration_ms);
                info!(run_id = %summary.run_id, duration_ms, "{}", summary.human_summary());
                self.persist(&summary)?;
                Ok(summary)
            }
            Err(err) => {
                summary.fail(err.to_string(), err.exit_code(), duration_ms);
                error!(run_id = %summary.run_id, stage = %err.stage(), error = %err, "apply failed");
                if let Err(write_err) = self.persist(&summary) {
                    warn!(error = %write_err, "could not record failed apply");
                }
                Err(err)
            }
        }
    }

    fn execute(
        &self,
        summary: &mut ApplySummary,
        device: &Device,
        workspace: &Path,
        enabled: &TweakSet,
    ) -> ApplyResult<()> {
        let root = self.layout.root();
        let staging = self.layout.staging_dir();

        enter(summary, ApplyStage::ResetStaging)?;
        reset_directory(&staging).map_err(ApplyError::StagingReset)?;
        reset_directory(&self.layout.backup_dir()).map_err(ApplyError::StagingReset)?;

        enter(summary, ApplyStage::ComposeOverlays)?;
        if enabled.contains_tag(THEMES) {
            let destination = workspace.join(THEMES);
            info!(destination = %destination.display(), "rendering theme");
            self.tools.render_theme(&destination).map_err(ApplyError::Theme)?;
        }
        let report =
            compose_overlays(enabled, workspace, &staging, &self.options).map_err(ApplyError::Compose)?;
        summary.composed = report.composed;
        summary.missing = report.missing;
        let digest = digest_tree(&staging).map_err(|e| ApplyError::Digest {
            path: staging.clone(),
            source: e,
        })?;
        info!(files = digest.file_count, sha256 = %digest.sha256, "staging composed");
        summary.staging = Some(digest);

        if self.dry_run {
            info!("dry run, skipping backup and restore");
            return Ok(());
        }

        enter(summary, ApplyStage::GenerateBackupArchive)?;
        self.tools
            .generate_backup(root, STAGING_DIR, BACKUP_DIR)
            .map_err(ApplyError::BackupArchive)?;

        enter(summary, ApplyStage::RestoreToDevice)?;
        self.tools
            .restore(root, &device.identifier, BACKUP_DIR)
            .map_err(ApplyError::Restore)?;

        Ok(())
    }

    fn persist(&self, summary: &ApplySummary) -> ApplyResult<()> {
        let path = self.layout.last_apply_path();
        summary
            .write_to_file(&path)
            .map_err(|e| ApplyError::Summary { path, source: e })
    }
}

fn enter(summary: &mut ApplySummary, target: ApplyStage) -> ApplyResult<()> {
    let from = summary.stage;
    if !summary.enter(target) {
        return Err(ApplyError::InvalidTransition { from, to: target });
    }
    info!(stage = %target, "stage entered");
    Ok(())
}
