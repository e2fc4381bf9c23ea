//! Apply summary (last_apply.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use super::stage::ApplyStage;
use crate::compose::TreeDigest;
use crate::tweak::TweakId;

/// Schema version for last_apply.json
pub const APPLY_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for last_apply.json
pub const APPLY_SUMMARY_SCHEMA_ID: &str = "tweakstage/apply_summary@1";

/// Terminal status of an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    Running,
    Success,
    Failed,
}

/// A stage entered during the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: ApplyStage,
    pub at: DateTime<Utc>,
}

/// Record of one apply run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplySummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    pub run_id: String,

    pub device_identifier: String,

    /// Archive and restore were not invoked
    pub dry_run: bool,

    pub status: ApplyStatus,

    /// Current (or final) stage
    pub stage: ApplyStage,

    pub started_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    pub duration_ms: u64,

    pub transitions: Vec<StageTransition>,

    /// Tweaks merged into staging, in merge order
    pub composed: Vec<TweakId>,

    /// Enabled tweaks with no workspace directory
    pub missing: Vec<TweakId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<TreeDigest>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<ApplyStage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub exit_code: i32,
}

impl ApplySummary {
    /// Start a summary in IDLE
    pub fn begin(run_id: String, device_identifier: String, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            schema_version: APPLY_SUMMARY_SCHEMA_VERSION,
            schema_id: APPLY_SUMMARY_SCHEMA_ID.to_string(),
            run_id,
            device_identifier,
            dry_run,
            status: ApplyStatus::Running,
            stage: ApplyStage::Idle,
            started_at: now,
            finished_at: None,
            duration_ms: 0,
            transitions: vec![StageTransition {
                stage: ApplyStage::Idle,
                at: now,
            }],
            composed: Vec::new(),
            missing: Vec::new(),
            staging: None,
            failed_stage: None,
            error: None,
            exit_code: 0,
        }
    }

    /// Move to `target`, returning false if the transition is not allowed
    pub fn enter(&mut self, target: ApplyStage) -> bool {
        if !self.stage.can_transition_to(target) {
            return false;
        }
        self.stage = target;
        self.transitions.push(StageTransition {
            stage: target,
            at: Utc::now(),
        });
        true
    }

    /// Stages entered so far, in order
    pub fn stages(&self) -> Vec<ApplyStage> {
        self.transitions.iter().map(|t| t.stage).collect()
    }

    pub(crate) fn succeed(&mut self, duration_ms: u64) {
        self.enter(ApplyStage::Done);
        self.status = ApplyStatus::Success;
        self.finish(duration_ms);
    }

    pub(crate) fn fail(&mut self, message: String, exit_code: i32, duration_ms: u64) {
        let failed_in = self.stage;
        if !self.enter(ApplyStage::Failed) {
            self.stage = ApplyStage::Failed;
        }
        self.status = ApplyStatus::Failed;
        self.failed_stage = Some(failed_in);
        self.error = Some(message);
        self.exit_code = exit_code;
        self.finish(duration_ms);
    }

    fn finish(&mut self, duration_ms: u64) {
        self.finished_at = Some(Utc::now());
        self.duration_ms = duration_ms;
    }

    /// Human-readable one-liner
    pub fn human_summary(&self) -> String {
        match self.status {
            ApplyStatus::Failed => format!(
                "Apply failed in {}: {}",
                self.failed_stage.unwrap_or(self.stage),
                self.error.as_deref().unwrap_or("unknown error")
            ),
            _ if self.dry_run => format!(
                "Dry run composed {} tweak(s) into staging ({} files)",
                self.composed.len(),
                self.staging.as_ref().map_or(0, |d| d.file_count)
            ),
            _ => format!(
                "Applied {} tweak(s) to {}",
                self.composed.len(),
                self.device_identifier
            ),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }
}
