//! Apply stage machine
//!
//! IDLE → RESET_STAGING → COMPOSE_OVERLAYS → GENERATE_BACKUP_ARCHIVE →
//! RESTORE_TO_DEVICE → DONE, with FAILED reachable from every working stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of an apply run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplyStage {
    Idle,
    ResetStaging,
    ComposeOverlays,
    GenerateBackupArchive,
    RestoreToDevice,
    Done,
    Failed,
}

impl ApplyStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplyStage::Done | ApplyStage::Failed)
    }

    /// Check if transition from this stage to target is valid
    pub fn can_transition_to(&self, target: ApplyStage) -> bool {
        use ApplyStage::*;
        match (self, target) {
            (Idle, ResetStaging) => true,
            (ResetStaging, ComposeOverlays) => true,
            (ComposeOverlays, GenerateBackupArchive) => true,
            // Dry runs stop after composing
            (ComposeOverlays, Done) => true,
            (GenerateBackupArchive, RestoreToDevice) => true,
            (RestoreToDevice, Done) => true,

            (ResetStaging | ComposeOverlays | GenerateBackupArchive | RestoreToDevice, Failed) => true,

            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyStage::Idle => "IDLE",
            ApplyStage::ResetStaging => "RESET_STAGING",
            ApplyStage::ComposeOverlays => "COMPOSE_OVERLAYS",
            ApplyStage::GenerateBackupArchive => "GENERATE_BACKUP_ARCHIVE",
            ApplyStage::RestoreToDevice => "RESTORE_TO_DEVICE",
            ApplyStage::Done => "DONE",
            ApplyStage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplyStage::*;

    #[test]
    fn test_forward_path() {
        let path = [Idle, ResetStaging, ComposeOverlays, GenerateBackupArchive, RestoreToDevice, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Idle.can_transition_to(ComposeOverlays));
        assert!(!ResetStaging.can_transition_to(GenerateBackupArchive));
        assert!(!GenerateBackupArchive.can_transition_to(Done));
        assert!(!Idle.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_stages() {
        assert!(Done.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Done.can_transition_to(ResetStaging));
        assert!(!Failed.can_transition_to(RestoreToDevice));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&GenerateBackupArchive).unwrap();
        assert_eq!(json, r#""GENERATE_BACKUP_ARCHIVE""#);
    }
}
