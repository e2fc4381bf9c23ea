//! Fixed directory layout under the application-data root.

use std::path::{Path, PathBuf};

/// Per-device workspaces live under this directory
pub const WORKSPACE_DIR: &str = "Workspace";

/// Staging directory rebuilt on every apply
pub const STAGING_DIR: &str = "EnabledTweaks";

/// Backup output directory consumed by the restore tool
pub const BACKUP_DIR: &str = "Backup";

/// Default template tree name
pub const TEMPLATE_DIR: &str = "Files";

const SESSION_FILE: &str = "session.json";
const LAST_APPLY_FILE: &str = "last_apply.json";

/// Paths derived from the application-data root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    root: PathBuf,
}

impl AppLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Workspace directory for a device; depends on the identifier alone
    pub fn workspace_for(&self, device_identifier: &str) -> PathBuf {
        self.workspace_root().join(device_identifier)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(BACKUP_DIR)
    }

    pub fn default_template_dir(&self) -> PathBuf {
        self.root.join(TEMPLATE_DIR)
    }

    pub fn session_path(&self) -> PathBuf {
        self.root.join(SESSION_FILE)
    }

    pub fn last_apply_path(&self) -> PathBuf {
        self.root.join(LAST_APPLY_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let layout = AppLayout::new("/data");

        assert_eq!(layout.workspace_for("00008110-AB"), PathBuf::from("/data/Workspace/00008110-AB"));
        assert_eq!(layout.staging_dir(), PathBuf::from("/data/EnabledTweaks"));
        assert_eq!(layout.backup_dir(), PathBuf::from("/data/Backup"));
        assert_eq!(layout.default_template_dir(), PathBuf::from("/data/Files"));
        assert_eq!(layout.session_path(), PathBuf::from("/data/session.json"));
    }

    #[test]
    fn test_workspace_is_deterministic() {
        let a = AppLayout::new("/data");
        let b = AppLayout::new("/data");
        assert_eq!(a.workspace_for("X"), b.workspace_for("X"));
        assert_ne!(a.workspace_for("X"), a.workspace_for("Y"));
    }
}
