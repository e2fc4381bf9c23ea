//! Session state
//!
//! Carries the selected device, its workspace and the enabled tweak set
//! between operations. Persisted as `session.json` under the data root.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::device::{Device, DevicePolicy, Eligibility};
use crate::tweak::{TweakId, TweakSet};
use crate::workspace::{ProvisionError, Provisioner};

/// Errors for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No device selected")]
    NoDevice,

    #[error("No workspace for device {0}")]
    NoWorkspace(String),

    #[error("Device {identifier} runs {version}, which is not supported")]
    Unavailable { identifier: String, version: String },

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid session file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Current device, workspace and enabled tweaks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    current_device: Option<Device>,

    #[serde(skip_serializing_if = "Option::is_none")]
    current_workspace: Option<PathBuf>,

    enabled: TweakSet,

    device_available: bool,

    device_tested: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `device` current and provision its workspace.
    ///
    /// `SkipSetup` is enabled whatever the outcome. Unsupported devices are
    /// recorded but get no workspace. If seeding fails the workspace is
    /// still recorded, since the directory exists by then.
    pub fn select_device(
        &mut self,
        device: Device,
        provisioner: &Provisioner,
        policy: &DevicePolicy,
    ) -> Result<Eligibility, SessionError> {
        let eligibility = policy.check(&device.version);
        let identifier = device.identifier.clone();

        self.enabled.insert(TweakId::skip_setup());
        self.current_workspace = None;
        self.device_available = eligibility.available;
        self.device_tested = eligibility.tested;

        if !eligibility.available {
            warn!(device = %identifier, version = %device.version, "device version not supported");
            self.current_device = Some(device);
            return Ok(eligibility);
        }

        info!(device = %identifier, version = %device.version, tested = eligibility.tested, "device selected");
        self.current_device = Some(device);

        let workspace = provisioner.ensure_workspace(&identifier)?;
        self.current_workspace = Some(workspace.clone());
        provisioner.seed(&workspace)?;

        Ok(eligibility)
    }

    /// Forget the device, workspace and every enabled tweak
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_tweak_enabled(&mut self, tweak: TweakId, enabled: bool) {
        self.enabled.set_enabled(tweak, enabled);
    }

    pub fn is_tweak_enabled(&self, tweak: &TweakId) -> bool {
        self.enabled.contains(tweak)
    }

    pub fn enabled_tweaks(&self) -> &TweakSet {
        &self.enabled
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.current_device.as_ref()
    }

    pub fn current_device_identifier(&self) -> Option<&str> {
        self.current_device.as_ref().map(|d| d.identifier.as_str())
    }

    pub fn current_workspace(&self) -> Option<&Path> {
        self.current_workspace.as_deref()
    }

    pub fn device_available(&self) -> bool {
        self.device_available
    }

    pub fn device_tested(&self) -> bool {
        self.device_tested
    }

    /// The selected device, provided it is supported and has a workspace
    pub fn active_target(&self) -> Result<(&Device, &Path), SessionError> {
        let device = self.current_device.as_ref().ok_or(SessionError::NoDevice)?;
        if !self.device_available {
            return Err(SessionError::Unavailable {
                identifier: device.identifier.clone(),
                version: device.version.to_string(),
            });
        }
        let workspace = self
            .current_workspace
            .as_deref()
            .ok_or_else(|| SessionError::NoWorkspace(device.identifier.clone()))?;
        Ok((device, workspace))
    }

    /// Load a session; a missing file is an empty session
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(SessionError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        serde_json::from_str(&json).map_err(|e| SessionError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Write the session, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::AppLayout;
    use tempfile::TempDir;

    fn device(identifier: &str, version: &str) -> Device {
        Device {
            identifier: identifier.to_string(),
            name: "Test".to_string(),
            version: version.parse().unwrap(),
            is_tablet: false,
        }
    }

    fn provisioner(root: &Path) -> Provisioner {
        let template = root.join("Files");
        fs::create_dir_all(&template).unwrap();
        Provisioner::new(AppLayout::new(root), template)
    }

    #[test]
    fn test_select_supported_device() {
        let root = TempDir::new().unwrap();
        let mut session = Session::new();

        let eligibility = session
            .select_device(device("DEV-1", "16.1"), &provisioner(root.path()), &DevicePolicy::default())
            .unwrap();

        assert!(eligibility.available);
        assert!(eligibility.tested);
        assert_eq!(session.current_device_identifier(), Some("DEV-1"));
        assert_eq!(session.current_workspace(), Some(root.path().join("Workspace/DEV-1").as_path()));
        assert!(session.is_tweak_enabled(&TweakId::skip_setup()));
        assert!(session.active_target().is_ok());
    }

    #[test]
    fn test_select_untested_device() {
        let root = TempDir::new().unwrap();
        let mut session = Session::new();

        let eligibility = session
            .select_device(device("DEV-1", "17.0"), &provisioner(root.path()), &DevicePolicy::default())
            .unwrap();

        assert!(eligibility.available);
        assert!(!eligibility.tested);
        assert!(!session.device_tested());
    }

    #[test]
    fn test_select_unsupported_device() {
        let root = TempDir::new().unwrap();
        let mut session = Session::new();

        let eligibility = session
            .select_device(device("OLD", "14.8"), &provisioner(root.path()), &DevicePolicy::default())
            .unwrap();

        assert!(!eligibility.available);
        assert!(session.current_workspace().is_none());
        assert!(!root.path().join("Workspace").exists());
        assert!(session.is_tweak_enabled(&TweakId::skip_setup()));
        assert!(matches!(session.active_target(), Err(SessionError::Unavailable { .. })));
    }

    #[test]
    fn test_reset_clears_everything() {
        let root = TempDir::new().unwrap();
        let mut session = Session::new();
        session
            .select_device(device("DEV-1", "16.1"), &provisioner(root.path()), &DevicePolicy::default())
            .unwrap();
        session.set_tweak_enabled(TweakId::new("Dock").unwrap(), true);

        session.reset();

        assert!(session.current_device().is_none());
        assert!(session.current_workspace().is_none());
        assert!(session.enabled_tweaks().is_empty());
        assert!(!session.device_available());
        assert!(matches!(session.active_target(), Err(SessionError::NoDevice)));
    }

    #[test]
    fn test_load_missing_is_default() {
        let root = TempDir::new().unwrap();
        let session = Session::load(&root.path().join("session.json")).unwrap();
        assert!(session.current_device().is_none());
        assert!(session.enabled_tweaks().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("nested/session.json");
        let mut session = Session::new();
        session
            .select_device(device("DEV-1", "16.1"), &provisioner(root.path()), &DevicePolicy::default())
            .unwrap();
        session.set_tweak_enabled(TweakId::new("Dock").unwrap(), true);

        session.save(&path).unwrap();
        let loaded = Session::load(&path).unwrap();

        assert_eq!(loaded.current_device_identifier(), Some("DEV-1"));
        assert_eq!(loaded.current_workspace(), session.current_workspace());
        assert_eq!(loaded.enabled_tweaks().len(), 2);
        assert!(loaded.device_available());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(Session::load(&path), Err(SessionError::Json { .. })));
    }
}
