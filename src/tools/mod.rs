//! External tool collaborators
//!
//! The core only needs success/failure (and a little text) from these tools:
//! - [`DeviceBridge`]: discovery and metadata queries for connected devices
//! - [`ApplyTools`]: theme rendering, backup generation and restore
//!
//! [`BundledTools`] runs the bundled binaries as subprocesses. In-process
//! doubles live in [`crate::mock`].

mod bundled;

pub use bundled::BundledTools;

use std::io;
use std::path::{Path, PathBuf};

use crate::device::{Device, HomeScreenApp};

pub const IDEVICE_ID: &str = "idevice_id";
pub const IDEVICE_NAME: &str = "idevicename";
pub const IDEVICE_INFO: &str = "ideviceinfo";
pub const IDEVICE_BACKUP: &str = "idevicebackup2";
pub const HOME_SCREEN_APPS: &str = "homeScreenApps";
pub const CREATE_BACKUP: &str = "CreateBackup.sh";
pub const THEME_TOOL: &str = "theme";

/// Process exit code when device discovery or a device query fails.
/// Kept apart from the apply stage codes.
pub const DEVICE_QUERY_EXIT_CODE: i32 = 50;

/// Tool errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("{tool} not found at {path}")]
    NotFound { tool: String, path: PathBuf },

    #[error("{tool} is not configured")]
    NotConfigured { tool: String },

    #[error("Failed to launch {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {}{}", describe_code(.code), describe_stderr(.stderr))]
    ExitStatus {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Unexpected output from {tool}: {detail}")]
    Output { tool: String, detail: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl ToolError {
    /// Name of the tool that failed
    pub fn tool(&self) -> &str {
        match self {
            ToolError::NotFound { tool, .. }
            | ToolError::NotConfigured { tool }
            | ToolError::Spawn { tool, .. }
            | ToolError::ExitStatus { tool, .. }
            | ToolError::Output { tool, .. } => tool,
        }
    }
}

/// Device discovery and metadata
pub trait DeviceBridge {
    /// Connected devices; an empty list when none are reachable
    fn list_devices(&self) -> Result<Vec<Device>, ToolError>;

    /// Apps on the device home screen
    fn home_screen_apps(&self, device_identifier: &str) -> Result<Vec<HomeScreenApp>, ToolError>;

    /// Number of home screen pages
    fn home_screen_pages(&self, device_identifier: &str) -> Result<u32, ToolError>;
}

/// Collaborators invoked by the apply pipeline.
///
/// Directory arguments are names relative to `data_root`, which is also the
/// working directory of the tools.
pub trait ApplyTools {
    /// Render theme assets into `destination`
    fn render_theme(&self, destination: &Path) -> Result<(), ToolError>;

    /// Package `staging` into a backup under `backup`
    fn generate_backup(&self, data_root: &Path, staging: &str, backup: &str) -> Result<(), ToolError>;

    /// Restore the backup under `backup` onto the device
    fn restore(&self, data_root: &Path, device_identifier: &str, backup: &str) -> Result<(), ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_display() {
        let err = ToolError::ExitStatus {
            tool: IDEVICE_BACKUP.to_string(),
            code: Some(2),
            stderr: "No device found\n".to_string(),
        };
        assert_eq!(err.to_string(), "idevicebackup2 exited with status 2: No device found");
        assert_eq!(err.tool(), IDEVICE_BACKUP);

        let err = ToolError::ExitStatus {
            tool: CREATE_BACKUP.to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "CreateBackup.sh exited with a signal");
    }
}
