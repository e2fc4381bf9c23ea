//! Recording tool doubles.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use walkdir::WalkDir;

use super::failure::{FailureConfig, FailureInjector, ToolOp};
use crate::device::{Device, HomeScreenApp};
use crate::tools::{ApplyTools, DeviceBridge, ToolError, THEME_TOOL};

/// A call observed by [`RecordingTools`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ListDevices,
    HomeScreenApps { device: String },
    HomeScreenPages { device: String },
    RenderTheme { destination: PathBuf },
    /// `staging_files` lists the staging tree (relative paths) at call time
    GenerateBackup {
        staging: String,
        backup: String,
        staging_files: Vec<PathBuf>,
    },
    Restore { device: String, backup: String },
}

/// In-process collaborator that records every call and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingTools {
    devices: Vec<Device>,
    apps: Vec<HomeScreenApp>,
    pages: u32,
    theme_files: Vec<(PathBuf, String)>,
    calls: Mutex<Vec<ToolCall>>,
    failures: Mutex<FailureInjector>,
}

impl RecordingTools {
    pub fn new() -> Self {
        Self {
            pages: 1,
            ..Self::default()
        }
    }

    pub fn with_devices(mut self, devices: Vec<Device>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_apps(mut self, apps: Vec<HomeScreenApp>, pages: u32) -> Self {
        self.apps = apps;
        self.pages = pages;
        self
    }

    /// File written (relative to the destination) when a theme is rendered
    pub fn with_theme_file(mut self, rel: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.theme_files.push((rel.into(), contents.into()));
        self
    }

    /// Make an operation fail
    pub fn fail(self, op: ToolOp, config: FailureConfig) -> Self {
        lock(&self.failures).inject(op, config);
        self
    }

    /// Calls seen so far, in order
    pub fn calls(&self) -> Vec<ToolCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, op: ToolOp, call: ToolCall) -> Result<(), ToolError> {
        lock(&self.calls).push(call);
        match lock(&self.failures).check(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn list_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect()
}

impl DeviceBridge for RecordingTools {
    fn list_devices(&self) -> Result<Vec<Device>, ToolError> {
        self.record(ToolOp::ListDevices, ToolCall::ListDevices)?;
        Ok(self.devices.clone())
    }

    fn home_screen_apps(&self, device_identifier: &str) -> Result<Vec<HomeScreenApp>, ToolError> {
        self.record(
            ToolOp::HomeScreenApps,
            ToolCall::HomeScreenApps {
                device: device_identifier.to_string(),
            },
        )?;
        Ok(self.apps.clone())
    }

    fn home_screen_pages(&self, device_identifier: &str) -> Result<u32, ToolError> {
        self.record(
            ToolOp::HomeScreenPages,
            ToolCall::HomeScreenPages {
                device: device_identifier.to_string(),
            },
        )?;
        Ok(self.pages)
    }
}

impl ApplyTools for RecordingTools {
    fn render_theme(&self, destination: &Path) -> Result<(), ToolError> {
        self.record(
            ToolOp::RenderTheme,
            ToolCall::RenderTheme {
                destination: destination.to_path_buf(),
            },
        )?;

        for (rel, contents) in &self.theme_files {
            let path = destination.join(rel);
            let written = path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::write(&path, contents));
            written.map_err(|e| ToolError::Spawn {
                tool: THEME_TOOL.to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn generate_backup(&self, data_root: &Path, staging: &str, backup: &str) -> Result<(), ToolError> {
        self.record(
            ToolOp::GenerateBackup,
            ToolCall::GenerateBackup {
                staging: staging.to_string(),
                backup: backup.to_string(),
                staging_files: list_files(&data_root.join(staging)),
            },
        )
    }

    fn restore(&self, _data_root: &Path, device_identifier: &str, backup: &str) -> Result<(), ToolError> {
        self.record(
            ToolOp::Restore,
            ToolCall::Restore {
                device: device_identifier.to_string(),
                backup: backup.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_records_calls_in_order() {
        let tools = RecordingTools::new();
        let root = TempDir::new().unwrap();

        tools.generate_backup(root.path(), "EnabledTweaks", "Backup").unwrap();
        tools.restore(root.path(), "DEV", "Backup").unwrap();

        let calls = tools.calls();
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], ToolCall::GenerateBackup { ref staging_files, .. } if staging_files.is_empty()));
        assert_eq!(
            calls[1],
            ToolCall::Restore {
                device: "DEV".to_string(),
                backup: "Backup".to_string()
            }
        );
    }

    #[test]
    fn test_injected_failure_still_recorded() {
        let tools = RecordingTools::new().fail(ToolOp::Restore, FailureConfig::exit(4, "locked"));
        let root = TempDir::new().unwrap();

        let err = tools.restore(root.path(), "DEV", "Backup").unwrap_err();
        assert!(matches!(err, ToolError::ExitStatus { code: Some(4), .. }));
        assert_eq!(tools.calls().len(), 1);
    }

    #[test]
    fn test_render_theme_writes_files() {
        let tools = RecordingTools::new().with_theme_file("Icons/app.png", "png");
        let root = TempDir::new().unwrap();
        let destination = root.path().join("Themes");

        tools.render_theme(&destination).unwrap();

        assert_eq!(fs::read_to_string(destination.join("Icons/app.png")).unwrap(), "png");
    }
}
