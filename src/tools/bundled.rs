//! Subprocess-backed collaborators using the bundled binaries.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, warn};

use super::{
    ApplyTools, DeviceBridge, ToolError, CREATE_BACKUP, HOME_SCREEN_APPS, IDEVICE_BACKUP,
    IDEVICE_ID, IDEVICE_INFO, IDEVICE_NAME, THEME_TOOL,
};
use crate::device::{
    parse_device_ids, parse_home_screen_apps, parse_page_count, Device, DeviceVersion,
    HomeScreenApp, PHONE_PRODUCT_NAME,
};

/// Runs the tools found in a single directory
#[derive(Debug, Clone)]
pub struct BundledTools {
    /// Directory holding the binaries and scripts
    dir: PathBuf,
    /// Working directory for discovery and metadata queries
    working_dir: PathBuf,
    theme_command: Option<PathBuf>,
}

impl BundledTools {
    pub fn new(dir: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            dir,
            working_dir,
            theme_command: None,
        }
    }

    pub fn with_theme_command(mut self, command: Option<PathBuf>) -> Self {
        self.theme_command = command;
        self
    }

    fn tool_path(&self, tool: &str) -> Result<PathBuf, ToolError> {
        let path = self.dir.join(tool);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ToolError::NotFound {
                tool: tool.to_string(),
                path,
            })
        }
    }

    fn output(&self, tool: &str, mut command: Command, cwd: &Path) -> Result<Output, ToolError> {
        debug!(tool, ?command, cwd = %cwd.display(), "running tool");
        command
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ToolError::Spawn {
                tool: tool.to_string(),
                source: e,
            })
    }

    /// Run a tool and require a zero exit status
    fn run(&self, tool: &str, command: Command, cwd: &Path) -> Result<String, ToolError> {
        let output = self.output(tool, command, cwd)?;
        if !output.status.success() {
            return Err(ToolError::ExitStatus {
                tool: tool.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn query(&self, tool: &str, args: &[&str]) -> Result<String, ToolError> {
        let mut command = Command::new(self.tool_path(tool)?);
        command.args(args);
        let stdout = self.run(tool, command, &self.working_dir)?;
        Ok(stdout.replace('\n', ""))
    }
}

impl DeviceBridge for BundledTools {
    fn list_devices(&self) -> Result<Vec<Device>, ToolError> {
        let mut command = Command::new(self.tool_path(IDEVICE_ID)?);
        command.arg("-l");
        // A failing listing reports its problem as text; no devices then.
        let output = self.output(IDEVICE_ID, command, &self.working_dir)?;
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !output.status.success() {
            warn!(status = ?output.status.code(), "device listing failed");
            return Ok(Vec::new());
        }

        let mut devices = Vec::new();
        for identifier in parse_device_ids(&text) {
            let name = self.query(IDEVICE_NAME, &["-u", &identifier])?;
            let raw_version = self.query(IDEVICE_INFO, &["-u", &identifier, "-k", "ProductVersion"])?;
            let version: DeviceVersion = raw_version.parse().map_err(|e| ToolError::Output {
                tool: IDEVICE_INFO.to_string(),
                detail: format!("ProductVersion for {}: {}", identifier, e),
            })?;
            let product = self.query(IDEVICE_INFO, &["-u", &identifier, "-k", "ProductName"])?;

            devices.push(Device {
                identifier,
                name,
                version,
                is_tablet: product != PHONE_PRODUCT_NAME,
            });
        }

        Ok(devices)
    }

    fn home_screen_apps(&self, device_identifier: &str) -> Result<Vec<HomeScreenApp>, ToolError> {
        let mut command = Command::new(self.tool_path(HOME_SCREEN_APPS)?);
        command.args(["-u", device_identifier]);
        let stdout = self.run(HOME_SCREEN_APPS, command, &self.working_dir)?;
        Ok(parse_home_screen_apps(&stdout))
    }

    fn home_screen_pages(&self, device_identifier: &str) -> Result<u32, ToolError> {
        let stdout = self.query(HOME_SCREEN_APPS, &["-u", device_identifier, "-n"])?;
        Ok(parse_page_count(&stdout))
    }
}

impl ApplyTools for BundledTools {
    fn render_theme(&self, destination: &Path) -> Result<(), ToolError> {
        let Some(program) = self.theme_command.as_ref() else {
            warn!(destination = %destination.display(), "no theme command configured, nothing to render");
            return Ok(());
        };
        let mut command = Command::new(program);
        command.arg(destination);
        self.run(THEME_TOOL, command, &self.working_dir)?;
        Ok(())
    }

    fn generate_backup(&self, data_root: &Path, staging: &str, backup: &str) -> Result<(), ToolError> {
        let script = self.tool_path(CREATE_BACKUP)?;
        let mut command = Command::new("sh");
        command.arg(script).args([staging, backup]);
        self.run(CREATE_BACKUP, command, data_root)?;
        Ok(())
    }

    fn restore(&self, data_root: &Path, device_identifier: &str, backup: &str) -> Result<(), ToolError> {
        let mut command = Command::new(self.tool_path(IDEVICE_BACKUP)?);
        command.args([
            "-u",
            device_identifier,
            "-s",
            backup,
            "restore",
            "--system",
            "--skip-apps",
            ".",
        ]);
        self.run(IDEVICE_BACKUP, command, data_root)?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn install(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_missing_tool() {
        let dir = TempDir::new().unwrap();
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf());

        let err = tools.list_devices().unwrap_err();
        assert!(matches!(err, ToolError::NotFound { ref tool, .. } if tool == IDEVICE_ID));
    }

    #[test]
    fn test_list_devices() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), IDEVICE_ID, "echo AAAA-1111");
        install(dir.path(), IDEVICE_NAME, "echo 'Test Phone'");
        install(
            dir.path(),
            IDEVICE_INFO,
            r#"case "$4" in ProductVersion) echo 16.4.1 ;; ProductName) echo 'iPhone OS' ;; esac"#,
        );
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf());

        let devices = tools.list_devices().unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].identifier, "AAAA-1111");
        assert_eq!(devices[0].name, "Test Phone");
        assert_eq!(devices[0].version.to_string(), "16.4.1");
        assert!(!devices[0].is_tablet);
    }

    #[test]
    fn test_list_devices_error_output() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), IDEVICE_ID, "echo 'ERROR: Unable to retrieve device list!'");
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf());

        assert!(tools.list_devices().unwrap().is_empty());
    }

    #[test]
    fn test_generate_backup_runs_in_data_root() {
        let dir = TempDir::new().unwrap();
        let data_root = TempDir::new().unwrap();
        install(dir.path(), CREATE_BACKUP, r#"echo "$1 $2" > invoked.txt"#);
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf());

        tools.generate_backup(data_root.path(), "EnabledTweaks", "Backup").unwrap();

        let invoked = fs::read_to_string(data_root.path().join("invoked.txt")).unwrap();
        assert_eq!(invoked.trim(), "EnabledTweaks Backup");
    }

    #[test]
    fn test_restore_failure_reports_status() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), IDEVICE_BACKUP, "echo 'device locked' >&2; exit 3");
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf());

        let err = tools.restore(dir.path(), "AAAA-1111", "Backup").unwrap_err();
        match err {
            ToolError::ExitStatus { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("device locked"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unconfigured_theme_renders_nothing() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("Themes");
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf());

        tools.render_theme(&destination).unwrap();
        assert!(!destination.exists());
    }

    #[test]
    fn test_configured_theme_command_runs() {
        let dir = TempDir::new().unwrap();
        install(dir.path(), "render.sh", "mkdir -p \"$1\" && echo icon > \"$1/app.png\"");
        let destination = dir.path().join("Themes");
        let tools = BundledTools::new(dir.path().to_path_buf(), dir.path().to_path_buf())
            .with_theme_command(Some(dir.path().join("render.sh")));

        tools.render_theme(&destination).unwrap();
        assert_eq!(fs::read_to_string(destination.join("app.png")).unwrap(), "icon\n");
    }
}
