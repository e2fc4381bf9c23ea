//! Effective settings with provenance
//!
//! Layers are converted to JSON, deep-merged, then deserialized into
//! [`Settings`]. The contributing sources are kept for `config` output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tweakstage_merge::MergeOptions;

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;
use crate::device::{DevicePolicy, DeviceVersion};
use crate::layout::AppLayout;

/// Errors for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// External tool locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Directory holding the bundled binaries and scripts
    /// (default: `<data_root>/bin`)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Command that renders theme assets into a directory
    #[serde(default)]
    pub theme_command: Option<PathBuf>,
}

/// Merge engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeSettings {
    /// Extra exclusion globs on top of the built-in ones
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Device eligibility settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub minimum_major: u32,
    pub last_tested_version: String,
}

/// Fully merged settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_root: PathBuf,

    /// Template tree (default: `<data_root>/Files`)
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub merge: MergeSettings,

    pub devices: DeviceSettings,

    /// Contributing sources in precedence order
    #[serde(default, skip_deserializing)]
    pub sources: Vec<ConfigSource>,
}

impl Settings {
    /// Build settings from the builtin defaults, an optional user config
    /// file and CLI overrides. A missing user file is not an error.
    pub fn load(user_config_path: Option<&Path>, cli_overrides: Option<Value>) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        if let Some(path) = user_config_path {
            if path.exists() {
                let (value, digest) = load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::User,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let mut settings: Settings =
            serde_json::from_value(merged).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        settings.sources = sources;
        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("data_root must not be empty".to_string()));
        }
        self.last_tested_version()?;
        Ok(())
    }

    /// Directory layout rooted at `data_root`
    pub fn layout(&self) -> AppLayout {
        AppLayout::new(self.data_root.clone())
    }

    /// Template tree location
    pub fn template_dir(&self) -> PathBuf {
        self.template_dir
            .clone()
            .unwrap_or_else(|| self.layout().default_template_dir())
    }

    /// Directory the bundled tools live in
    pub fn tools_dir(&self) -> PathBuf {
        self.tools
            .dir
            .clone()
            .unwrap_or_else(|| self.data_root.join("bin"))
    }

    /// Parsed `devices.last_tested_version`
    pub fn last_tested_version(&self) -> Result<DeviceVersion, ConfigError> {
        self.devices
            .last_tested_version
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("devices.last_tested_version: {}", e)))
    }

    /// Eligibility thresholds from the `devices` table
    pub fn device_policy(&self) -> Result<DevicePolicy, ConfigError> {
        Ok(DevicePolicy {
            minimum_major: self.devices.minimum_major,
            last_tested: self.last_tested_version()?,
        })
    }

    /// Merge options with the builtin excludes plus `merge.exclude`
    pub fn merge_options(&self) -> Result<MergeOptions, ConfigError> {
        MergeOptions::new()
            .with_excludes(&self.merge.exclude)
            .map_err(|e| ConfigError::Invalid(format!("merge.exclude: {}", e)))
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("Invalid UTF-8: {}", e),
    })?;

    let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok((toml_to_json(toml_value), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_only() {
        let settings = Settings::load(None, None).unwrap();

        assert_eq!(settings.devices.minimum_major, 15);
        assert_eq!(settings.sources.len(), 1);
        assert_eq!(settings.sources[0].origin, ConfigOrigin::Builtin);
        assert_eq!(settings.template_dir(), settings.data_root.join("Files"));
        assert_eq!(settings.tools_dir(), settings.data_root.join("bin"));
    }

    #[test]
    fn test_user_file_and_cli_precedence() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
data_root = "/from/user"

[devices]
last_tested_version = "17.1"

[merge]
exclude = ["*.bak"]
"#
        )
        .unwrap();

        let settings = Settings::load(
            Some(file.path()),
            Some(json!({"data_root": "/from/cli"})),
        )
        .unwrap();

        assert_eq!(settings.data_root, PathBuf::from("/from/cli"));
        assert_eq!(settings.devices.last_tested_version, "17.1");
        assert_eq!(settings.devices.minimum_major, 15);
        assert_eq!(settings.merge.exclude, vec!["*.bak".to_string()]);
        assert_eq!(settings.sources.len(), 3);
        assert_eq!(settings.sources[1].origin, ConfigOrigin::User);
        assert_eq!(settings.sources[1].digest.as_ref().unwrap().len(), 64);
    }

    #[test]
    fn test_missing_user_file_ignored() {
        let settings = Settings::load(Some(Path::new("/nonexistent/config.toml")), None).unwrap();
        assert_eq!(settings.sources.len(), 1);
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_root = ").unwrap();

        let err = Settings::load(Some(file.path()), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_last_tested_version() {
        let err = Settings::load(None, Some(json!({"devices": {"last_tested_version": "sixteen"}})))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_explicit_template_and_tools_dir() {
        let settings = Settings::load(
            None,
            Some(json!({
                "template_dir": "/bundle/Files",
                "tools": {"dir": "/bundle/bin", "theme_command": "/bundle/bin/theme"}
            })),
        )
        .unwrap();

        assert_eq!(settings.template_dir(), PathBuf::from("/bundle/Files"));
        assert_eq!(settings.tools_dir(), PathBuf::from("/bundle/bin"));
        assert_eq!(settings.tools.theme_command, Some(PathBuf::from("/bundle/bin/theme")));
    }
}
