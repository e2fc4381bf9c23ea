//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application directory name under the platform data/config dirs
pub const APP_DIR: &str = "tweakstage";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Persistent application-data root
    pub data_root: PathBuf,

    /// Oldest supported major version (default: 15)
    pub minimum_major: u32,

    /// Newest version the tweaks were verified against (default: "16.6")
    pub last_tested_version: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            minimum_major: 15,
            last_tested_version: "16.6".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "data_root": self.data_root.to_string_lossy(),
            "tools": {},
            "merge": {
                "exclude": []
            },
            "devices": {
                "minimum_major": self.minimum_major,
                "last_tested_version": self.last_tested_version
            }
        })
    }
}

/// `<platform data dir>/tweakstage`, or `./tweakstage` when the platform has none
pub fn default_data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `<platform config dir>/tweakstage/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}
