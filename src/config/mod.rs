//! Layered configuration
//!
//! 1. Built-in defaults
//! 2. User config (`<config dir>/tweakstage/config.toml`)
//! 3. CLI flags

mod defaults;
mod merge;
mod settings;

pub use defaults::{default_config_path, default_data_root, BuiltinDefaults, APP_DIR};
pub use merge::{deep_merge, merge_layers};
pub use settings::{ConfigError, ConfigOrigin, ConfigSource, DeviceSettings, MergeSettings, Settings, ToolSettings};
