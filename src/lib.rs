//! Tweakstage - per-device tweak staging and restore
//!
//! This crate keeps a workspace of tweak overlays per connected device,
//! seeds it from a template tree, composes the enabled overlays into a
//! staging tree with a newest-wins merge, and drives the external tools that
//! package staging into a backup and restore it onto the device.

pub mod apply;
pub mod compose;
pub mod config;
pub mod device;
pub mod layout;
pub mod logging;
pub mod mock;
pub mod session;
pub mod tools;
pub mod tweak;
pub mod workspace;

pub use apply::{ApplyError, ApplyPipeline, ApplyStage, ApplyStatus, ApplySummary};
pub use compose::{compose_overlays, reset_directory, ComposeError, ComposeReport};
pub use config::{ConfigError, Settings};
pub use device::{Device, DevicePolicy, DeviceVersion};
pub use layout::AppLayout;
pub use session::{Session, SessionError};
pub use tools::{ApplyTools, BundledTools, DeviceBridge, ToolError};
pub use tweak::{TweakId, TweakSet};
pub use workspace::{ProvisionError, Provisioner};

pub use tweakstage_merge::{merge, merge_with, MergeError, MergeOptions, MergeReport};
