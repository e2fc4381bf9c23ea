//! Mock Tool Implementation
//!
//! In-process stand-ins for the external device tools, used by the pipeline
//! and session tests.
//!
//! - [`RecordingTools`]: implements [`crate::tools::DeviceBridge`] and
//!   [`crate::tools::ApplyTools`], records every call in order
//! - [`FailureInjector`]: per-operation failures, optionally for the first
//!   N calls only

mod failure;
mod tools;

pub use failure::{FailureConfig, FailureInjector, ToolOp};
pub use tools::{RecordingTools, ToolCall};
