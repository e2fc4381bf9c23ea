//! Failure injection for mock tools
//!
//! Supports configurable failures for testing pipeline error paths.

use std::collections::HashMap;

use crate::tools::ToolError;

/// Tool operations that can be failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolOp {
    ListDevices,
    HomeScreenApps,
    HomeScreenPages,
    RenderTheme,
    GenerateBackup,
    Restore,
}

impl ToolOp {
    /// Name of the bundled tool behind this operation
    pub fn tool_name(&self) -> &'static str {
        use crate::tools::*;
        match self {
            ToolOp::ListDevices => IDEVICE_ID,
            ToolOp::HomeScreenApps | ToolOp::HomeScreenPages => HOME_SCREEN_APPS,
            ToolOp::RenderTheme => THEME_TOOL,
            ToolOp::GenerateBackup => CREATE_BACKUP,
            ToolOp::Restore => IDEVICE_BACKUP,
        }
    }
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Exit code reported by the failing tool
    pub exit_code: Option<i32>,
    /// Stderr reported by the failing tool
    pub stderr: String,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Fail with the given exit code and stderr
    pub fn exit(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            stderr: stderr.into(),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    pub(crate) fn to_error(&self, op: ToolOp) -> ToolError {
        ToolError::ExitStatus {
            tool: op.tool_name().to_string(),
            code: self.exit_code,
            stderr: self.stderr.clone(),
        }
    }
}

/// Failure injector for the mock tools
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<ToolOp, FailureConfig>,
    call_counts: HashMap<ToolOp, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for an operation
    pub fn inject(&mut self, op: ToolOp, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// The error to return for this call, if the operation should fail
    pub fn check(&mut self, op: ToolOp) -> Option<ToolError> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if let Some(fail_limit) = config.fail_count {
            if *count > fail_limit {
                return None;
            }
        }

        Some(config.to_error(op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_injection() {
        let mut injector = FailureInjector::new();
        assert!(injector.check(ToolOp::Restore).is_none());
    }

    #[test]
    fn test_always_fail() {
        let mut injector = FailureInjector::new();
        injector.inject(ToolOp::GenerateBackup, FailureConfig::exit(1, "boom"));

        for _ in 0..3 {
            let err = injector.check(ToolOp::GenerateBackup).unwrap();
            assert_eq!(err.tool(), "CreateBackup.sh");
        }
        assert!(injector.check(ToolOp::Restore).is_none());
    }

    #[test]
    fn test_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(ToolOp::Restore, FailureConfig::exit(2, "").with_fail_count(1));

        assert!(injector.check(ToolOp::Restore).is_some());
        assert!(injector.check(ToolOp::Restore).is_none());
    }

    #[test]
    fn test_clear() {
        let mut injector = FailureInjector::new();
        injector.inject(ToolOp::RenderTheme, FailureConfig::exit(1, ""));
        injector.clear();
        assert!(injector.check(ToolOp::RenderTheme).is_none());
    }
}
