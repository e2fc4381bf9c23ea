//! Exclusion rules for merge sources
//!
//! Paths are matched relative to the merge source root.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Patterns skipped unless the caller opts out.
///
/// `.*` only anchors at the source root, so hidden top-level entries (and
/// everything beneath them) are skipped while nested dotfiles are kept.
pub const DEFAULT_EXCLUDES: &[&str] = &[".*", "**/.DS_Store"];

/// Errors for exclusion rules
#[derive(Debug, thiserror::Error)]
pub enum ExcludeError {
    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Exclusion rules for filtering merge entries
#[derive(Debug, Clone)]
pub struct ExcludeRules {
    patterns: Vec<String>,
    glob_set: GlobSet,
}

impl Default for ExcludeRules {
    fn default() -> Self {
        Self::new().expect("built-in exclude patterns are valid globs")
    }
}

impl ExcludeRules {
    /// Create exclusion rules with the built-in defaults
    pub fn new() -> Result<Self, ExcludeError> {
        Self::from_patterns(DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect())
    }

    /// Rules that exclude nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            glob_set: GlobSet::empty(),
        }
    }

    fn from_patterns(patterns: Vec<String>) -> Result<Self, ExcludeError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            patterns,
            glob_set: builder.build()?,
        })
    }

    /// Add additional patterns on top of the current ones
    pub fn with_patterns<S: AsRef<str>>(self, extra: &[S]) -> Result<Self, ExcludeError> {
        let mut patterns = self.patterns;
        patterns.extend(
            extra
                .iter()
                .map(|p| p.as_ref().trim())
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        );
        Self::from_patterns(patterns)
    }

    /// Patterns currently in effect
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check if a source-relative path should be excluded
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        self.glob_set.is_match(path_str.as_ref())
    }
}
