//! Dotted numeric version comparison.
//!
//! Missing trailing components compare as zero, so `16` == `16.0` and
//! `15.10` > `15.9`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Errors for version parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid version format: {0}")]
    Invalid(String),
}

/// A device OS version such as `16.4.1`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceVersion {
    components: Vec<u32>,
}

impl DeviceVersion {
    pub fn new(components: Vec<u32>) -> Result<Self, VersionError> {
        if components.is_empty() {
            return Err(VersionError::Empty);
        }
        Ok(Self { components })
    }

    pub fn major(&self) -> u32 {
        self.components[0]
    }

    pub fn components(&self) -> &[u32] {
        &self.components
    }

    fn component(&self, index: usize) -> u32 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for DeviceVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = trimmed
            .split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError::Invalid(trimmed.to_string()))?;

        Self::new(components)
    }
}

impl TryFrom<String> for DeviceVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceVersion> for String {
    fn from(version: DeviceVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for DeviceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.components.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl Ord for DeviceVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for DeviceVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DeviceVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DeviceVersion {}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DeviceVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(v("16.4.1").components(), &[16, 4, 1]);
        assert_eq!(v(" 17.0\n").major(), 17);
        assert_eq!(v("16.6").to_string(), "16.6");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<DeviceVersion>(), Err(VersionError::Empty));
        assert!(matches!("16..1".parse::<DeviceVersion>(), Err(VersionError::Invalid(_))));
        assert!(matches!("16.a".parse::<DeviceVersion>(), Err(VersionError::Invalid(_))));
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert!(v("15.10") > v("15.9"));
        assert!(v("9.3") < v("10.0"));
    }

    #[test]
    fn test_trailing_zero_equal() {
        assert_eq!(v("16"), v("16.0"));
        assert_eq!(v("16.0.0"), v("16"));
        assert!(v("16.0.1") > v("16"));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("16.4.1")).unwrap();
        assert_eq!(json, "\"16.4.1\"");
        let back: DeviceVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("16.4.1"));
    }
}
