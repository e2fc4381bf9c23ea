//! Connected devices
//!
//! Devices are supplied by the discovery tools and never change once
//! discovered. The core uses the identifier for workspace paths and restore
//! addressing, and the version for eligibility.

mod discovery;
mod version;

pub use discovery::{parse_device_ids, parse_home_screen_apps, parse_page_count, HomeScreenApp, PHONE_PRODUCT_NAME};
pub use version::{DeviceVersion, VersionError};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Errors for device identifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("Invalid device identifier '{0}'")]
    InvalidIdentifier(String),
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("identifier pattern is valid"))
}

/// Check that an identifier can be used as a single path component
pub fn validate_identifier(identifier: &str) -> Result<(), DeviceError> {
    if identifier_pattern().is_match(identifier) {
        Ok(())
    } else {
        Err(DeviceError::InvalidIdentifier(identifier.to_string()))
    }
}

/// A discovered device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque device handle (UDID)
    pub identifier: String,
    pub name: String,
    pub version: DeviceVersion,
    /// Anything other than a phone
    pub is_tablet: bool,
}

/// Eligibility thresholds for selected devices
#[derive(Debug, Clone)]
pub struct DevicePolicy {
    /// Devices below this major version are unavailable
    pub minimum_major: u32,
    /// Devices strictly below this version are considered tested
    pub last_tested: DeviceVersion,
}

impl Default for DevicePolicy {
    fn default() -> Self {
        Self {
            minimum_major: 15,
            last_tested: DeviceVersion::new(vec![16, 6]).expect("non-empty components"),
        }
    }
}

/// Result of checking a device against a [`DevicePolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eligibility {
    pub available: bool,
    pub tested: bool,
}

impl DevicePolicy {
    pub fn check(&self, version: &DeviceVersion) -> Eligibility {
        if version.major() < self.minimum_major {
            return Eligibility {
                available: false,
                tested: false,
            };
        }
        Eligibility {
            available: true,
            tested: self.last_tested > *version,
        }
    }
}
