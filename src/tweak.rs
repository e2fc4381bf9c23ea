//! Tweak identifiers and the enabled set.
//!
//! A tweak tag names a subdirectory of the device workspace (and of the
//! template tree). The enabled set iterates in sorted tag order.

use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Tag of the tweak enabled for every selected device
pub const SKIP_SETUP: &str = "SkipSetup";

/// Tag whose overlay content is rendered by the theming tool before composition
pub const THEMES: &str = "Themes";

/// Tags shipped in the template tree
pub const KNOWN_TWEAKS: &[&str] = &[
    SKIP_SETUP,
    THEMES,
    "StatusBar",
    "SpringboardOptions",
    "ControlCenter",
    "InternalOptions",
];

/// Errors for tweak tags
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TweakIdError {
    #[error("Tweak tag is empty")]
    Empty,

    #[error("Tweak tag '{0}' is not a single path component")]
    NotAComponent(String),
}

/// Stable string tag of a tweak
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TweakId(String);

impl TweakId {
    pub fn new(tag: impl Into<String>) -> Result<Self, TweakIdError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(TweakIdError::Empty);
        }
        if tag == "." || tag == ".." || tag.contains(['/', '\\']) {
            return Err(TweakIdError::NotAComponent(tag));
        }
        Ok(Self(tag))
    }

    pub fn skip_setup() -> Self {
        Self(SKIP_SETUP.to_string())
    }

    pub fn themes() -> Self {
        Self(THEMES.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag is one the template tree ships
    pub fn is_known(&self) -> bool {
        KNOWN_TWEAKS.contains(&self.0.as_str())
    }
}

impl fmt::Display for TweakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TweakId {
    type Err = TweakIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TweakId {
    type Error = TweakIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TweakId> for String {
    fn from(id: TweakId) -> Self {
        id.0
    }
}

/// Set of enabled tweaks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TweakSet(BTreeSet<TweakId>);

impl TweakSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the tweak was not already enabled
    pub fn insert(&mut self, tweak: TweakId) -> bool {
        self.0.insert(tweak)
    }

    /// Returns true if the tweak was enabled
    pub fn remove(&mut self, tweak: &TweakId) -> bool {
        self.0.remove(tweak)
    }

    pub fn set_enabled(&mut self, tweak: TweakId, enabled: bool) {
        if enabled {
            self.0.insert(tweak);
        } else {
            self.0.remove(&tweak);
        }
    }

    pub fn contains(&self, tweak: &TweakId) -> bool {
        self.0.contains(tweak)
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t.as_str() == tag)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, TweakId> {
        self.0.iter()
    }
}

impl FromIterator<TweakId> for TweakSet {
    fn from_iter<I: IntoIterator<Item = TweakId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TweakSet {
    type Item = &'a TweakId;
    type IntoIter = btree_set::Iter<'a, TweakId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tags() {
        assert_eq!(TweakId::new("StatusBar").unwrap().as_str(), "StatusBar");
        assert!(TweakId::skip_setup().is_known());
        assert!(!TweakId::new("Custom").unwrap().is_known());
    }

    #[test]
    fn test_invalid_tags() {
        assert_eq!(TweakId::new(""), Err(TweakIdError::Empty));
        assert!(matches!(TweakId::new(".."), Err(TweakIdError::NotAComponent(_))));
        assert!(matches!(TweakId::new("a/b"), Err(TweakIdError::NotAComponent(_))));
    }

    #[test]
    fn test_set_has_no_duplicates_and_sorted_order() {
        let mut set = TweakSet::new();
        assert!(set.insert(TweakId::new("Themes").unwrap()));
        assert!(set.insert(TweakId::new("ControlCenter").unwrap()));
        assert!(!set.insert(TweakId::new("Themes").unwrap()));

        let order: Vec<&str> = set.iter().map(TweakId::as_str).collect();
        assert_eq!(order, vec!["ControlCenter", "Themes"]);
    }

    #[test]
    fn test_set_enabled_toggle() {
        let mut set = TweakSet::new();
        let tweak = TweakId::new("StatusBar").unwrap();

        set.set_enabled(tweak.clone(), true);
        assert!(set.contains(&tweak));
        assert!(set.contains_tag("StatusBar"));

        set.set_enabled(tweak.clone(), false);
        assert!(set.is_empty());
    }

    #[test]
    fn test_serde_roundtrip_rejects_bad_tag() {
        let set: TweakSet = serde_json::from_str(r#"["SkipSetup","Themes"]"#).unwrap();
        assert_eq!(set.len(), 2);

        let bad: Result<TweakSet, _> = serde_json::from_str(r#"["../escape"]"#);
        assert!(bad.is_err());
    }
}
