//! Release versions for the formula table.
//!
//! A thin wrapper over [`semver::Version`] that accepts the leading `v` used
//! in release tags (`v0.4.0`). Ordering and equality follow semver
//! precedence, so build metadata never makes one row newer than another.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::InstallError;

#[derive(Debug, Clone)]
pub struct Version(semver::Version);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    pub fn semver(&self) -> &semver::Version {
        &self.0
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// Release tag as used in download URLs, e.g. `v0.4.0`.
    pub fn tag(&self) -> String {
        format!("v{}", self)
    }

    /// Whether a user-supplied string (`0.4.0` or `v0.4.0`) names this version.
    pub fn matches(&self, requested: &str) -> bool {
        requested
            .parse::<Version>()
            .is_ok_and(|v| &v == self)
    }
}

impl FromStr for Version {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('v').unwrap_or(trimmed);
        semver::Version::parse(body)
            .map(Self)
            .map_err(|e| InstallError::InvalidFormula(format!("invalid version '{}': {}", s, e)))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_plain_and_tagged() {
        assert_eq!(v("0.4.0"), Version::new(0, 4, 0));
        assert_eq!(v("v0.4.0"), Version::new(0, 4, 0));
        assert!(!v("0.4.0").is_prerelease());
    }

    #[test]
    fn test_parse_prerelease() {
        let version = v("1.0.0-rc.1");
        assert!(version.is_prerelease());
        assert_eq!(version.to_string(), "1.0.0-rc.1");
        assert_eq!(version.tag(), "v1.0.0-rc.1");
    }

    #[test]
    fn test_parse_build_metadata() {
        let version = v("1.0.0+build.5");
        assert_eq!(version.semver().build.as_str(), "build.5");
        assert_eq!(version.to_string(), "1.0.0+build.5");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "1", "1.2", "1.2.3.4", "a.b.c", "1..3", "1.2.3-"] {
            assert!(bad.parse::<Version>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_ordering() {
        assert!(v("0.1.0") < v("0.4.0"));
        assert!(v("0.4.0") < v("0.10.0"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
    }

    #[test]
    fn test_prerelease_identifiers_compare_numerically() {
        assert!(v("1.0.0-alpha.2") < v("1.0.0-alpha.10"));
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
    }

    #[test]
    fn test_build_metadata_does_not_change_precedence() {
        assert_eq!(v("1.0.0+build.5"), v("1.0.0+build.6"));
        assert_eq!(v("1.0.0+build.5").cmp(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_matches_with_v_prefix() {
        let version = Version::new(0, 4, 0);
        assert!(version.matches("0.4.0"));
        assert!(version.matches("v0.4.0"));
        assert!(!version.matches("0.4.1"));
        assert!(!version.matches("latest"));
    }
}
