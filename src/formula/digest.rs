use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::InstallError;

/// A validated SHA-256 digest (64 lowercase hex characters).
///
/// Accepts input with or without a `sha256:` prefix and in either case;
/// the stored form is always bare lowercase hex so comparisons are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    pub fn new(s: impl Into<String>) -> Result<Self, InstallError> {
        let s = s.into();
        let hex = s.strip_prefix("sha256:").unwrap_or(&s);

        if hex.len() != 64 {
            return Err(InstallError::InvalidFormula(format!(
                "invalid sha256 digest: expected 64 hex characters, got {} in '{}'",
                hex.len(),
                s
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InstallError::InvalidFormula(format!(
                "invalid sha256 digest: non-hex characters in '{}'",
                s
            )));
        }

        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Digest of a byte slice.
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_of_empty_input() {
        assert_eq!(Sha256Digest::of(b"").as_str(), EMPTY_SHA256);
    }

    #[test]
    fn test_new_normalizes_prefix_and_case() {
        let upper = format!("sha256:{}", EMPTY_SHA256.to_uppercase());
        let digest = Sha256Digest::new(upper).unwrap();
        assert_eq!(digest.as_str(), EMPTY_SHA256);
        assert_eq!(digest, Sha256Digest::of(b""));
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = Sha256Digest::new("abc123").unwrap_err();
        assert!(err.to_string().contains("expected 64 hex characters"));
    }

    #[test]
    fn test_new_rejects_placeholder_text() {
        let placeholder = format!("{:_<64}", "PLACEHOLDER_ARM64_SHA256");
        let err = Sha256Digest::new(placeholder).unwrap_err();
        assert!(err.to_string().contains("non-hex"));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Sha256Digest = serde_json::from_str(&format!("\"{}\"", EMPTY_SHA256)).unwrap();
        assert_eq!(ok.as_str(), EMPTY_SHA256);

        let bad: Result<Sha256Digest, _> = serde_json::from_str("\"not-a-digest\"");
        assert!(bad.is_err());
    }
}
