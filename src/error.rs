//! Error kinds surfaced by the install pipeline.
//!
//! Every stage is terminal on failure, so these are reported to the caller
//! as-is. Callers holding an `anyhow::Error` can recover the kind with
//! `err.downcast_ref::<InstallError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    /// No asset is published for the detected (or requested) host.
    #[error("Unsupported platform: no release asset for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Transport-level failure while fetching an asset.
    #[error("Network error fetching {url}: {reason}")]
    NetworkError { url: String, reason: String },

    /// The downloaded bytes do not hash to the declared digest.
    #[error("Integrity check failed for {url}: expected sha256 {expected}, got {actual}")]
    IntegrityMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to extract executable: {0}")]
    ExtractionError(String),

    /// The formula lists the asset but no verified digest for it yet.
    #[error("No published sha256 for the {platform} asset {url}; refusing to download it")]
    DigestNotPublished { platform: String, url: String },

    #[error("Self-test failed: {0}")]
    SelfTestFailed(String),

    #[error("Version '{requested}' not found. Available versions: {available}")]
    UnknownVersion {
        requested: String,
        available: String,
    },

    #[error("Invalid formula: {0}")]
    InvalidFormula(String),
}

impl InstallError {
    /// True for failures that must never leave a binary behind.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, InstallError::IntegrityMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_platform_display() {
        let err = InstallError::UnsupportedPlatform {
            os: "windows".into(),
            arch: "x86_64".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported platform: no release asset for windows/x86_64"
        );
    }

    #[test]
    fn test_integrity_mismatch_display_names_both_digests() {
        let err = InstallError::IntegrityMismatch {
            url: "https://example.com/a.tar.gz".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected sha256 aa"));
        assert!(msg.contains("got bb"));
        assert!(err.is_integrity_failure());
    }

    #[test]
    fn test_digest_not_published_display() {
        let err = InstallError::DigestNotPublished {
            platform: "macos/arm64".into(),
            url: "https://example.com/v0.4.0/mitt-macos-aarch64.tar.gz".into(),
        };
        assert!(err.to_string().starts_with("No published sha256 for the macos/arm64 asset"));
        assert!(!err.is_integrity_failure());
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = InstallError::ExtractionError("empty".into()).into();
        let err = err.context("Install failed");
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::ExtractionError(_))
        ));
    }
}
