//! Fetching release assets and verifying their digests.

use log::{debug, info};

use crate::error::InstallError;
use crate::formula::{AssetEntry, Sha256Digest};
use crate::http::HttpClient;
use crate::platform::PlatformKey;

/// Archive bytes whose SHA-256 matched the formula.
///
/// Only [`verify_blob`] constructs this, so anything that installs from a
/// `VerifiedBlob` cannot act on unverified bytes.
#[derive(Debug, Clone)]
pub struct VerifiedBlob {
    bytes: Vec<u8>,
    sha256: Sha256Digest,
    platform: PlatformKey,
}

impl VerifiedBlob {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn sha256(&self) -> &Sha256Digest {
        &self.sha256
    }

    /// Platform of the asset these bytes were fetched for.
    pub fn platform(&self) -> PlatformKey {
        self.platform
    }
}

/// Check downloaded bytes against the asset's declared digest.
pub fn verify_blob(asset: &AssetEntry, bytes: Vec<u8>) -> Result<VerifiedBlob, InstallError> {
    let expected = asset.published_sha256()?;
    let actual = Sha256Digest::of(&bytes);
    if &actual != expected {
        return Err(InstallError::IntegrityMismatch {
            url: asset.url.clone(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    debug!("Verified sha256 {} for {}", actual, asset.url);
    Ok(VerifiedBlob {
        bytes,
        sha256: actual,
        platform: asset.platform,
    })
}

/// Download an asset and verify it.
#[tracing::instrument(skip(http_client, asset), fields(url = %asset.url))]
pub async fn fetch_and_verify(
    http_client: &HttpClient,
    asset: &AssetEntry,
) -> Result<VerifiedBlob, InstallError> {
    // Nothing to verify against, so don't download at all
    asset.published_sha256()?;

    info!("Fetching {}...", asset.url);
    let bytes = http_client
        .get_bytes(&asset.url)
        .await
        .map_err(|e| InstallError::NetworkError {
            url: asset.url.clone(),
            reason: format!("{:#}", e),
        })?;

    verify_blob(asset, bytes)
}
