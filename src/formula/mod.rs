//! The formula: an append-only table of releases and their per-platform
//! assets.
//!
//! Each row pairs an immutable [`ReleaseDescriptor`] with exactly one
//! [`AssetEntry`] per [`PlatformKey`]. New versions are appended as new
//! rows; existing rows are never rewritten.

mod digest;
mod version;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::InstallError;
use crate::platform::{Arch, Os, PlatformKey};
use crate::runtime::Runtime;

pub use digest::Sha256Digest;
pub use version::Version;

/// Formula compiled into the binary.
const BUNDLED_FORMULA: &str = include_str!("mitt.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDescriptor {
    pub name: String,
    pub version: Version,
    pub license: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    #[serde(flatten)]
    pub platform: PlatformKey,
    pub url: String,
    /// `None` until a digest for this asset has been published.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Sha256Digest>,
}

impl AssetEntry {
    /// The digest to verify against; an asset without one is never fetched.
    pub fn published_sha256(&self) -> Result<&Sha256Digest, InstallError> {
        self.sha256
            .as_ref()
            .ok_or_else(|| InstallError::DigestNotPublished {
                platform: self.platform.to_string(),
                url: self.url.clone(),
            })
    }
}

/// One row of the formula table.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub descriptor: ReleaseDescriptor,
    assets: [AssetEntry; 4],
}

impl Release {
    /// Build a release row, checking that every supported platform has
    /// exactly one asset and that each URL points at this version's
    /// release for that platform.
    pub fn new(descriptor: ReleaseDescriptor, assets: Vec<AssetEntry>) -> Result<Self, InstallError> {
        let version_segment = format!("/{}/", descriptor.version.tag());
        let mut slots: [Option<AssetEntry>; 4] = Default::default();

        for asset in assets {
            if !(asset.url.starts_with("https://") || asset.url.starts_with("http://")) {
                return Err(InstallError::InvalidFormula(format!(
                    "{} asset URL is not http(s): {}",
                    asset.platform, asset.url
                )));
            }
            if !asset.url.contains(&version_segment) {
                return Err(InstallError::InvalidFormula(format!(
                    "{} asset URL does not embed version {}: {}",
                    asset.platform,
                    descriptor.version.tag(),
                    asset.url
                )));
            }
            let file_name = asset.platform.asset_file_name(&descriptor.name);
            if !asset.url.ends_with(&format!("/{}", file_name)) {
                return Err(InstallError::InvalidFormula(format!(
                    "{} asset URL does not end with {}: {}",
                    asset.platform, file_name, asset.url
                )));
            }

            let entry = &mut slots[slot(asset.platform)];
            if entry.is_some() {
                return Err(InstallError::InvalidFormula(format!(
                    "duplicate {} asset for version {}",
                    asset.platform, descriptor.version
                )));
            }
            *entry = Some(asset);
        }

        let missing: Vec<String> = PlatformKey::ALL
            .iter()
            .filter(|key| slots[slot(**key)].is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(InstallError::InvalidFormula(format!(
                "version {} has no asset for {}",
                descriptor.version,
                missing.join(", ")
            )));
        }

        let [a, b, c, d] = slots;
        match (a, b, c, d) {
            (Some(a), Some(b), Some(c), Some(d)) => Ok(Self {
                descriptor,
                assets: [a, b, c, d],
            }),
            _ => Err(InstallError::InvalidFormula(format!(
                "version {} is missing platform assets",
                descriptor.version
            ))),
        }
    }

    pub fn version(&self) -> &Version {
        &self.descriptor.version
    }

    /// The asset for a supported platform. Total over [`PlatformKey`].
    pub fn asset(&self, key: PlatformKey) -> &AssetEntry {
        &self.assets[slot(key)]
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetEntry> {
        self.assets.iter()
    }
}

/// Table position of each platform. Exhaustive over `Os × Arch`.
fn slot(key: PlatformKey) -> usize {
    match (key.os, key.arch) {
        (Os::Macos, Arch::Arm64) => 0,
        (Os::Macos, Arch::X86_64) => 1,
        (Os::Linux, Arch::Arm64) => 2,
        (Os::Linux, Arch::X86_64) => 3,
    }
}

/// Select the asset for a host.
///
/// Pure lookup: unlisted hosts fail with `UnsupportedPlatform` before any
/// network access happens.
pub fn resolve_asset<'a>(
    release: &'a Release,
    host_os: &str,
    host_arch: &str,
) -> Result<&'a AssetEntry, InstallError> {
    let key = PlatformKey::parse(host_os, host_arch)?;
    let asset = release.asset(key);
    debug!(
        "Resolved {} {} for {} -> {}",
        release.descriptor.name,
        release.descriptor.version,
        key,
        asset.url
    );
    Ok(asset)
}

/// On-disk form of a formula.
#[derive(Debug, Deserialize)]
struct FormulaFile {
    name: String,
    description: Option<String>,
    homepage: Option<String>,
    license: String,
    releases: Vec<ReleaseRow>,
}

#[derive(Debug, Deserialize)]
struct ReleaseRow {
    version: Version,
    assets: Vec<AssetEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub license: String,
    releases: Vec<Release>,
}

impl Formula {
    pub fn new(name: impl Into<String>, license: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            homepage: None,
            license: license.into(),
            releases: Vec::new(),
        }
    }

    /// The formula shipped with this binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_FORMULA).context("Bundled formula is invalid")
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read formula {:?}", path))?;
        Self::from_json(&content).with_context(|| format!("Failed to load formula {:?}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: FormulaFile = serde_json::from_str(content).context("Failed to parse formula")?;

        let mut formula = Formula {
            name: file.name,
            description: file.description,
            homepage: file.homepage,
            license: file.license,
            releases: Vec::new(),
        };
        for row in file.releases {
            let descriptor = formula.descriptor(row.version);
            formula.push(Release::new(descriptor, row.assets)?)?;
        }
        Ok(formula)
    }

    /// Descriptor for a new version of this program.
    pub fn descriptor(&self, version: Version) -> ReleaseDescriptor {
        ReleaseDescriptor {
            name: self.name.clone(),
            version,
            license: self.license.clone(),
            description: self.description.clone(),
            homepage: self.homepage.clone(),
        }
    }

    /// Append a release. Versions must be strictly increasing, and no URL
    /// or digest of an earlier release may be reused.
    pub fn push(&mut self, release: Release) -> Result<(), InstallError> {
        if release.descriptor.name != self.name {
            return Err(InstallError::InvalidFormula(format!(
                "release is for '{}', formula is for '{}'",
                release.descriptor.name, self.name
            )));
        }
        if let Some(latest) = self.latest() {
            if release.version() <= latest.version() {
                return Err(InstallError::InvalidFormula(format!(
                    "version {} is not newer than {}",
                    release.version(),
                    latest.version()
                )));
            }
        }

        let mut urls: HashSet<&str> = HashSet::new();
        let mut digests: HashSet<&str> = HashSet::new();
        for asset in self.releases.iter().flat_map(Release::assets) {
            urls.insert(asset.url.as_str());
            if let Some(digest) = &asset.sha256 {
                digests.insert(digest.as_str());
            }
        }
        for asset in release.assets() {
            if !urls.insert(asset.url.as_str()) {
                return Err(InstallError::InvalidFormula(format!(
                    "URL reused by version {}: {}",
                    release.version(),
                    asset.url
                )));
            }
            if let Some(digest) = &asset.sha256 {
                if !digests.insert(digest.as_str()) {
                    return Err(InstallError::InvalidFormula(format!(
                        "sha256 reused by version {} ({}): {}",
                        release.version(),
                        asset.platform,
                        digest
                    )));
                }
            }
        }

        self.releases.push(release);
        Ok(())
    }

    /// Releases, oldest first.
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn latest(&self) -> Option<&Release> {
        self.releases.last()
    }

    pub fn get(&self, version: &str) -> Result<&Release, InstallError> {
        self.releases
            .iter()
            .find(|r| r.version().matches(version))
            .ok_or_else(|| InstallError::UnknownVersion {
                requested: version.to_string(),
                available: self.available_versions(),
            })
    }

    /// A specific version, or the latest when none is requested.
    pub fn select(&self, version: Option<&str>) -> Result<&Release, InstallError> {
        match version {
            Some(v) => self.get(v),
            None => self.latest().ok_or_else(|| InstallError::UnknownVersion {
                requested: "latest".to_string(),
                available: self.available_versions(),
            }),
        }
    }

    fn available_versions(&self) -> String {
        if self.releases.is_empty() {
            return "(none)".to_string();
        }
        self.releases
            .iter()
            .rev()
            .map(|r| r.version().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
