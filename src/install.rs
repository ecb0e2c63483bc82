//! Placing a verified executable into a bin directory.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::archive::extract_executable;
use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::fetch::VerifiedBlob;
use crate::formula::{Sha256Digest, Version};
use crate::platform::PlatformKey;
use crate::runtime::Runtime;

/// Permission bits for installed executables.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// An executable placed in a bin directory.
#[derive(Debug, Clone, PartialEq)]
pub struct InstalledBinary {
    pub name: String,
    pub path: PathBuf,
    /// The following are known only for a binary installed in this run.
    pub version: Option<Version>,
    pub platform: Option<PlatformKey>,
    /// Digest of the archive it came from.
    pub archive_sha256: Option<Sha256Digest>,
}

impl InstalledBinary {
    /// Refer to a binary already sitting in `target_dir`.
    pub fn at(target_dir: &Path, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: target_dir.join(name),
            version: None,
            platform: None,
            archive_sha256: None,
        }
    }
}

fn staging_path(target_dir: &Path, name: &str) -> PathBuf {
    target_dir.join(format!(".{}.partial", name))
}

/// Extract `name` from a verified archive into `target_dir`.
///
/// The file is written next to its destination and renamed into place, so
/// an existing install is replaced whole or not at all.
#[tracing::instrument(skip(runtime, blob, cleanup_ctx))]
pub fn install<R: Runtime>(
    runtime: &R,
    blob: &VerifiedBlob,
    target_dir: &Path,
    name: &str,
    cleanup_ctx: Option<SharedCleanupContext>,
) -> Result<InstalledBinary> {
    let contents = extract_executable(blob.bytes(), name)?;

    if runtime.exists(target_dir) && !runtime.is_dir(target_dir) {
        anyhow::bail!("{:?} exists and is not a directory", target_dir);
    }
    runtime
        .create_dir_all(target_dir)
        .with_context(|| format!("Failed to create {:?}", target_dir))?;

    let staged = staging_path(target_dir, name);
    let dest = target_dir.join(name);
    let guard = cleanup_ctx.map(|ctx| CleanupGuard::new(ctx, staged.clone()));

    debug!("Staging {} bytes at {:?}", contents.len(), staged);
    let placed = runtime
        .write(&staged, &contents)
        .and_then(|_| runtime.set_permissions(&staged, EXECUTABLE_MODE))
        .and_then(|_| runtime.rename(&staged, &dest));

    if let Err(e) = placed {
        if runtime.exists(&staged) {
            if let Err(cleanup_err) = runtime.remove_file(&staged) {
                warn!("Failed to remove {:?}: {}", staged, cleanup_err);
            }
        }
        return Err(e.context(format!("Failed to install {:?}", dest)));
    }

    if let Some(guard) = guard {
        guard.success();
    }

    info!("Installed {:?}", dest);
    Ok(InstalledBinary {
        name: name.to_string(),
        path: dest,
        version: None,
        platform: Some(blob.platform()),
        archive_sha256: Some(blob.sha256().clone()),
    })
}

/// Remove an installed binary. Returns false if nothing was installed.
#[tracing::instrument(skip(runtime))]
pub fn uninstall<R: Runtime>(runtime: &R, target_dir: &Path, name: &str) -> Result<bool> {
    let path = target_dir.join(name);
    if !runtime.exists(&path) {
        debug!("{:?} is not installed", path);
        return Ok(false);
    }
    runtime
        .remove_file(&path)
        .with_context(|| format!("Failed to remove {:?}", path))?;
    info!("Removed {:?}", path);
    Ok(true)
}
