//! Removal of staged files when an install is interrupted.

use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Staged files that have not been renamed into place yet.
#[derive(Debug, Default)]
pub struct CleanupContext {
    pub(crate) paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn release(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    /// Delete every registered file. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed staged file {:?}", path);
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove staged file {:?}: {}", path, e),
            }
        }
        removed
    }
}

pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// Lock the context, ignoring poisoning so cleanup still runs after a panic.
pub fn lock(ctx: &SharedCleanupContext) -> MutexGuard<'_, CleanupContext> {
    ctx.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps a staged file registered until [`CleanupGuard::success`].
///
/// Dropping the guard without calling `success` leaves the path registered.
pub struct CleanupGuard {
    ctx: SharedCleanupContext,
    path: PathBuf,
}

impl CleanupGuard {
    pub fn new(ctx: SharedCleanupContext, path: PathBuf) -> Self {
        lock(&ctx).register(path.clone());
        Self { ctx, path }
    }

    pub fn success(self) {
        lock(&self.ctx).release(&self.path);
    }
}
