//! Command-line settings shared by every subcommand.
//!
//! The bin directory is resolved separately, and only by the commands that
//! touch it, so read-only commands work without a home directory.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::formula::Formula;
use crate::http::{HttpClient, RetryPolicy};
use crate::runtime::Runtime;

/// Settings shared by every command, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub retry: RetryPolicy,
    pub formula: Formula,
}

impl Config {
    #[tracing::instrument(skip(runtime))]
    pub fn new<R: Runtime>(
        runtime: &R,
        formula_path: Option<&Path>,
        retries: Option<usize>,
    ) -> Result<Self> {
        let formula = match formula_path {
            Some(path) => Formula::load(runtime, path)?,
            None => Formula::bundled()?,
        };

        let retry = retries
            .map(RetryPolicy::with_attempts)
            .unwrap_or_default();

        debug!("Using {} fetch attempt(s)", retry.max_attempts);

        Ok(Self { retry, formula })
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        HttpClient::build(self.retry)
    }
}

/// `--bin-dir` if given, otherwise `~/.local/bin`.
pub fn resolve_bin_dir<R: Runtime>(runtime: &R, bin_dir: Option<PathBuf>) -> Result<PathBuf> {
    match bin_dir {
        Some(dir) => Ok(dir),
        None => default_bin_dir(runtime),
    }
}

/// `~/.local/bin`
pub fn default_bin_dir<R: Runtime>(runtime: &R) -> Result<PathBuf> {
    let home = runtime
        .home_dir()
        .context("Could not determine home directory; pass --bin-dir")?;
    let bin_dir = home.join(".local").join("bin");
    debug!("Default bin dir {:?}", bin_dir);
    Ok(bin_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use std::time::Duration;

    #[test]
    fn test_default_bin_dir_under_home() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));

        let bin_dir = resolve_bin_dir(&runtime, None).unwrap();
        assert_eq!(bin_dir, PathBuf::from("/home/user/.local/bin"));
    }

    #[test]
    fn test_explicit_bin_dir_skips_home_lookup() {
        // No home_dir expectation: looking it up would panic
        let runtime = MockRuntime::new();
        let bin_dir = resolve_bin_dir(&runtime, Some(PathBuf::from("/opt/bin"))).unwrap();
        assert_eq!(bin_dir, PathBuf::from("/opt/bin"));
    }

    #[test]
    fn test_missing_home_is_an_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().returning(|| None);

        let err = resolve_bin_dir(&runtime, None).unwrap_err();
        assert!(err.to_string().contains("--bin-dir"));
    }

    #[test]
    fn test_config_never_looks_up_home() {
        let mut runtime = MockRuntime::new();
        runtime.expect_home_dir().never();

        let config = Config::new(&runtime, None, None).unwrap();
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.formula, Formula::bundled().unwrap());
    }

    #[test]
    fn test_retries_option() {
        let runtime = MockRuntime::new();
        let config = Config::new(&runtime, None, Some(5)).unwrap();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.delay, Duration::from_millis(crate::http::RETRY_DELAY_MS));
    }

    #[test]
    fn test_formula_path_is_loaded() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{ not json".to_string()));

        let err = Config::new(&runtime, Some(Path::new("/etc/mitt.json")), None).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse formula"));
    }
}
