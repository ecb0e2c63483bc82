//! Command handlers behind the `mitt-install` CLI.
//!
//! Read-only commands render their output to a `String` so the binary only
//! has to print it.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::formula::resolve_asset;
use crate::install::{InstalledBinary, uninstall as remove_binary};
use crate::installer::{InstallRequest, Installer};
use crate::platform::HostPlatform;
use crate::runtime::Runtime;
use crate::self_test::self_test;

/// Download, verify, and install a release.
pub async fn install<R: Runtime>(
    runtime: R,
    config: &Config,
    bin_dir: PathBuf,
    version: Option<String>,
    host: HostPlatform,
    skip_test: bool,
) -> Result<InstalledBinary> {
    let installer = Installer::new(runtime, config.http_client()?);
    let request = InstallRequest {
        version,
        host,
        bin_dir,
        run_self_test: !skip_test,
    };
    installer.install(&config.formula, &request).await
}

/// URL and digest that `install` would use. Never touches the network.
pub fn resolve(config: &Config, version: Option<&str>, host: &HostPlatform) -> Result<String> {
    let release = config.formula.select(version)?;
    let asset = resolve_asset(release, &host.os, &host.arch)?;

    let mut out = String::new();
    writeln!(out, "version:  {}", release.version())?;
    writeln!(out, "platform: {}", asset.platform)?;
    writeln!(out, "url:      {}", asset.url)?;
    match &asset.sha256 {
        Some(digest) => writeln!(out, "sha256:   {}", digest)?,
        None => writeln!(out, "sha256:   (not published)")?,
    }
    Ok(out)
}

/// Every version in the formula, newest first.
pub fn list(config: &Config) -> String {
    let mut out = String::new();
    for release in config.formula.releases().iter().rev() {
        let platforms: Vec<String> = release.assets().map(|a| a.platform.to_string()).collect();
        let _ = writeln!(out, "{}  {}", release.version(), platforms.join(", "));
    }
    out
}

/// Descriptor of the latest release.
pub fn info(config: &Config) -> Result<String> {
    let release = config.formula.select(None)?;
    let descriptor = &release.descriptor;

    let mut out = String::new();
    writeln!(out, "{} {}", descriptor.name, descriptor.version)?;
    if let Some(description) = &descriptor.description {
        writeln!(out, "{}", description)?;
    }
    if let Some(homepage) = &descriptor.homepage {
        writeln!(out, "Homepage: {}", homepage)?;
    }
    writeln!(out, "License:  {}", descriptor.license)?;
    Ok(out)
}

/// Smoke-test the binary installed in `bin_dir`.
pub fn test<R: Runtime>(runtime: &R, config: &Config, bin_dir: &Path) -> Result<InstalledBinary> {
    let installed = InstalledBinary::at(bin_dir, &config.formula.name);
    if !runtime.exists(&installed.path) {
        anyhow::bail!("{} is not installed in {:?}", installed.name, bin_dir);
    }
    self_test(runtime, &installed)?;
    Ok(installed)
}

/// Remove the installed binary. Returns false if it was not installed.
pub fn uninstall<R: Runtime>(runtime: &R, config: &Config, bin_dir: &Path) -> Result<bool> {
    remove_binary(runtime, bin_dir, &config.formula.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstallError;
    use crate::formula::Formula;
    use crate::http::RetryPolicy;
    use crate::runtime::{CommandOutput, MockRuntime};
    use mockall::predicate::eq;

    const BIN_DIR: &str = "/usr/local/bin";

    fn config() -> Config {
        Config {
            retry: RetryPolicy::none(),
            formula: Formula::bundled().unwrap(),
        }
    }

    #[test]
    fn test_resolve_linux_x86_64() {
        let out = resolve(&config(), Some("0.4.0"), &HostPlatform::new("linux", "x86_64")).unwrap();
        assert!(out.contains("version:  0.4.0"));
        assert!(out.contains(
            "url:      https://github.com/no-way-labs/caldron/releases/download/v0.4.0/mitt-linux-x86_64.tar.gz"
        ));
        assert!(out.contains(
            "sha256:   0b408d3226a5ac2387e498cc8b80967e44dd09eae21e3270ea0a102c1b8cb1f2"
        ));
    }

    #[test]
    fn test_resolve_unpublished_digest() {
        let out = resolve(&config(), None, &HostPlatform::new("macos", "arm64")).unwrap();
        assert!(out.contains("mitt-macos-aarch64.tar.gz"));
        assert!(out.contains("sha256:   (not published)"));
    }

    #[test]
    fn test_resolve_unsupported_platform() {
        let err = resolve(&config(), None, &HostPlatform::new("windows", "x86_64")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::UnsupportedPlatform { .. })
        ));
    }

    #[test]
    fn test_list_shows_all_platforms() {
        let out = list(&config());
        assert!(out.starts_with("0.4.0  "));
        for platform in ["macos/arm64", "macos/x86_64", "linux/arm64", "linux/x86_64"] {
            assert!(out.contains(platform), "missing {}", platform);
        }
    }

    #[test]
    fn test_info() {
        let out = info(&config()).unwrap();
        assert!(out.starts_with("mitt 0.4.0\n"));
        assert!(out.contains("Encrypted file transfer CLI tool"));
        assert!(out.contains("Homepage: https://github.com/no-way-labs/caldron"));
        assert!(out.contains("License:  MIT"));
    }

    #[test]
    fn test_test_command_not_installed() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let err = test(&runtime, &config(), Path::new(BIN_DIR)).unwrap_err();
        assert!(err.to_string().contains("mitt is not installed"));
    }

    #[test]
    fn test_test_command_runs_self_test() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/usr/local/bin/mitt")))
            .returning(|_| true);
        runtime.expect_run().returning(|_, _| {
            Ok(CommandOutput {
                code: Some(1),
                stdout: b"mitt - encrypted file transfer".to_vec(),
                stderr: Vec::new(),
            })
        });

        let installed = test(&runtime, &config(), Path::new(BIN_DIR)).unwrap();
        assert_eq!(installed.path, PathBuf::from("/usr/local/bin/mitt"));
    }

    #[test]
    fn test_uninstall_not_installed() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);
        assert!(!uninstall(&runtime, &config(), Path::new(BIN_DIR)).unwrap());
    }
}
