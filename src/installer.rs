//! The install pipeline: pick a release, fetch and verify its asset for the
//! host, place the binary, then smoke-test it.
//!
//! A Ctrl-C while the pipeline runs removes any staged file before exiting.

use anyhow::Result;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cleanup::{self, SharedCleanupContext};
use crate::fetch::fetch_and_verify;
use crate::formula::{AssetEntry, Formula, resolve_asset};
use crate::http::HttpClient;
use crate::install::{InstalledBinary, install};
use crate::platform::HostPlatform;
use crate::runtime::Runtime;
use crate::self_test::self_test;

/// What to install and where.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Exact version; latest when `None`.
    pub version: Option<String>,
    pub host: HostPlatform,
    pub bin_dir: PathBuf,
    pub run_self_test: bool,
}

/// Runs resolve → fetch → verify → extract → test, stopping at the first
/// failing stage.
pub struct Installer<R: Runtime> {
    pub runtime: R,
    pub http_client: HttpClient,
}

impl<R: Runtime> Installer<R> {
    pub fn new(runtime: R, http_client: HttpClient) -> Self {
        Self {
            runtime,
            http_client,
        }
    }

    #[tracing::instrument(skip(self, formula))]
    pub async fn install(
        &self,
        formula: &Formula,
        request: &InstallRequest,
    ) -> Result<InstalledBinary> {
        let release = formula.select(request.version.as_deref())?;
        let descriptor = &release.descriptor;
        println!("   resolving {} {}", descriptor.name, descriptor.version);

        // Pure lookup; unsupported hosts stop here without touching the network
        let asset = resolve_asset(release, &request.host.os, &request.host.arch)?;
        info!("Selected {} asset {}", asset.platform, asset.url);

        let cleanup_ctx = cleanup::new_shared();
        let cleanup_ctx_clone = Arc::clone(&cleanup_ctx);
        let ctrl_c_handler = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cleaning up...");
                cleanup::lock(&cleanup_ctx_clone).cleanup();
                std::process::exit(130); // Standard exit code for Ctrl-C
            }
        });

        let result = self
            .fetch_and_place(formula, request, asset, Arc::clone(&cleanup_ctx))
            .await;

        ctrl_c_handler.abort();
        let installed = InstalledBinary {
            version: Some(descriptor.version.clone()),
            ..result?
        };

        if request.run_self_test {
            println!("     testing {}", installed.path.display());
            self_test(&self.runtime, &installed)?;
        }

        println!(
            "   installed {} {} -> {}",
            descriptor.name,
            descriptor.version,
            installed.path.display()
        );
        Ok(installed)
    }

    async fn fetch_and_place(
        &self,
        formula: &Formula,
        request: &InstallRequest,
        asset: &AssetEntry,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<InstalledBinary> {
        println!(" downloading {}", asset.url);
        let blob = fetch_and_verify(&self.http_client, asset)
            .await
            .inspect_err(|e| {
                if e.is_integrity_failure() {
                    warn!("Discarded download of {}; nothing was written", asset.url);
                }
            })?;
        println!("    verified sha256 {}", blob.sha256());

        install(
            &self.runtime,
            &blob,
            &request.bin_dir,
            &formula.name,
            Some(cleanup_ctx),
        )
    }
}
