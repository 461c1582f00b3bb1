//! Piper engine and voice installation
//!
//! Ensures the Piper engine build for the host and the selected voice models
//! are present under the configured roots, downloading and unpacking whatever
//! is missing.
//!
//! ## Module Organization
//!
//! - `catalog` - Asset descriptors and the static voice list
//! - `detection` - Installed-state marker checks
//! - `download` - Platform tokens, release lookup, fetching and extraction
//! - `manager` - Per-asset orchestration and batch reports
//! - `progress` - Progress events emitted while installing
//! - `runners` - Terminal front end for the binary

pub mod catalog;
pub mod detection;
pub mod download;
pub mod error;
pub mod manager;
pub mod progress;
pub mod runners;

pub use catalog::{ArchiveKind, AssetCategory, AssetDescriptor, RemoteLocator};
pub use download::platform::{Arch, Os, Platform};
pub use error::{ErrorKind, InstallError};
pub use manager::{AssetManager, FailedAsset, InstallReport};
pub use progress::{AssetPhase, AssetProgress};

use log::info;
use tokio::sync::mpsc;

use crate::config::InstallerConfig;
use error::Result;

/// Result of a full engine + voices run
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub platform: Platform,
    pub report: InstallReport,
}

impl InstallOutcome {
    /// Voices are optional; the engine is not
    pub fn engine_failed(&self) -> bool {
        self.report.has_failed(catalog::ENGINE_NAME)
    }
}

/// Ensure the engine for the host platform and the voices matching `voice_filter`
///
/// Fails before any network activity if the host platform is unsupported.
pub async fn ensure_installed(
    config: &InstallerConfig,
    voice_filter: Option<&str>,
    progress: Option<mpsc::Sender<AssetProgress>>,
) -> Result<InstallOutcome> {
    let platform = Platform::detect()?;
    ensure_installed_for(platform, config, voice_filter, progress).await
}

/// [`ensure_installed`] for an explicit platform
pub async fn ensure_installed_for(
    platform: Platform,
    config: &InstallerConfig,
    voice_filter: Option<&str>,
    progress: Option<mpsc::Sender<AssetProgress>>,
) -> Result<InstallOutcome> {
    info!("Platform: {platform}");

    let mut manager = AssetManager::new(config)?;
    if let Some(tx) = progress {
        manager = manager.with_progress(tx);
    }

    let engine = AssetDescriptor::engine(&platform, &config.engine_repo_url);
    let mut report = manager
        .ensure_assets(std::slice::from_ref(&engine), None)
        .await?;

    let voices = catalog::voice_catalog(config);
    report.merge(manager.ensure_assets(&voices, voice_filter).await?);

    Ok(InstallOutcome { platform, report })
}
