//! Asset download orchestration
//!
//! Walks a catalog in order, one asset at a time. Each asset is checked for
//! its marker files, then fetched and extracted if missing. A failed download
//! or extraction is recorded and the batch moves on; only a failed release
//! lookup aborts it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::InstallerConfig;

use super::catalog::{AssetCategory, AssetDescriptor, RemoteLocator};
use super::detection;
use super::download::{core, extract, github};
use super::error::{InstallError, Result};
use super::progress::{AssetPhase, AssetProgress};

/// An asset that could not be installed, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAsset {
    pub name: String,
    pub reason: String,
}

/// Outcome of one `ensure_assets` batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedAsset>,
}

impl InstallReport {
    pub fn merge(&mut self, other: InstallReport) {
        self.installed.extend(other.installed);
        self.skipped.extend(other.skipped);
        self.failed.extend(other.failed);
    }

    pub fn has_failed(&self, name: &str) -> bool {
        self.failed.iter().any(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty() && self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Downloads and unpacks catalog entries into their destination roots
pub struct AssetManager {
    client: reqwest::Client,
    engine_root: PathBuf,
    voices_root: PathBuf,
    inactivity_timeout: Duration,
    progress: Option<mpsc::Sender<AssetProgress>>,
    // Set once the receiver goes away so we stop trying
    progress_disabled: AtomicBool,
}

impl AssetManager {
    pub fn new(config: &InstallerConfig) -> Result<Self> {
        Ok(Self {
            client: core::build_client(&config.user_agent, config.connect_timeout())?,
            engine_root: config.engine_root(),
            voices_root: config.voices_root(),
            inactivity_timeout: config.inactivity_timeout(),
            progress: None,
            progress_disabled: AtomicBool::new(false),
        })
    }

    /// Send progress events to `tx` (best effort; never blocks an install)
    pub fn with_progress(mut self, tx: mpsc::Sender<AssetProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    fn root_for(&self, category: AssetCategory) -> &Path {
        match category {
            AssetCategory::Engine => &self.engine_root,
            AssetCategory::Voice => &self.voices_root,
        }
    }

    fn emit(&self, progress: AssetProgress) {
        let Some(tx) = &self.progress else {
            return;
        };
        if self.progress_disabled.load(Ordering::Relaxed) {
            return;
        }
        match tx.try_send(progress) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Progress channel full, dropping update"),
            Err(TrySendError::Closed(_)) => {
                warn!("Progress channel closed, continuing without updates");
                self.progress_disabled.store(true, Ordering::Relaxed);
            }
        }
    }

    /// Ensure every catalog entry whose name contains `filter` is installed
    ///
    /// Entries are processed sequentially in catalog order. Download and
    /// extraction failures are recorded in the report; a release lookup
    /// failure is returned as an error since nothing can be fetched without it.
    pub async fn ensure_assets(
        &self,
        catalog: &[AssetDescriptor],
        filter: Option<&str>,
    ) -> Result<InstallReport> {
        let selected: Vec<&AssetDescriptor> =
            catalog.iter().filter(|a| a.matches(filter)).collect();
        let total = selected.len();
        let mut report = InstallReport::default();

        if selected.is_empty() {
            warn!("No catalog entries match {:?}", filter.unwrap_or_default());
            return Ok(report);
        }

        for (i, asset) in selected.into_iter().enumerate() {
            let index = i + 1;
            let root = self.root_for(asset.category);
            self.emit(AssetProgress::new(&asset.name, index, total, AssetPhase::Checking));

            if detection::is_installed(asset, root) {
                info!("{} is already installed", asset.name);
                self.emit(AssetProgress::new(&asset.name, index, total, AssetPhase::Skipped));
                report.skipped.push(asset.name.clone());
                continue;
            }

            let url = match &asset.locator {
                RemoteLocator::Url(url) => url.clone(),
                RemoteLocator::LatestRelease {
                    repo_url,
                    file_stem,
                } => {
                    self.emit(AssetProgress::new(&asset.name, index, total, AssetPhase::Resolving));
                    github::locate_latest(&self.client, repo_url, file_stem)
                        .await
                        .inspect_err(|e| error!("Cannot install {}: {e}", asset.name))?
                }
            };

            match self.install_one(asset, &url, root, index, total).await {
                Ok(()) => {
                    info!("Installed {}", asset.name);
                    self.emit(AssetProgress::new(&asset.name, index, total, AssetPhase::Installed));
                    report.installed.push(asset.name.clone());
                }
                Err(e) => {
                    error!("Failed to install {}: {e}", asset.name);
                    let reason = e.to_string();
                    self.emit(AssetProgress::new(
                        &asset.name,
                        index,
                        total,
                        AssetPhase::Failed(reason.clone()),
                    ));
                    report.failed.push(FailedAsset {
                        name: asset.name.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(report)
    }

    async fn install_one(
        &self,
        asset: &AssetDescriptor,
        url: &str,
        root: &Path,
        index: usize,
        total: usize,
    ) -> Result<()> {
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| InstallError::io(format!("Failed to create {}", root.display()), e))?;

        let archive_path = root.join(archive_file_name(asset, url));
        info!("Downloading {} from {url}", asset.name);

        core::fetch(
            &self.client,
            url,
            &archive_path,
            self.inactivity_timeout,
            |bytes, total_bytes| {
                self.emit(AssetProgress::downloading(&asset.name, index, total, bytes, total_bytes))
            },
        )
        .await?;

        self.emit(AssetProgress::new(&asset.name, index, total, AssetPhase::Extracting));

        let kind = asset.archive_kind;
        let archive = archive_path.clone();
        let destination = root.to_path_buf();
        tokio::task::spawn_blocking(move || extract::extract(&archive, kind, &destination))
            .await
            .map_err(|e| InstallError::io("Extraction task failed", std::io::Error::other(e)))??;

        // The extractor already removes the archive; this only covers a failed removal there
        match tokio::fs::remove_file(&archive_path).await {
            Ok(()) => debug!("Cleaned up {}", archive_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clean up {}: {e}", archive_path.display()),
        }

        Ok(())
    }
}

/// Local file name for a downloaded archive: the URL's last path segment
fn archive_file_name(asset: &AssetDescriptor, url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("{}{}", asset.name, asset.archive_kind.extension()))
}
