//! Per-asset progress events

use serde::Serialize;

/// Where an asset is in its install state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "detail")]
pub enum AssetPhase {
    Checking,   // Looking for marker files
    Resolving,  // Asking the release index for the latest tag
    Downloading,
    Extracting,
    Installed,
    Skipped,    // Already installed
    Failed(String),
}

/// Progress update for one asset of a batch
#[derive(Debug, Clone, Serialize)]
pub struct AssetProgress {
    pub asset: String,
    /// 1-based position in the batch
    pub index: usize,
    pub total: usize,
    pub phase: AssetPhase,
    pub bytes_downloaded: u64,
    /// Advertised size, when the server sends one
    pub total_bytes: Option<u64>,
}

impl AssetProgress {
    pub fn new(asset: &str, index: usize, total: usize, phase: AssetPhase) -> Self {
        Self {
            asset: asset.to_string(),
            index,
            total,
            phase,
            bytes_downloaded: 0,
            total_bytes: None,
        }
    }

    pub fn downloading(
        asset: &str,
        index: usize,
        total: usize,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    ) -> Self {
        Self {
            bytes_downloaded,
            total_bytes,
            ..Self::new(asset, index, total, AssetPhase::Downloading)
        }
    }

    /// Human-readable status line
    pub fn message(&self) -> String {
        match &self.phase {
            AssetPhase::Checking => format!("Checking {}", self.asset),
            AssetPhase::Resolving => format!("Looking up latest release for {}", self.asset),
            AssetPhase::Downloading => {
                let mb_downloaded = self.bytes_downloaded as f64 / 1_048_576.0;
                match self.total_bytes {
                    Some(total) if total > 0 => {
                        let percent = self.bytes_downloaded * 100 / total;
                        format!(
                            "Downloading {} ({:.1} MB / {:.1} MB) - {}%",
                            self.asset,
                            mb_downloaded,
                            total as f64 / 1_048_576.0,
                            percent
                        )
                    }
                    _ => format!("Downloading {} ({:.1} MB)", self.asset, mb_downloaded),
                }
            }
            AssetPhase::Extracting => format!("Extracting {}", self.asset),
            AssetPhase::Installed => format!("{} installed", self.asset),
            AssetPhase::Skipped => format!("{} is already installed", self.asset),
            AssetPhase::Failed(reason) => format!("{} failed: {}", self.asset, reason),
        }
    }
}
