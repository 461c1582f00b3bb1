//! Installed-state detection
//!
//! An asset counts as installed when any one of its marker files exists:
//! - voice `B`: `B.onnx` or `B.onnx.json` in the voices root
//! - engine `B`: `B/piper` or `B/piper.exe` in the engine root
//!
//! A lone marker is enough. Extraction is staged, so a half-written install
//! cannot leave one marker without the rest of the archive.

use std::path::{Path, PathBuf};

use super::catalog::{AssetCategory, AssetDescriptor};

/// Marker files for `asset` under its destination root
pub fn marker_paths(asset: &AssetDescriptor, root: &Path) -> Vec<PathBuf> {
    let base = &asset.local_base_name;
    match asset.category {
        AssetCategory::Voice => vec![
            root.join(format!("{base}.onnx")),
            root.join(format!("{base}.onnx.json")),
        ],
        AssetCategory::Engine => vec![
            root.join(base).join("piper"),
            root.join(base).join("piper.exe"),
        ],
    }
}

/// Whether any marker of `asset` exists under `root`
pub fn is_installed(asset: &AssetDescriptor, root: &Path) -> bool {
    marker_paths(asset, root).iter().any(|p| p.exists())
}
