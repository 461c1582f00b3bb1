//! Canonical registry of installable assets
//!
//! The voice list mirrors the archives published with Piper's v0.0.2 voice
//! release. The engine descriptor is built per platform because its file name
//! depends on the host and its version is resolved at install time.

use crate::config::InstallerConfig;

use super::download::platform::Platform;

/// Every voice archive the installer knows how to fetch
pub const VOICES: &[&str] = &[
    "voice-ca-upc_ona-x-low",
    "voice-ca-upc_pau-x-low",
    "voice-da-nst_talesyntese-medium",
    "voice-de-eva_k-x-low",
    "voice-de-karlsson-low",
    "voice-de-kerstin-low",
    "voice-de-pavoque-low",
    "voice-de-ramona-low",
    "voice-de-thorsten-low",
    "voice-el-gr-rapunzelina-low",
    "voice-en-gb-alan-low",
    "voice-en-gb-southern_english_female-low",
    "voice-en-us-amy-low",
    "voice-en-us-danny-low",
    "voice-en-us-kathleen-low",
    "voice-en-us-lessac-low",
    "voice-en-us-lessac-medium",
    "voice-en-us-libritts-high",
    "voice-en-us-ryan-high",
    "voice-en-us-ryan-low",
    "voice-en-us-ryan-medium",
    "voice-es-carlfm-x-low",
    "voice-es-mls_10246-low",
    "voice-es-mls_9972-low",
    "voice-fi-harri-low",
    "voice-fr-gilles-low",
    "voice-fr-mls_1840-low",
    "voice-fr-siwis-low",
    "voice-fr-siwis-medium",
    "voice-is-bui-medium",
    "voice-is-salka-medium",
    "voice-is-steinn-medium",
    "voice-is-ugla-medium",
    "voice-it-riccardo_fasol-x-low",
    "voice-kk-iseke-x-low",
    "voice-kk-issai-high",
    "voice-kk-raya-x-low",
    "voice-ne-google-medium",
    "voice-ne-google-x-low",
    "voice-nl-mls_5809-low",
    "voice-nl-mls_7432-low",
    "voice-nl-nathalie-x-low",
    "voice-nl-rdh-medium",
    "voice-nl-rdh-x-low",
    "voice-no-talesyntese-medium",
    "voice-pl-mls_6892-low",
    "voice-pt-br-edresson-low",
    "voice-ru-irinia-medium",
    "voice-sv-se-nst-medium",
    "voice-uk-lada-x-low",
    "voice-vi-25hours-single-low",
    "voice-vi-vivos-x-low",
    "voice-zh-cn-huayan-x-low",
];

/// Local name of the engine; also the top-level directory inside its archive
pub const ENGINE_NAME: &str = "piper";

/// Container format of a downloaded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Piper ships zip archives for `amd64` builds and tarballs for the rest
    pub fn for_file_stem(stem: &str) -> Self {
        if stem.contains("amd64") {
            ArchiveKind::Zip
        } else {
            ArchiveKind::TarGz
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveKind::TarGz => ".tar.gz",
            ArchiveKind::Zip => ".zip",
        }
    }
}

/// Which destination root an asset installs into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    Engine,
    Voice,
}

/// Where an asset is downloaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLocator {
    /// A fixed download URL
    Url(String),
    /// The newest GitHub release of `repo_url`, asset `{file_stem}{ext}`
    LatestRelease { repo_url: String, file_stem: String },
}

/// One downloadable unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    pub name: String,
    pub locator: RemoteLocator,
    /// Base name of the files whose presence marks the asset as installed
    pub local_base_name: String,
    pub archive_kind: ArchiveKind,
    pub category: AssetCategory,
}

impl AssetDescriptor {
    /// Voice archive `{base_url}/{name}.tar.gz`, unpacking to `{name without "voice-"}.onnx`
    pub fn voice(name: &str, base_url: &str) -> Self {
        let kind = ArchiveKind::TarGz;
        Self {
            name: name.to_string(),
            locator: RemoteLocator::Url(format!(
                "{}/{}{}",
                base_url.trim_end_matches('/'),
                name,
                kind.extension()
            )),
            local_base_name: name.strip_prefix("voice-").unwrap_or(name).to_string(),
            archive_kind: kind,
            category: AssetCategory::Voice,
        }
    }

    /// Engine build for `platform` from the latest release of `repo_url`
    pub fn engine(platform: &Platform, repo_url: &str) -> Self {
        let file_stem = platform.engine_file_stem();
        Self {
            name: ENGINE_NAME.to_string(),
            archive_kind: ArchiveKind::for_file_stem(&file_stem),
            locator: RemoteLocator::LatestRelease {
                repo_url: repo_url.trim_end_matches('/').to_string(),
                file_stem,
            },
            local_base_name: ENGINE_NAME.to_string(),
            category: AssetCategory::Engine,
        }
    }

    pub fn matches(&self, filter: Option<&str>) -> bool {
        filter.is_none_or(|f| self.name.contains(f))
    }
}

/// The full voice catalog, in install order
pub fn voice_catalog(config: &InstallerConfig) -> Vec<AssetDescriptor> {
    VOICES
        .iter()
        .map(|name| AssetDescriptor::voice(name, &config.voices_base_url))
        .collect()
}
