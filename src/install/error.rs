//! Installer error taxonomy
//!
//! Every failure the asset subsystem can produce maps onto one of four kinds
//! (see [`ErrorKind`]). Platform and release-lookup failures abort the run;
//! everything else is scoped to a single asset and recorded in the report.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used by callers to decide continue vs abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedPlatform,
    Network,
    Io,
    CorruptArchive,
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("unsupported platform: {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("no data received from {url} for {secs} seconds")]
    Stalled { url: String, secs: u64 },

    #[error("could not find a release tag in {url}")]
    ReleaseTag { url: String },

    #[error("release lookup for {repo_url} failed: {source}")]
    ReleaseLookup {
        repo_url: String,
        #[source]
        source: Box<InstallError>,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt archive {}: {reason}", path.display())]
    CorruptArchive { path: PathBuf, reason: String },
}

impl InstallError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn release_lookup(repo_url: &str, source: InstallError) -> Self {
        Self::ReleaseLookup {
            repo_url: repo_url.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn corrupt(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::CorruptArchive {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedPlatform { .. } => ErrorKind::UnsupportedPlatform,
            Self::Network { .. }
            | Self::HttpStatus { .. }
            | Self::Stalled { .. }
            | Self::ReleaseTag { .. } => ErrorKind::Network,
            Self::ReleaseLookup { source, .. } => source.kind(),
            Self::Io { .. } => ErrorKind::Io,
            Self::CorruptArchive { .. } => ErrorKind::CorruptArchive,
        }
    }

    /// Whether this error must abort the whole run rather than a single asset
    ///
    /// Without a platform token or a release to download from there is nothing
    /// to install, so both stop everything. Transfer and extraction failures
    /// of a single asset do not.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPlatform { .. }
                | Self::ReleaseTag { .. }
                | Self::ReleaseLookup { .. }
        )
    }
}

pub type Result<T, E = InstallError> = std::result::Result<T, E>;
