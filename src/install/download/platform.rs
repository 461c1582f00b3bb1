//! Platform detection for release file names

use std::fmt;

use crate::install::error::{InstallError, Result};

/// Operating systems Piper publishes engine builds for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    MacOs,
    Windows,
    Linux,
}

/// CPU architectures Piper publishes engine builds for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X64,
    Aarch64,
    Armv7l,
}

impl Os {
    pub fn token(&self) -> &'static str {
        match self {
            Os::MacOs => "macos",
            Os::Windows => "windows",
            Os::Linux => "linux",
        }
    }
}

impl Arch {
    pub fn token(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Aarch64 => "aarch64",
            Arch::Armv7l => "armv7l",
        }
    }
}

/// Host platform token, resolved once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detect the running platform from the compile-time target identifiers
    pub fn detect() -> Result<Self> {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map Rust target identifiers onto a supported platform
    ///
    /// Anything outside the allow-list is an error. There is no fallback.
    pub fn from_parts(os: &str, arch: &str) -> Result<Self> {
        let (os_kind, arch_kind) = match (os, arch) {
            ("linux", "x86_64") => (Os::Linux, Arch::X64),
            ("linux", "aarch64") => (Os::Linux, Arch::Aarch64),
            ("linux", "arm") => (Os::Linux, Arch::Armv7l),
            ("macos", "x86_64") => (Os::MacOs, Arch::X64),
            ("macos", "aarch64") => (Os::MacOs, Arch::Aarch64),
            ("windows", "x86_64") => (Os::Windows, Arch::X64),
            (os, arch) => {
                return Err(InstallError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                });
            }
        };

        Ok(Self {
            os: os_kind,
            arch: arch_kind,
        })
    }

    /// Stem of the engine archive published for this platform
    ///
    /// Piper's release names do not follow the token scheme for x64 Linux and
    /// Windows, so those two are spelled out.
    pub fn engine_file_stem(&self) -> String {
        match (self.os, self.arch) {
            (Os::Linux, Arch::X64) => "piper_linux_x86_64".to_string(),
            (Os::Windows, Arch::X64) => "piper_windows_amd64".to_string(),
            _ => format!("piper_{self}"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os.token(), self.arch.token())
    }
}
