//! Bootstrap installer for the Piper speech-synthesis engine
//!
//! Detects the host platform, makes sure the Piper engine build and the
//! requested voice models are present locally, and starts the companion
//! npm server.

pub mod config;
pub mod install;
pub mod service;

pub use config::InstallerConfig;
pub use install::{InstallError, InstallReport, ensure_installed};
