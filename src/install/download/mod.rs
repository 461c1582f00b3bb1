//! Release discovery, download and archive extraction
//!
//! ## Module Organization
//!
//! - `platform` - Host detection and release file stems
//! - `github` - "Latest release" tag resolution via redirects
//! - `core` - Streaming fetch with atomic rename
//! - `extract` - Staged tar+gzip and zip extraction

pub mod core;
pub mod extract;
pub mod github;
pub mod platform;

pub use self::core::fetch;
pub use self::extract::extract;
pub use self::github::locate_latest;
