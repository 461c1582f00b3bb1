use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "piper-bootstrap";
const CONFIG_FILE_NAME: &str = "config.toml";

fn default_install_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_engine_repo_url() -> String {
    "https://github.com/rhasspy/piper".to_string()
}

fn default_voices_base_url() -> String {
    "https://github.com/rhasspy/piper/releases/download/v0.0.2".to_string()
}

fn default_voice() -> String {
    "voice-en-us-amy-low".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_inactivity_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    concat!("piper-bootstrap/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Installer configuration (TOML). Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerConfig {
    /// Directory the engine archive unpacks into
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,
    /// GitHub repository publishing engine releases
    #[serde(default = "default_engine_repo_url")]
    pub engine_repo_url: String,
    /// Base URL the voice archives are served from
    #[serde(default = "default_voices_base_url")]
    pub voices_base_url: String,
    /// Filter used when none is given on the command line
    #[serde(default = "default_voice")]
    pub default_voice: String,
    /// Voice model directory, `{install_root}/piper/models` when unset
    #[serde(default)]
    pub voices_dir: Option<PathBuf>,
    /// Companion server directory, `{install_root}/piper` when unset
    #[serde(default)]
    pub server_dir: Option<PathBuf>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Abort a download after this long without receiving a byte
    #[serde(default = "default_inactivity_timeout_secs")]
    pub inactivity_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            engine_repo_url: default_engine_repo_url(),
            voices_base_url: default_voices_base_url(),
            default_voice: default_voice(),
            voices_dir: None,
            server_dir: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            inactivity_timeout_secs: default_inactivity_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl InstallerConfig {
    /// Parse a TOML document, filling missing keys with defaults
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("Failed to parse installer config")
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the per-user config file is
    /// read if present; otherwise defaults are used and written there so the
    /// user has something to edit.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            info!("Using config from: {}", path.display());
            return Self::from_toml_str(&raw);
        }

        let Some(path) = default_config_path() else {
            warn!("Could not determine config directory, using built-in defaults");
            return Ok(Self::default());
        };

        if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            info!("Using config from: {}", path.display());
            return Self::from_toml_str(&raw);
        }

        let config = Self::default();
        if let Err(e) = config.write_to(&path) {
            warn!("Could not seed default config at {}: {e:#}", path.display());
        } else {
            info!("Created default configuration at {}", path.display());
        }
        Ok(config)
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let raw = toml::to_string_pretty(self).context("Failed to serialize default config")?;
        fs::write(path, raw).context("Failed to write config file")
    }

    /// Destination root for the engine archive
    pub fn engine_root(&self) -> PathBuf {
        self.install_root.clone()
    }

    /// Destination root for voice models
    pub fn voices_root(&self) -> PathBuf {
        self.voices_dir
            .clone()
            .unwrap_or_else(|| self.install_root.join("piper").join("models"))
    }

    /// Working directory of the companion npm server
    pub fn server_root(&self) -> PathBuf {
        self.server_dir
            .clone()
            .unwrap_or_else(|| self.install_root.join("piper"))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }
}

/// `{config_dir}/piper-bootstrap/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
