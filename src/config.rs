//! Rigcal configuration.
//!
//! Loaded from `~/.rigcal/config.toml`. Every key is optional; a missing file
//! means all defaults.
//!
//! ```toml
//! store = "/srv/rigcal/rigcal.sqlite"
//! role = "authority"
//! poll-interval-ms = 250
//! log-level = "info"
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::{model::Role, storage::Storage};

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Path of the shared store. Defaults to `~/.rigcal/rigcal.sqlite`.
    pub store: Option<PathBuf>,

    /// Role used when neither `--as` nor `RIGCAL_ROLE` is given.
    pub role: Option<Role>,

    /// How often live calendars look for changes made elsewhere.
    pub poll_interval_ms: u64,

    /// Log filter used when `RIGCAL_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: None,
            role: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load config from `~/.rigcal/config.toml`.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let contents = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };
        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.rigcal/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".rigcal").join("config.toml"))
    }

    /// Where the store lives: the configured path, else the default location.
    pub fn store_path(&self) -> Result<PathBuf, String> {
        self.store
            .clone()
            .or_else(Storage::default_path)
            .ok_or_else(|| "could not determine home directory; set `store` in the config".into())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
