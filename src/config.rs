use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct R2rConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub srs: SrsConfig,
    /// Per-language external word segmenters, keyed by language tag.
    pub segmenter: HashMap<String, SegmenterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub busy_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SrsConfig {
    pub intervals_secs: Vec<u64>,
    pub unscheduled_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Program followed by its leading arguments; the value is appended last.
    pub command: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_r2r_dir()
            .map(|dir| dir.join("data.db").to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            db_path,
            busy_timeout_ms: 5000,
        }
    }
}

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

impl Default for SrsConfig {
    fn default() -> Self {
        Self {
            intervals_secs: vec![
                4 * HOUR,
                8 * HOUR,
                DAY,
                3 * DAY,
                7 * DAY,
                14 * DAY,
                28 * DAY,
                112 * DAY,
            ],
            unscheduled_secs: HOUR,
        }
    }
}

impl SrsConfig {
    pub fn intervals(&self) -> Vec<Duration> {
        self.intervals_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }

    pub fn unscheduled(&self) -> Duration {
        Duration::from_secs(self.unscheduled_secs)
    }
}

/// Returns `~/.r2r/`, or `None` when no home directory can be determined.
pub fn default_r2r_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".r2r"))
}

/// Returns the default config file path: `~/.r2r/config.toml`
pub fn default_config_path() -> Result<PathBuf> {
    default_r2r_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or_else(|| Error::ConfigurationMissing("home directory".into()))
}

impl R2rConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path()?)
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| Error::InvalidConfiguration(format!("{}: {e}", path.display())))?
        } else {
            info!("no config file at {}, using defaults", path.display());
            R2rConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (R2R_DB, R2R_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("R2R_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("R2R_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        if self.storage.db_path.trim().is_empty() {
            return Err(Error::ConfigurationMissing("storage.db_path".into()));
        }
        expand_tilde(&self.storage.db_path)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }
}

pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or_else(|| Error::ConfigurationMissing("home directory".into()))
    } else {
        Ok(PathBuf::from(path))
    }
}
