//! Client configuration.
//!
//! Stored as JSON at `<config dir>/plaza/config.json`. Environment variables
//! `PLAZA_LATENCY_MS` and `PLAZA_DATA_DIR` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sync::OverlapPolicy;
use crate::util::normalize_text_option;
use crate::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "plaza";
const MAX_LATENCY_MS: u64 = 30_000;

pub const LATENCY_ENV: &str = "PLAZA_LATENCY_MS";
pub const DATA_DIR_ENV: &str = "PLAZA_DATA_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    /// Artificial latency of the mock gateway
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Where durable client state (session, downloads) lives
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// How overlapping mutations on one record are resolved
    #[serde(default)]
    pub overlap: OverlapPolicy,
    /// Email pre-filled by `login`
    #[serde(default)]
    pub default_email: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: default_config_version(),
            latency_ms: default_latency_ms(),
            data_dir: None,
            overlap: OverlapPolicy::default(),
            default_email: None,
        }
    }
}

const fn default_config_version() -> u32 {
    1
}

const fn default_latency_ms() -> u64 {
    400
}

pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| Error::Config("Failed to resolve config directory".to_string()))
}

pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| Error::Config("Failed to resolve data directory".to_string()))
}

impl ClientConfig {
    /// Load from `path`, or defaults when the file does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!(
                "Failed to read config at {}: {}",
                path.display(),
                error
            ))
        })?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                error
            ))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    /// Apply `PLAZA_LATENCY_MS` / `PLAZA_DATA_DIR` from the environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(LATENCY_ENV).ok(),
            std::env::var(DATA_DIR_ENV).ok(),
        )
    }

    pub fn apply_overrides(
        &mut self,
        latency_ms: Option<String>,
        data_dir: Option<String>,
    ) -> Result<()> {
        if let Some(raw) = normalize_text_option(latency_ms) {
            self.latency_ms = raw.parse().map_err(|_| {
                Error::Config(format!("{LATENCY_ENV} must be a whole number, got '{raw}'"))
            })?;
        }
        if let Some(dir) = normalize_text_option(data_dir) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self.validate()
    }

    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    /// Configured data directory, falling back to the platform default.
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    fn normalize(&mut self) {
        self.default_email = normalize_text_option(self.default_email.take());
        if self
            .data_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            self.data_dir = None;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.latency_ms > MAX_LATENCY_MS {
            return Err(Error::Config(format!(
                "latency_ms must be at most {MAX_LATENCY_MS}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from_path(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.latency(), Duration::from_millis(400));
    }

    #[test]
    fn save_and_load_roundtrip_normalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plaza").join("config.json");
        let config = ClientConfig {
            latency_ms: 50,
            overlap: OverlapPolicy::SerializePerRecord,
            default_email: Some("  ada@example.com ".to_string()),
            ..ClientConfig::default()
        };

        config.save_to_path(&path).unwrap();
        let loaded = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.latency_ms, 50);
        assert_eq!(loaded.overlap, OverlapPolicy::SerializePerRecord);
        assert_eq!(loaded.default_email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"overlap": "serialize_per_record"}"#).unwrap();

        let loaded = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.latency_ms, 400);
        assert_eq!(loaded.overlap, OverlapPolicy::SerializePerRecord);
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = ClientConfig::default();
        config
            .apply_overrides(Some(" 25 ".to_string()), Some("/tmp/plaza".to_string()))
            .unwrap();
        assert_eq!(config.latency_ms, 25);
        assert_eq!(config.resolved_data_dir().unwrap(), PathBuf::from("/tmp/plaza"));
    }

    #[test]
    fn overrides_reject_bad_latency() {
        let mut config = ClientConfig::default();
        assert!(config
            .apply_overrides(Some("fast".to_string()), None)
            .is_err());
        assert!(config
            .apply_overrides(Some("999999".to_string()), None)
            .is_err());
    }
}
