//! Settings file.
//!
//! A JSON file at `<config dir>/saferequest/config.json`. Every field is
//! optional; a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::engine::EngineKind;
use crate::error::FetchError;

/// Persistent fetch defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Global attempt budget per execute call.
    #[serde(default = "default_max_tries")]
    pub max_tries: usize,
    /// Whether a fully failed chain raises.
    #[serde(default)]
    pub raise_errors: bool,
    /// Lower bound of the pre-attempt jitter, in milliseconds.
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: u64,
    /// Upper bound of the pre-attempt jitter, in milliseconds.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
    /// Engine chain, in order.
    #[serde(default = "default_chain")]
    pub chain: Vec<EngineKind>,
    /// Proxy pool.
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Extra headers applied over the built-in defaults.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Fixed User-Agent.
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_tries() -> usize {
    10
}

fn default_jitter_min_ms() -> u64 {
    1000
}

fn default_jitter_max_ms() -> u64 {
    2000
}

fn default_chain() -> Vec<EngineKind> {
    EngineKind::default_chain().to_vec()
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_tries: default_max_tries(),
            raise_errors: false,
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
            chain: default_chain(),
            proxies: Vec::new(),
            headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}

impl FetchSettings {
    /// Returns the default settings file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("saferequest")
            .join("config.json")
    }

    /// Loads settings from the default path.
    pub fn load() -> Result<Self, FetchError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, FetchError> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: FetchSettings = serde_json::from_str(&content)?;

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Saves settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), FetchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Jitter bounds.
    pub fn jitter(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.jitter_min_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = FetchSettings::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, FetchSettings::default());
        assert_eq!(settings.timeout(), Duration::from_secs(60));
        assert_eq!(settings.max_tries, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_tries": 3, "chain": ["direct_async"]}"#).unwrap();

        let settings = FetchSettings::load_from(&path).unwrap();
        assert_eq!(settings.max_tries, 3);
        assert_eq!(settings.chain, vec![EngineKind::DirectAsync]);
        assert_eq!(settings.jitter_min_ms, 1000);
        assert!(!settings.raise_errors);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut settings = FetchSettings::default();
        settings.proxies = vec!["http://10.0.0.1:3128".to_string()];
        settings.user_agent = Some("agent/1.0".to_string());
        settings.save_to(&path).unwrap();

        assert_eq!(FetchSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FetchSettings::load_from(&path),
            Err(FetchError::Json(_))
        ));
    }

    #[test]
    fn test_unknown_engine_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"chain": ["curl"]}"#).unwrap();
        assert!(FetchSettings::load_from(&path).is_err());
    }
}
