//! Runtime configuration
//!
//! Read from `<config_dir>/noor/config.json` when present, then overridden by
//! `NOOR_*` environment variables. A missing or unreadable file is not fatal.

use crate::cache::DEFAULT_FETCH_TIMEOUT;
use crate::classifier::UnmarkedItemPolicy;
use crate::fetcher::QURAN_COM_BASE_URL;
use crate::session::{DEFAULT_COMMENTARY_TIMEOUT, DEFAULT_VERSES_PER_PAGE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "noor";
const CONFIG_FILE: &str = "config.json";
const SETTINGS_DB: &str = "settings.db";

/// Where the reader gets chapter text from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSourceKind {
    /// The `noor-api` service at `api_base_url`
    Api,
    /// quran.com directly
    #[default]
    Upstream,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoorConfig {
    pub content_source: ContentSourceKind,
    pub api_base_url: String,
    pub upstream_base_url: String,
    pub fetch_timeout_ms: u64,
    pub commentary_timeout_ms: u64,
    pub verses_per_page: usize,
    pub data_dir: PathBuf,
    /// Replaces the bundled adhkar dataset when set
    pub adhkar_path: Option<PathBuf>,
    pub unmarked_policy: UnmarkedItemPolicy,
    pub api_bind: String,
}

impl Default for NoorConfig {
    fn default() -> Self {
        Self {
            content_source: ContentSourceKind::default(),
            api_base_url: "http://127.0.0.1:3000".to_string(),
            upstream_base_url: QURAN_COM_BASE_URL.to_string(),
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT.as_millis() as u64,
            commentary_timeout_ms: DEFAULT_COMMENTARY_TIMEOUT.as_millis() as u64,
            verses_per_page: DEFAULT_VERSES_PER_PAGE,
            data_dir: default_data_dir(),
            adhkar_path: None,
            unmarked_policy: UnmarkedItemPolicy::default(),
            api_bind: "127.0.0.1:3000".to_string(),
        }
    }
}

/// `<data_dir>/noor`, or `./data` when the platform has no data directory.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

impl NoorConfig {
    /// File (if any) plus environment. Never fails.
    pub fn load() -> Self {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                Self::default()
            }),
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Apply `NOOR_*` overrides. Unparseable values are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parsed<T: std::str::FromStr>(key: &str, raw: String) -> Option<T> {
            let value = raw.trim().parse().ok();
            if value.is_none() {
                tracing::warn!(key, raw = %raw, "ignoring invalid environment override");
            }
            value
        }

        if let Some(raw) = lookup("NOOR_CONTENT_SOURCE") {
            match raw.trim() {
                "api" => self.content_source = ContentSourceKind::Api,
                "upstream" => self.content_source = ContentSourceKind::Upstream,
                _ => tracing::warn!(raw = %raw, "ignoring invalid NOOR_CONTENT_SOURCE"),
            }
        }
        if let Some(url) = lookup("NOOR_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = lookup("NOOR_UPSTREAM_BASE_URL") {
            self.upstream_base_url = url;
        }
        if let Some(ms) = lookup("NOOR_FETCH_TIMEOUT_MS").and_then(|raw| parsed("NOOR_FETCH_TIMEOUT_MS", raw)) {
            self.fetch_timeout_ms = ms;
        }
        if let Some(ms) =
            lookup("NOOR_COMMENTARY_TIMEOUT_MS").and_then(|raw| parsed("NOOR_COMMENTARY_TIMEOUT_MS", raw))
        {
            self.commentary_timeout_ms = ms;
        }
        if let Some(n) = lookup("NOOR_VERSES_PER_PAGE").and_then(|raw| parsed::<usize>("NOOR_VERSES_PER_PAGE", raw)) {
            if n > 0 {
                self.verses_per_page = n;
            }
        }
        if let Some(dir) = lookup("NOOR_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("NOOR_ADHKAR_PATH") {
            self.adhkar_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup("NOOR_UNMARKED_POLICY") {
            match raw.trim() {
                "shared" => self.unmarked_policy = UnmarkedItemPolicy::Shared,
                "drop" => self.unmarked_policy = UnmarkedItemPolicy::Drop,
                _ => tracing::warn!(raw = %raw, "ignoring invalid NOOR_UNMARKED_POLICY"),
            }
        }
        if let Some(bind) = lookup("NOOR_API_BIND") {
            self.api_bind = bind;
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn commentary_timeout(&self) -> Duration {
        Duration::from_millis(self.commentary_timeout_ms)
    }

    /// Settings live alongside other app data and survive reinstalls of the data set.
    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_DB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = NoorConfig::default();
        assert_eq!(config.fetch_timeout(), Duration::from_millis(6000));
        assert_eq!(config.commentary_timeout(), Duration::from_millis(8000));
        assert_eq!(config.verses_per_page, 12);
        assert_eq!(config.unmarked_policy, UnmarkedItemPolicy::Shared);
        assert!(config.settings_db_path().ends_with("settings.db"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"verses_per_page": 10, "unmarked_policy": "drop"}"#).unwrap();

        let config = NoorConfig::load_from(&path).unwrap();
        assert_eq!(config.verses_per_page, 10);
        assert_eq!(config.unmarked_policy, UnmarkedItemPolicy::Drop);
        assert_eq!(config.fetch_timeout_ms, 6000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = NoorConfig {
            content_source: ContentSourceKind::Api,
            ..NoorConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(NoorConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(NoorConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NoorConfig::default();
        config.apply_env(env(&[
            ("NOOR_CONTENT_SOURCE", "api"),
            ("NOOR_FETCH_TIMEOUT_MS", "2500"),
            ("NOOR_VERSES_PER_PAGE", "0"),
            ("NOOR_COMMENTARY_TIMEOUT_MS", "soon"),
            ("NOOR_UNMARKED_POLICY", "drop"),
            ("NOOR_DATA_DIR", "/tmp/noor"),
        ]));

        assert_eq!(config.content_source, ContentSourceKind::Api);
        assert_eq!(config.fetch_timeout_ms, 2500);
        assert_eq!(config.verses_per_page, 12);
        assert_eq!(config.commentary_timeout_ms, 8000);
        assert_eq!(config.unmarked_policy, UnmarkedItemPolicy::Drop);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/noor"));
    }
}
