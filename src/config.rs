use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default location of the bundled snapshot.
pub const DEFAULT_SNAPSHOT: &str = "data/earthquakes_snapshot.csv";

/// USGS summary feed: all events from the past 30 days, CSV.
pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_month.csv";

const CONFIG_FILE: &str = "quakescope.json";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Runtime settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub snapshot_path: PathBuf,
    pub live_feed_url: String,
    pub http_timeout_secs: u64,
    pub table_page_size: usize,
    pub top_regions: usize,
    pub histogram_bins: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT),
            live_feed_url: DEFAULT_FEED_URL.to_string(),
            http_timeout_secs: 15,
            table_page_size: 12,
            top_regions: 6,
            histogram_bins: 30,
        }
    }
}

impl Config {
    /// Defaults, then `quakescope.json` (or `$QUAKESCOPE_CONFIG`), then
    /// environment overrides. A broken config file is logged and skipped.
    pub fn resolve() -> Self {
        let path = std::env::var_os("QUAKESCOPE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        let mut config = if path.exists() {
            match Self::from_file(&path) {
                Ok(c) => {
                    log::info!("Loaded config from {}", path.display());
                    c
                }
                Err(e) => {
                    log::warn!("Ignoring config {}: {e:#}", path.display());
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).context("reading config file")?;
        serde_json::from_str(&text).context("parsing config JSON")
    }

    /// Apply `QUAKESCOPE_SNAPSHOT` / `QUAKESCOPE_FEED_URL` overrides.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(snapshot) = lookup("QUAKESCOPE_SNAPSHOT").filter(|s| !s.is_empty()) {
            self.snapshot_path = PathBuf::from(snapshot);
        }
        if let Some(url) = lookup("QUAKESCOPE_FEED_URL").filter(|s| !s.is_empty()) {
            self.live_feed_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"table_page_size": 25}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.table_page_size, 25);
        assert_eq!(config.snapshot_path, PathBuf::from(DEFAULT_SNAPSHOT));
        assert_eq!(config.top_regions, 6);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn env_overrides_win() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            "QUAKESCOPE_SNAPSHOT" => Some("/tmp/quakes.parquet".to_string()),
            "QUAKESCOPE_FEED_URL" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/quakes.parquet"));
        assert_eq!(config.live_feed_url, DEFAULT_FEED_URL);
    }
}
