use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CATALOG_URL: &str = "https://app.lizardbyte.dev/ThemerrDB";
/// Minutes. Scheduled runs are never closer together than this.
pub const MIN_UPDATE_INTERVAL: u64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_base_url: String,
    /// Minutes between scheduled runs; clamped to [`MIN_UPDATE_INTERVAL`].
    update_interval: u64,
    pub fetch_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub request_timeout_secs: u64,
    pub max_concurrency: usize,
    pub user_agent: String,
    pub audio: AudioConfig,
}

/// External downloader invocation. `{url}`, `{output}` and `{stem}` in
/// `args` are substituted per fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
            args: ["--no-playlist", "-x", "--audio-format", "mp3", "--force-overwrites", "-o", "{stem}.%(ext)s", "{url}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_base_url: DEFAULT_CATALOG_URL.to_string(),
            update_interval: 60,
            fetch_timeout_secs: 30,
            poll_interval_ms: 250,
            request_timeout_secs: 15,
            max_concurrency: 1,
            user_agent: format!("themerr/{}", env!("CARGO_PKG_VERSION")),
            audio: AudioConfig::default(),
        }
    }
}

impl Config {
    /// Load from `path`, or the per-user config file if it exists, or
    /// defaults. Environment overrides apply last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };
        let mut cfg = match file {
            Some(p) => {
                let raw = std::fs::read_to_string(&p)
                    .with_context(|| format!("reading config: {}", p.display()))?;
                Self::from_toml(&raw).with_context(|| format!("parsing config: {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let mut cfg: Config = toml::from_str(raw)?;
        cfg.set_update_interval(cfg.update_interval);
        if cfg.max_concurrency == 0 {
            cfg.max_concurrency = 1;
        }
        url::Url::parse(&cfg.catalog_base_url)
            .with_context(|| format!("invalid catalog_base_url: {}", cfg.catalog_base_url))?;
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(mins) = std::env::var("THEMERR_UPDATE_INTERVAL").ok().and_then(|s| s.parse().ok()) {
            self.set_update_interval(mins);
        }
        if let Ok(url) = std::env::var("THEMERR_CATALOG_URL") {
            if !url.trim().is_empty() { self.catalog_base_url = url.trim().to_string(); }
        }
    }

    pub fn update_interval(&self) -> u64 { self.update_interval }

    pub fn set_update_interval(&mut self, minutes: u64) {
        self.update_interval = minutes.max(MIN_UPDATE_INTERVAL);
    }

    pub fn update_period(&self) -> Duration { Duration::from_secs(self.update_interval * 60) }

    pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms.max(1)) }

    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "lizardbyte", "themerr").map(|p| p.config_dir().join("config.toml"))
}
