//! Materializes theme songs on disk.
//!
//! Acquisition is delegated to an [`AudioSource`]. [`ThemeFetcher`] awaits it
//! and then refuses to report success until the file is visible, non-empty,
//! writable and no longer growing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::Instant;

use crate::config::{AudioConfig, Config};
use crate::error::{Error, Result};

/// Something that can turn a source url into audio bytes at `dest`.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn acquire(&self, source_url: &str, dest: &Path) -> Result<()>;
}

pub struct ThemeFetcher {
    source: Arc<dyn AudioSource>,
    timeout: Duration,
    poll: Duration,
}

impl ThemeFetcher {
    pub fn new(source: Arc<dyn AudioSource>, timeout: Duration, poll: Duration) -> Self {
        Self { source, timeout, poll: poll.max(Duration::from_millis(1)) }
    }

    pub fn from_config(source: Arc<dyn AudioSource>, cfg: &Config) -> Self {
        Self::new(source, cfg.fetch_timeout(), cfg.poll_interval())
    }

    /// Acquire `source_url` into `dest` and wait until the file is complete.
    ///
    /// The source writes to a hidden staging file that is renamed over `dest`
    /// only once ready, so a failed fetch leaves any existing asset intact.
    pub async fn fetch(&self, source_url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staging = staging_path(dest);
        let result = async {
            self.source.acquire(source_url, &staging).await?;
            self.wait_until_ready(&staging).await?;
            tokio::fs::rename(&staging, dest).await?;
            Ok(())
        }
        .await;
        remove_staging(&staging).await;
        result
    }

    async fn wait_until_ready(&self, dest: &Path) -> Result<()> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut last_len: Option<u64> = None;
        loop {
            match probe(dest).await {
                Some(len) if last_len == Some(len) => return Ok(()),
                Some(len) => last_len = Some(len),
                None => last_len = None,
            }
            if Instant::now() >= deadline {
                return Err(Error::FetchTimeout { path: dest.to_path_buf(), waited: started.elapsed() });
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// Size of `path` if it exists, is non-empty and can be opened for writing.
async fn probe(path: &Path) -> Option<u64> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() || meta.len() == 0 {
        return None;
    }
    tokio::fs::OpenOptions::new().read(true).write(true).open(path).await.ok()?;
    Some(meta.len())
}

/// Runs an external downloader such as `yt-dlp`.
///
/// Placeholders in the argument template: `{url}`, `{output}` (full
/// destination path) and `{stem}` (destination without extension).
#[derive(Debug, Clone)]
pub struct CommandAudioSource {
    program: String,
    args: Vec<String>,
}

impl CommandAudioSource {
    pub fn new(cfg: &AudioConfig) -> Self {
        Self { program: cfg.program.clone(), args: cfg.args.clone() }
    }

    fn render_args(&self, source_url: &str, dest: &Path) -> Vec<String> {
        let output = dest.to_string_lossy();
        let stem = dest.with_extension("");
        let stem = stem.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{url}", source_url).replace("{output}", &output).replace("{stem}", &stem))
            .collect()
    }
}

#[async_trait]
impl AudioSource for CommandAudioSource {
    async fn acquire(&self, source_url: &str, dest: &Path) -> Result<()> {
        let args = self.render_args(source_url, dest);
        tracing::debug!(program = %self.program, ?args, "running audio downloader");
        let out = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Acquisition(format!("failed to start {}: {e}", self.program)))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail = stderr.lines().last().unwrap_or_default().trim().to_string();
            return Err(Error::Acquisition(format!("{} exited with {}: {tail}", self.program, out.status)));
        }
        Ok(())
    }
}

/// Downloads direct audio urls.
#[derive(Debug, Clone)]
pub struct HttpAudioSource {
    client: reqwest::Client,
}

impl HttpAudioSource {
    pub fn new(client: reqwest::Client) -> Self { Self { client } }
}

#[async_trait]
impl AudioSource for HttpAudioSource {
    async fn acquire(&self, source_url: &str, dest: &Path) -> Result<()> {
        let resp = self
            .client
            .get(source_url)
            .send()
            .await
            .map_err(|e| Error::Acquisition(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Error::Acquisition(format!("{source_url} returned {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(|e| Error::Acquisition(e.to_string()))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }
}

/// `<dir>/.theme.<uuid>.mp3` for `<dir>/theme.mp3`. The extension is kept so
/// downloaders that pick their output format from it still work.
fn staging_path(dest: &Path) -> PathBuf {
    let stem = dest.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = dest.extension().map(|e| e.to_string_lossy().into_owned()).unwrap_or_else(|| "tmp".into());
    dest.with_file_name(format!(".{stem}.{}.{ext}", uuid::Uuid::new_v4().simple()))
}

/// Delete the staging file and any side files a downloader left next to it
/// (`.theme.<uuid>.webm.part`, `.ytdl`, ...). Everything sharing the staging
/// stem belongs to this fetch.
async fn remove_staging(staging: &Path) {
    let (Some(dir), Some(stem)) = (staging.parent(), staging.file_stem()) else { return };
    let stem = stem.to_string_lossy();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else { return };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(stem.as_ref()) {
            if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                tracing::debug!(path = %entry.path().display(), "could not remove staging leftover: {e}");
            }
        }
    }
}
