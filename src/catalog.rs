use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{CatalogAnswer, MediaItem, MediaKind};

const ISSUE_BASE: &str = "https://github.com/LizardByte/ThemerrDB/issues/new";

/// Resolves an item to the source url of its theme song.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn resolve_theme_url(&self, item: &MediaItem) -> CatalogAnswer;
}

/// Body of a ThemerrDB entry. Only the theme url matters here.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    youtube_theme_url: Option<String>,
}

/// ThemerrDB over HTTP. The client is shared and safe for concurrent use.
#[derive(Debug, Clone)]
pub struct ThemerrDb {
    client: reqwest::Client,
    base: Url,
}

impl ThemerrDb {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout())
            .build()?;
        Self::with_client(client, &cfg.catalog_base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> anyhow::Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid catalog url: {base_url}"))?;
        Ok(Self { client, base })
    }

    /// `<base>/<movies|tv_shows>/themoviedb/<id>.json`
    pub fn db_link(&self, tmdb_id: &str, category: &str) -> String {
        format!("{}/{}/themoviedb/{}.json", self.base.as_str().trim_end_matches('/'), category, tmdb_id)
    }

    async fn lookup(&self, link: &str) -> Result<Option<String>> {
        let transport = |e: &dyn std::fmt::Display| Error::Transport(format!("{link}: {e}"));
        let resp = self.client.get(link).send().await.map_err(|e| transport(&e))?;
        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            s if !s.is_success() => return Err(transport(&s)),
            _ => {}
        }
        let body = resp.bytes().await.map_err(|e| transport(&e))?;
        let entry: CatalogEntry = serde_json::from_slice(&body).map_err(|e| transport(&e))?;
        Ok(entry.youtube_theme_url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()))
    }
}

#[async_trait]
impl CatalogClient for ThemerrDb {
    async fn resolve_theme_url(&self, item: &MediaItem) -> CatalogAnswer {
        let (Some(tmdb), Some(category)) = (item.tmdb_id(), item.kind.catalog_category()) else {
            return CatalogAnswer::NotFound;
        };
        let link = self.db_link(tmdb, category);
        tracing::debug!(item = %item.id, %link, "querying catalog");

        match self.lookup(&link).await {
            Ok(Some(url)) => CatalogAnswer::Resolved(url),
            Ok(None) => {
                tracing::info!(
                    item = %item.id,
                    "{} has no theme in ThemerrDB; contribute one at {}",
                    item.name,
                    issue_url(item).unwrap_or_default()
                );
                CatalogAnswer::NotFound
            }
            Err(e) => {
                tracing::warn!(
                    item = %item.id,
                    "could not reach ThemerrDB for {}: {e}. If the theme is missing, contribute it at {}",
                    item.name,
                    issue_url(item).unwrap_or_default()
                );
                CatalogAnswer::Transport(e.to_string())
            }
        }
    }
}

/// Link that opens a prefilled "request theme" issue on ThemerrDB.
pub fn issue_url(item: &MediaItem) -> Option<String> {
    let (issue_type, endpoint) = match item.kind {
        MediaKind::Movie => ("MOVIE", "movie"),
        MediaKind::Series => ("TV SHOW", "tv"),
        MediaKind::Unsupported => return None,
    };
    let tmdb = item.tmdb_id()?;
    let year = item.year.map(|y| y.to_string()).unwrap_or_default();
    Some(format!(
        "{ISSUE_BASE}?assignees=&labels=request-theme&template=theme.yml&title=[{issue_type}]:%20{}%20({year})&database_url=https://www.themoviedb.org/{endpoint}/{tmdb}",
        urlencoding::encode(&item.name),
    ))
}
