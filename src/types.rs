use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// File name of the managed theme song inside an item's directory.
pub const THEME_FILE_NAME: &str = "theme.mp3";
/// File name of the provenance sidecar written next to the theme song.
pub const RECORD_FILE_NAME: &str = "themerr.json";

/// Provider key for The Movie Database ids.
pub const TMDB: &str = "Tmdb";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Series,
    #[serde(other)]
    Unsupported,
}

impl MediaKind {
    /// ThemerrDB database segment for this kind.
    pub fn catalog_category(&self) -> Option<&'static str> {
        match self {
            MediaKind::Movie => Some("movies"),
            MediaKind::Series => Some("tv_shows"),
            MediaKind::Unsupported => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Series => "series",
            MediaKind::Unsupported => "unsupported",
        }
    }
}

/// External ids keyed by provider name. Lookups ignore ASCII case so
/// `Tmdb`, `tmdb` and `TMDB` all resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderIds(HashMap<String, String>);

impl ProviderIds {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, provider: &str, id: &str) -> Self {
        self.0.insert(provider.to_string(), id.to_string());
        self
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(provider))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl FromIterator<(String, String)> for ProviderIds {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An item owned by the host library. The core only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    pub kind: MediaKind,
    #[serde(default)]
    pub provider_ids: ProviderIds,
    pub path: PathBuf,
}

impl MediaItem {
    pub fn tmdb_id(&self) -> Option<&str> { self.provider_ids.get(TMDB) }

    /// Eligible when the kind is supported and a TMDB id is present.
    pub fn is_eligible(&self) -> bool {
        self.kind != MediaKind::Unsupported && self.tmdb_id().is_some()
    }

    pub fn theme_path(&self) -> PathBuf { theme_path(&self.path) }

    pub fn record_path(&self) -> PathBuf { record_path(&self.path) }
}

pub fn theme_path(dir: &Path) -> PathBuf { dir.join(THEME_FILE_NAME) }

pub fn record_path(dir: &Path) -> PathBuf { dir.join(RECORD_FILE_NAME) }

/// What the catalog said about an item during this pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogAnswer {
    Resolved(String),
    NotFound,
    Transport(String),
}

impl CatalogAnswer {
    /// The usable source url, if any. Misses and transport failures both
    /// count as "no answer" for decisions.
    pub fn url(&self) -> Option<&str> {
        match self {
            CatalogAnswer::Resolved(u) => Some(u.as_str()),
            _ => None,
        }
    }
}
