use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::types::MediaItem;

/// The host media library, seen from the reconciler.
#[async_trait]
pub trait Library: Send + Sync {
    /// Every candidate item. Eligibility is filtered by the caller.
    async fn list_items(&self) -> Result<Vec<MediaItem>>;

    /// Ask the host to rescan an item's metadata. Fire-and-forget.
    fn notify_metadata_changed(&self, item: &MediaItem);
}

/// Items listed in a JSON manifest file, relative paths resolved against
/// the manifest's directory.
#[derive(Debug, Clone)]
pub struct ManifestLibrary {
    path: PathBuf,
}

impl ManifestLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }
}

#[async_trait]
impl Library for ManifestLibrary {
    async fn list_items(&self) -> Result<Vec<MediaItem>> {
        let raw = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading library manifest: {}", self.path.display()))?;
        let mut items: Vec<MediaItem> = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing library manifest: {}", self.path.display()))?;
        let root = self.path.parent().unwrap_or_else(|| Path::new("."));
        for item in &mut items {
            if item.path.is_relative() {
                item.path = root.join(&item.path);
            }
        }
        Ok(items)
    }

    fn notify_metadata_changed(&self, item: &MediaItem) {
        // A manifest has no host to poke; log so an operator can rescan.
        tracing::info!(item = %item.id, "theme updated for {}; refresh its metadata in the host library", item.name);
    }
}

/// In-memory library for embedding and tests. Remembers which items it was
/// asked to refresh.
#[derive(Debug, Default)]
pub struct StaticLibrary {
    items: Vec<MediaItem>,
    refreshed: Mutex<Vec<Uuid>>,
}

impl StaticLibrary {
    pub fn new(items: Vec<MediaItem>) -> Self { Self { items, refreshed: Mutex::new(Vec::new()) } }

    pub fn refreshed(&self) -> Vec<Uuid> {
        self.refreshed.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Library for StaticLibrary {
    async fn list_items(&self) -> Result<Vec<MediaItem>> { Ok(self.items.clone()) }

    fn notify_metadata_changed(&self, item: &MediaItem) {
        if let Ok(mut v) = self.refreshed.lock() {
            v.push(item.id);
        }
    }
}
