use anyhow::Result;
use serde::Serialize;
use uuid::Uuid;

use crate::catalog::issue_url;
use crate::library::Library;
use crate::provenance;
use crate::types::{MediaItem, MediaKind};

pub const ITEMS_PER_PAGE: usize = 50;

/// Who put the theme song on disk, as far as the files can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeProvider {
    Themerr,
    User,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressItem {
    pub id: Uuid,
    pub title: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub issue_url: Option<String>,
    pub theme_provider: ThemeProvider,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryProgress {
    pub media_count: usize,
    pub media_with_themes: usize,
    pub total_pages: usize,
    pub items: Vec<ProgressItem>,
}

/// Agrees with the reconciler: an unreadable record counts as no record, so
/// its asset is the user's.
pub async fn theme_provider(item: &MediaItem) -> ThemeProvider {
    if !tokio::fs::try_exists(item.theme_path()).await.unwrap_or(false) {
        return ThemeProvider::None;
    }
    match provenance::read_record(&item.record_path()).await {
        Some(_) => ThemeProvider::Themerr,
        None => ThemeProvider::User,
    }
}

/// Page `page` (1-based; 0 is read as 1) of the eligible items. Touches only
/// the filesystem. Counts cover the whole library, not just the page.
pub async fn library_progress(library: &dyn Library, page: usize) -> Result<LibraryProgress> {
    let items: Vec<MediaItem> = library.list_items().await?.into_iter().filter(MediaItem::is_eligible).collect();

    let mut providers = Vec::with_capacity(items.len());
    for item in &items {
        providers.push(theme_provider(item).await);
    }

    let media_count = items.len();
    let media_with_themes = providers.iter().filter(|p| **p != ThemeProvider::None).count();
    let total_pages = media_count.div_ceil(ITEMS_PER_PAGE);
    let start = page.max(1).saturating_sub(1).saturating_mul(ITEMS_PER_PAGE);

    let items = items
        .iter()
        .zip(providers)
        .skip(start)
        .take(ITEMS_PER_PAGE)
        .map(|(item, theme_provider)| ProgressItem {
            id: item.id,
            title: item.name.clone(),
            year: item.year,
            kind: item.kind,
            issue_url: issue_url(item),
            theme_provider,
        })
        .collect();

    Ok(LibraryProgress { media_count, media_with_themes, total_pages, items })
}
