//! Batch orchestration: walk the library, decide per item, act, report.

use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogClient, ThemerrDb};
use crate::config::Config;
use crate::decision::{decide, Decision, SkipReason};
use crate::fetcher::{CommandAudioSource, ThemeFetcher};
use crate::library::Library;
use crate::progress::{self, LibraryProgress};
use crate::provenance::{self, ProvenanceRecord};
use crate::types::MediaItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Skipped { reason: SkipReason },
    /// Theme fetched and provenance written.
    Recorded { source_url: String },
    Failed { error: String },
    /// The batch was cancelled before this item started.
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub id: Uuid,
    pub name: String,
    /// A stale record was removed during this run.
    pub purged: bool,
    pub outcome: ItemOutcome,
}

impl ItemReport {
    fn new(item: &MediaItem, outcome: ItemOutcome) -> Self {
        Self { id: item.id, name: item.name.clone(), purged: false, outcome }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    fn count(&self, f: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|r| f(&r.outcome)).count()
    }

    pub fn recorded(&self) -> usize { self.count(|o| matches!(o, ItemOutcome::Recorded { .. })) }
    pub fn skipped(&self) -> usize { self.count(|o| matches!(o, ItemOutcome::Skipped { .. })) }
    pub fn failed(&self) -> usize { self.count(|o| matches!(o, ItemOutcome::Failed { .. })) }
    pub fn cancelled(&self) -> usize { self.count(|o| matches!(o, ItemOutcome::Cancelled)) }

    pub fn get(&self, id: Uuid) -> Option<&ItemReport> { self.items.iter().find(|r| r.id == id) }
}

/// Owns the collaborators and applies the decision rules to every eligible
/// item of the library.
pub struct Reconciler {
    library: Arc<dyn Library>,
    catalog: Arc<dyn CatalogClient>,
    fetcher: ThemeFetcher,
    max_concurrency: usize,
}

impl Reconciler {
    pub fn new(library: Arc<dyn Library>, catalog: Arc<dyn CatalogClient>, fetcher: ThemeFetcher) -> Self {
        Self { library, catalog, fetcher, max_concurrency: 1 }
    }

    /// Production wiring: ThemerrDB over HTTP and the configured downloader.
    pub fn from_config(cfg: &Config, library: Arc<dyn Library>) -> Result<Self> {
        let catalog = Arc::new(ThemerrDb::new(cfg)?);
        let source = Arc::new(CommandAudioSource::new(&cfg.audio));
        let fetcher = ThemeFetcher::from_config(source, cfg);
        Ok(Self::new(library, catalog, fetcher).with_max_concurrency(cfg.max_concurrency))
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    pub fn library(&self) -> &dyn Library { self.library.as_ref() }

    /// Reconcile every eligible item. Only failing to list the library is an
    /// error; per-item failures end up in the report.
    pub async fn reconcile_all(&self, cancel: &CancellationToken) -> Result<BatchReport> {
        let items: Vec<MediaItem> = self
            .library
            .list_items()
            .await?
            .into_iter()
            .filter(|item| {
                let ok = item.is_eligible();
                if !ok {
                    debug!(item = %item.id, kind = item.kind.as_str(), "skipping ineligible item {}", item.name);
                }
                ok
            })
            .collect();
        info!(count = items.len(), "reconciling theme songs");

        let items: Vec<ItemReport> = stream::iter(items.iter())
            .map(|item| async move {
                if cancel.is_cancelled() {
                    return ItemReport::new(item, ItemOutcome::Cancelled);
                }
                self.reconcile_item(item).await
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let report = BatchReport { items };
        info!(
            recorded = report.recorded(),
            skipped = report.skipped(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            "reconciliation finished"
        );
        Ok(report)
    }

    /// Reconcile a single item. Never panics or propagates: failures are
    /// logged with the item's id and title and returned as
    /// [`ItemOutcome::Failed`].
    pub async fn reconcile_item(&self, item: &MediaItem) -> ItemReport {
        let mut report = ItemReport::new(item, ItemOutcome::Cancelled);
        report.outcome = match self.run_item(item, &mut report.purged).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(item = %item.id, "failed to reconcile theme for {}: {e}", item.name);
                ItemOutcome::Failed { error: e.to_string() }
            }
        };
        report
    }

    async fn run_item(&self, item: &MediaItem, purged: &mut bool) -> crate::Result<ItemOutcome> {
        let asset = item.theme_path();
        let record = item.record_path();
        let local = provenance::inspect(&asset, &record).await?;
        let answer = self.catalog.resolve_theme_url(item).await;
        let decision = decide(&local, answer.url(), local.source_url.as_deref());
        debug!(item = %item.id, ?local, ?answer, ?decision, "decided for {}", item.name);

        match decision {
            Decision::Skip(reason) => return Ok(ItemOutcome::Skipped { reason }),
            Decision::PurgeThenFetch => {
                provenance::purge(&record).await?;
                *purged = true;
                info!(item = %item.id, "removed stale theme record for {}", item.name);
            }
            Decision::Fetch => {}
        }

        let Some(source_url) = answer.url() else {
            return Ok(ItemOutcome::Skipped { reason: SkipReason::NoTheme });
        };

        self.fetcher.fetch(source_url, &asset).await?;
        let fingerprint = provenance::fingerprint(&asset).await?;
        provenance::write_record(&record, &ProvenanceRecord::new(source_url, fingerprint)).await?;
        info!(item = %item.id, url = source_url, "theme song saved for {}", item.name);
        self.library.notify_metadata_changed(item);
        Ok(ItemOutcome::Recorded { source_url: source_url.to_string() })
    }

    /// One page of the read-only library overview.
    pub async fn progress(&self, page: usize) -> Result<LibraryProgress> {
        progress::library_progress(self.library.as_ref(), page).await
    }
}
