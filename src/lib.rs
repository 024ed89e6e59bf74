pub mod catalog;
pub mod config;
pub mod decision;
pub mod error;
pub mod fetcher;
pub mod library;
pub mod progress;
pub mod provenance;
pub mod reconcile;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod test_http;

pub use error::{Error, Result};

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::catalog::{CatalogClient, ThemerrDb};
    pub use crate::config::Config;
    pub use crate::decision::{Decision, SkipReason};
    pub use crate::fetcher::{AudioSource, CommandAudioSource, HttpAudioSource, ThemeFetcher};
    pub use crate::library::{Library, ManifestLibrary, StaticLibrary};
    pub use crate::progress::{LibraryProgress, ThemeProvider};
    pub use crate::reconcile::{BatchReport, ItemOutcome, ItemReport, Reconciler};
    pub use crate::types::{CatalogAnswer, MediaItem, MediaKind, ProviderIds};
    pub use crate::Themerr;
}

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::library::Library;
use crate::progress::LibraryProgress;
use crate::reconcile::{BatchReport, Reconciler};

/// Async library entry point. Owns the configuration and a reconciler wired
/// to ThemerrDB and the configured downloader. Starts no background tasks
/// until [`Themerr::watch`] is called.
pub struct Themerr {
    config: Config,
    reconciler: Reconciler,
}

impl Themerr {
    pub fn new(config: Config, library: Arc<dyn Library>) -> anyhow::Result<Self> {
        let reconciler = Reconciler::from_config(&config, library)?;
        Ok(Self { config, reconciler })
    }

    /// Use an already-assembled reconciler (custom catalog or audio source).
    pub fn with_reconciler(config: Config, reconciler: Reconciler) -> Self {
        Self { config, reconciler }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn reconciler(&self) -> &Reconciler { &self.reconciler }

    /// One reconciliation pass over the whole library.
    pub async fn run_once(&self, cancel: &CancellationToken) -> anyhow::Result<BatchReport> {
        self.reconciler.reconcile_all(cancel).await
    }

    /// Run now and then every configured interval until cancelled.
    pub async fn watch(&self, cancel: CancellationToken) -> usize {
        scheduler::run_periodic(&self.reconciler, self.config.update_period(), cancel).await
    }

    pub async fn progress(&self, page: usize) -> anyhow::Result<LibraryProgress> {
        self.reconciler.progress(page).await
    }
}
