use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::reconcile::Reconciler;

/// Run a batch now and then every `period` until `cancel` fires. Runs never
/// overlap: a slow batch delays the next tick instead of stacking up.
/// Returns how many batches ran. A zero `period` is treated as 1ms.
pub async fn run_periodic(reconciler: &Reconciler, period: Duration, cancel: CancellationToken) -> usize {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        if let Err(e) = reconciler.reconcile_all(&cancel).await {
            warn!("theme update run failed: {e:#}");
        }
        runs += 1;
        if !cancel.is_cancelled() {
            info!(next_in = ?period, "waiting for next theme update");
        }
    }
    runs
}
