//! Ingestion scheduler
//!
//! Single long-lived state machine: Bootstrap -> Draining -> Sleeping ->
//! Draining -> ... until cancelled, then ShuttingDown (finalize) ->
//! Terminated. Fetches execute strictly sequentially, bounding upstream
//! request concurrency to one.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, StalePeriod};
use crate::db::CatalogStore;
use crate::jobs::{fetch, queue};
use crate::services::catalog::{CatalogDelta, CatalogDeltaEntry, CatalogSource};

/// Sleep granularity during the stale-refresh wait, so cancellation is
/// observed hourly rather than only at the end of a full period.
const SLEEP_SUB_INTERVAL: Duration = Duration::from_secs(3600);

/// Substitute sleep for the test-only `none` period.
const NONE_PERIOD_SLEEP: Duration = Duration::from_secs(1);

/// The ingestion worker root. Owns the lifecycle of pending fetch rows.
pub struct IngestScheduler {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CatalogStore>,
    batch_limit: usize,
    stale_period: StalePeriod,
    cancel: CancellationToken,
}

impl IngestScheduler {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        store: Arc<dyn CatalogStore>,
        config: &Config,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            store,
            batch_limit: config.fetch_batch_limit,
            stale_period: config.stale_refresh_period,
            cancel,
        }
    }

    /// Run until cancelled. Shutdown finalization always runs, whether the
    /// worker was cancelled before any work or mid-drain.
    pub async fn run(self) {
        let mut outstanding: Vec<i64> = Vec::new();

        self.run_phases(&mut outstanding).await;

        if self.cancel.is_cancelled() {
            warn!("Ingestion cancelled");
        }
        self.finalize(&outstanding).await;
        info!("Ingestion worker terminated");
    }

    async fn run_phases(&self, outstanding: &mut Vec<i64>) {
        // Were we already cancelled?
        if self.cancel.is_cancelled() {
            return;
        }

        // Bootstrap: catch up against the full catalog.
        let delta = self.load_catalog(None).await;
        self.drain_cycle(&delta, outstanding).await;
        if self.cancel.is_cancelled() {
            return;
        }
        info!("No more shows to ingest, checking stale shows");

        while !self.cancel.is_cancelled() {
            info!(period = %self.stale_period, "Processing stale shows");
            let delta = self.load_catalog(Some(self.stale_period)).await;
            let executed = self.drain_cycle(&delta, outstanding).await;
            if self.cancel.is_cancelled() {
                return;
            }

            if executed > 0 {
                info!(period = %self.stale_period, "Stale shows processed, sleeping");
            } else {
                info!(period = %self.stale_period, "No stale shows found, sleeping");
            }
            self.sleep_period().await;
        }
    }

    /// One ingestion pass: reconcile the delta into the work queue, then
    /// drain the queue in first-enqueued order, repeating until a drain pops
    /// nothing and the latest reconcile created nothing.
    ///
    /// Ids already attempted in this pass are excluded from re-reconciliation,
    /// so an id whose fetch was evicted is tried once per pass rather than
    /// retried forever. Returns the number of work items executed.
    pub async fn drain_cycle(&self, delta: &CatalogDelta, outstanding: &mut Vec<i64>) -> usize {
        let mut attempted: HashSet<i64> = HashSet::new();
        let mut executed = 0;

        loop {
            if self.cancel.is_cancelled() {
                return executed;
            }

            let remaining: Vec<CatalogDeltaEntry> = delta
                .entries()
                .iter()
                .filter(|entry| !attempted.contains(&entry.show_id))
                .copied()
                .collect();

            let created =
                match queue::reconcile(self.store.as_ref(), &remaining, self.batch_limit).await {
                    Ok(created) => created,
                    Err(e) => {
                        error!(error = %e, "Work queue reconciliation failed");
                        0
                    }
                };

            let mut drained = 0;
            loop {
                if self.cancel.is_cancelled() {
                    return executed;
                }

                let batch = match self.store.next_pending(self.batch_limit as i64).await {
                    Ok(batch) => batch,
                    Err(e) => {
                        error!(error = %e, "Failed to read work queue");
                        Vec::new()
                    }
                };
                if batch.is_empty() {
                    break;
                }

                *outstanding = batch.iter().map(|item| item.show_id).collect();
                for item in &batch {
                    // No new item starts once cancellation is observed; the
                    // rest of the batch stays in the working set for finalize.
                    if self.cancel.is_cancelled() {
                        return executed;
                    }

                    attempted.insert(item.show_id);
                    fetch::execute(self.source.as_ref(), self.store.as_ref(), item).await;
                    executed += 1;
                    drained += 1;
                    outstanding.retain(|id| *id != item.show_id);
                }
            }
            outstanding.clear();

            if created == 0 && drained == 0 {
                return executed;
            }
        }
    }

    /// Fetch a catalog delta, treating any upstream failure as an empty delta.
    async fn load_catalog(&self, since: Option<StalePeriod>) -> CatalogDelta {
        match self.source.show_updates(since).await {
            Ok(delta) => delta,
            Err(e) => {
                error!(error = %e, "Catalog service responded with error, treating delta as empty");
                CatalogDelta::default()
            }
        }
    }

    /// Sleep for the configured stale period in hourly sub-intervals.
    async fn sleep_period(&self) {
        match self.stale_period.sleep_hours() {
            None => {
                warn!("Stale refresh period 'none' is for testing only, sleeping briefly");
                self.cancellable_sleep(NONE_PERIOD_SLEEP).await;
            }
            Some(hours) => {
                for _ in 0..hours {
                    if !self.cancellable_sleep(SLEEP_SUB_INTERVAL).await {
                        return;
                    }
                }
            }
        }
    }

    /// Sleeps unless cancelled first; returns false when cancelled.
    async fn cancellable_sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Shutdown finalization: bulk-remove any work items still tracked in the
    /// working set, in one committed statement.
    async fn finalize(&self, outstanding: &[i64]) {
        if outstanding.is_empty() {
            return;
        }

        match self.store.remove_pending_batch(outstanding).await {
            Ok(removed) => {
                info!(removed, "Removed outstanding pending fetches at shutdown");
            }
            Err(e) => {
                error!(error = %e, "Failed to remove outstanding pending fetches at shutdown");
            }
        }
    }
}
