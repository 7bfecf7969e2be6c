//! Work queue manager
//!
//! Computes the delta between the upstream catalog's known-updated shows and
//! the local store's shows plus already-pending fetches, and materializes new
//! work items for the difference.

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info};

use crate::db::CatalogStore;
use crate::services::catalog::CatalogDeltaEntry;

/// Enqueue fetches for catalog entries with no local show and no pending
/// fetch, up to `limit`, in the order the upstream reported them.
///
/// Each insert is committed on its own, so a crash mid-reconciliation loses
/// nothing: the candidate derivation is idempotent and the next run picks up
/// where this one stopped. Calling this twice with the same delta and no
/// intervening executor activity creates nothing the second time.
pub async fn reconcile(
    store: &dyn CatalogStore,
    delta: &[CatalogDeltaEntry],
    limit: usize,
) -> Result<usize> {
    if delta.is_empty() {
        return Ok(0);
    }

    let existing: HashSet<i64> = store.show_ids().await?.into_iter().collect();
    let pending: HashSet<i64> = store.pending_ids().await?.into_iter().collect();

    let candidates = delta
        .iter()
        .map(|entry| entry.show_id)
        .filter(|id| !existing.contains(id) && !pending.contains(id))
        .take(limit);

    let mut created = 0;
    for show_id in candidates {
        // The id is the dedup key; a concurrent duplicate simply reports
        // not-inserted.
        if store.enqueue_pending(show_id).await? {
            debug!(show_id, "Enqueued pending fetch");
            created += 1;
        }
    }

    if created > 0 {
        info!(created, "Reconciled catalog delta into work queue");
    }

    Ok(created)
}
