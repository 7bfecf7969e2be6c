//! Fetch executor
//!
//! Retrieves show and cast detail for one queued work item and persists the
//! results. Failures never propagate: an unrecoverable fetch evicts the item
//! (and any partially-written show) so the drain loop always moves on.

use tracing::{error, info, warn};

use crate::db::{CastMemberRecord, CatalogStore, PendingFetchRecord, UpsertShow};
use crate::services::catalog::{CatalogError, CatalogSource};

/// Terminal outcome of executing one work item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Show persisted (cast optional) and the work item retired.
    Completed,
    /// Unrecoverable failure: show row (if any) deleted, work item retired.
    Evicted,
}

/// Execute one pending fetch. Every terminal path retires the work item.
pub async fn execute(
    source: &dyn CatalogSource,
    store: &dyn CatalogStore,
    item: &PendingFetchRecord,
) -> FetchOutcome {
    let show_id = item.show_id;

    let detail = match source.show_detail(show_id).await {
        Ok(detail) => detail,
        Err(e) => {
            return evict(store, show_id, &e).await;
        }
    };

    let show = UpsertShow {
        id: show_id,
        name: detail.name,
    };
    if let Err(e) = store.upsert_show(&show).await {
        error!(show_id, error = %e, "Failed to persist show, evicting work item");
        retire(store, show_id).await;
        return FetchOutcome::Evicted;
    }

    match source.show_cast(show_id).await {
        Ok(cast) => {
            for (position, entry) in cast.iter().enumerate() {
                let member = CastMemberRecord {
                    id: entry.person.id,
                    name: entry.person.name.clone(),
                    birthday: entry.person.birthday_date(),
                };
                if let Err(e) = store.upsert_cast_member(&member).await {
                    error!(show_id, person_id = member.id, error = %e, "Failed to persist cast member");
                    continue;
                }
                if let Err(e) = store
                    .link_cast_member(show_id, member.id, position as i32)
                    .await
                {
                    error!(show_id, person_id = member.id, error = %e, "Failed to link cast member");
                }
            }
        }
        Err(e) => {
            // The show itself is fine; cast is best-effort.
            warn!(show_id, error = %e, "Cast fetch failed, keeping show without cast");
        }
    }

    retire(store, show_id).await;
    info!(show_id, name = %show.name, "Show ingested");
    FetchOutcome::Completed
}

/// Unrecoverable detail failure: drop the show row (if any) and the work item.
async fn evict(store: &dyn CatalogStore, show_id: i64, cause: &CatalogError) -> FetchOutcome {
    error!(show_id, error = %cause, "Show fetch unrecoverable, evicting");

    if let Err(e) = store.remove_show(show_id).await {
        error!(show_id, error = %e, "Failed to remove show during eviction");
    }
    retire(store, show_id).await;

    FetchOutcome::Evicted
}

async fn retire(store: &dyn CatalogStore, show_id: i64) {
    if let Err(e) = store.remove_pending(show_id).await {
        error!(show_id, error = %e, "Failed to remove pending fetch");
    }
}
