//! Pending fetch queue repository
//!
//! A pending fetch is a durable marker that a show id has been selected for
//! fetching but not yet completed. The show id is the primary key, so at most
//! one row per show can exist.

use anyhow::Result;
use sqlx::PgPool;

/// A queued fetch work item
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingFetchRecord {
    pub show_id: i64,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
}

pub struct PendingFetchRepository {
    pool: PgPool,
}

impl PendingFetchRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue a fetch for a show. Returns false when one was already queued.
    pub async fn add(&self, show_id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO pending_fetches (show_id, enqueued_at)
            VALUES ($1, NOW())
            ON CONFLICT (show_id) DO NOTHING
            "#,
        )
        .bind(show_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All queued show ids
    pub async fn ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT show_id FROM pending_fetches")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Up to `limit` work items in first-enqueued order.
    ///
    /// Items stay queued until explicitly removed, so a crash between take
    /// and completion loses nothing.
    pub async fn take(&self, limit: i64) -> Result<Vec<PendingFetchRecord>> {
        let items = sqlx::query_as::<_, PendingFetchRecord>(
            r#"
            SELECT show_id, enqueued_at
            FROM pending_fetches
            ORDER BY enqueued_at, show_id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Retire a single work item
    pub async fn remove(&self, show_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM pending_fetches WHERE show_id = $1")
            .bind(show_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Bulk-remove work items, returning the number of rows deleted
    pub async fn remove_batch(&self, show_ids: &[i64]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM pending_fetches WHERE show_id = ANY($1)")
            .bind(show_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
