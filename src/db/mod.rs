//! Database connection and operations

pub mod cast_members;
pub mod pending_fetches;
pub mod shows;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use cast_members::{CastMemberRecord, CastMemberRepository};
pub use pending_fetches::{PendingFetchRecord, PendingFetchRepository};
pub use shows::{ShowRecord, ShowRepository, ShowWithCast, UpsertShow};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10)
    }

    /// Create a new database connection pool
    pub async fn connect(url: &str) -> Result<Self> {
        let max_connections = Self::get_max_connections();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a show repository
    pub fn shows(&self) -> ShowRepository {
        ShowRepository::new(self.pool.clone())
    }

    /// Get a cast member repository
    pub fn cast_members(&self) -> CastMemberRepository {
        CastMemberRepository::new(self.pool.clone())
    }

    /// Get a pending fetch repository
    pub fn pending_fetches(&self) -> PendingFetchRepository {
        PendingFetchRepository::new(self.pool.clone())
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Persistence operations the ingestion scheduler consumes.
///
/// Each operation is a single committed statement, so state stays observable
/// to a restart after every mutation.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn show_ids(&self) -> Result<Vec<i64>>;
    async fn upsert_show(&self, show: &UpsertShow) -> Result<()>;
    async fn remove_show(&self, show_id: i64) -> Result<()>;

    async fn upsert_cast_member(&self, member: &CastMemberRecord) -> Result<()>;
    async fn link_cast_member(&self, show_id: i64, person_id: i64, credit_order: i32)
    -> Result<()>;

    async fn pending_ids(&self) -> Result<Vec<i64>>;
    /// Enqueue a fetch; false when the show already had one (dedup by id).
    async fn enqueue_pending(&self, show_id: i64) -> Result<bool>;
    /// Up to `limit` work items in first-enqueued order, without removing them.
    async fn next_pending(&self, limit: i64) -> Result<Vec<PendingFetchRecord>>;
    async fn remove_pending(&self, show_id: i64) -> Result<()>;
    /// Bulk removal used by shutdown finalization.
    async fn remove_pending_batch(&self, show_ids: &[i64]) -> Result<u64>;
}

#[async_trait]
impl CatalogStore for Database {
    async fn show_ids(&self) -> Result<Vec<i64>> {
        self.shows().ids().await
    }

    async fn upsert_show(&self, show: &UpsertShow) -> Result<()> {
        self.shows().upsert(show).await
    }

    async fn remove_show(&self, show_id: i64) -> Result<()> {
        self.shows().remove(show_id).await
    }

    async fn upsert_cast_member(&self, member: &CastMemberRecord) -> Result<()> {
        self.cast_members().upsert(member).await
    }

    async fn link_cast_member(
        &self,
        show_id: i64,
        person_id: i64,
        credit_order: i32,
    ) -> Result<()> {
        self.cast_members()
            .link_to_show(show_id, person_id, credit_order)
            .await
    }

    async fn pending_ids(&self) -> Result<Vec<i64>> {
        self.pending_fetches().ids().await
    }

    async fn enqueue_pending(&self, show_id: i64) -> Result<bool> {
        self.pending_fetches().add(show_id).await
    }

    async fn next_pending(&self, limit: i64) -> Result<Vec<PendingFetchRecord>> {
        self.pending_fetches().take(limit).await
    }

    async fn remove_pending(&self, show_id: i64) -> Result<()> {
        self.pending_fetches().remove(show_id).await
    }

    async fn remove_pending_batch(&self, show_ids: &[i64]) -> Result<u64> {
        self.pending_fetches().remove_batch(show_ids).await
    }
}
