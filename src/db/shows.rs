//! Show database repository

use anyhow::Result;
use sqlx::PgPool;

use crate::db::cast_members::CastMemberRecord;

/// Show record from database. Identity is the upstream show id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShowRecord {
    pub id: i64,
    pub name: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Input for upserting a show. `updated_at` is set by the store on write.
#[derive(Debug, Clone)]
pub struct UpsertShow {
    pub id: i64,
    pub name: String,
}

/// A show with its cast in upstream relevance order, for the read-only API
#[derive(Debug, Clone, serde::Serialize)]
pub struct ShowWithCast {
    pub id: i64,
    pub name: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub cast: Vec<CastMemberRecord>,
}

pub struct ShowRepository {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct CastRow {
    show_id: i64,
    id: i64,
    name: String,
    birthday: Option<chrono::NaiveDate>,
}

impl ShowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All show ids currently in the store
    pub async fn ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM shows")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    /// Insert or update a show by its upstream id.
    ///
    /// `updated_at` never moves backwards.
    pub async fn upsert(&self, show: &UpsertShow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO shows (id, name, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                updated_at = GREATEST(shows.updated_at, NOW())
            "#,
        )
        .bind(show.id)
        .bind(&show.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a show and its cast links. A no-op for unknown ids.
    pub async fn remove(&self, show_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM shows WHERE id = $1")
            .bind(show_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// One page of shows with their cast, ordered by id.
    ///
    /// `page` is 1-based, matching the read API contract.
    pub async fn list_paged(&self, page_size: i64, page: i64) -> Result<Vec<ShowWithCast>> {
        let offset = page_size * (page.max(1) - 1);

        let shows = sqlx::query_as::<_, ShowRecord>(
            r#"
            SELECT id, name, updated_at
            FROM shows
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        if shows.is_empty() {
            return Ok(Vec::new());
        }

        let show_ids: Vec<i64> = shows.iter().map(|s| s.id).collect();
        let cast_rows = sqlx::query_as::<_, CastRow>(
            r#"
            SELECT sc.show_id, cm.id, cm.name, cm.birthday
            FROM show_cast sc
            JOIN cast_members cm ON cm.id = sc.person_id
            WHERE sc.show_id = ANY($1)
            ORDER BY sc.show_id, sc.credit_order
            "#,
        )
        .bind(&show_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut pages: Vec<ShowWithCast> = shows
            .into_iter()
            .map(|s| ShowWithCast {
                id: s.id,
                name: s.name,
                updated_at: s.updated_at,
                cast: Vec::new(),
            })
            .collect();

        for row in cast_rows {
            if let Some(show) = pages.iter_mut().find(|s| s.id == row.show_id) {
                show.cast.push(CastMemberRecord {
                    id: row.id,
                    name: row.name,
                    birthday: row.birthday,
                });
            }
        }

        Ok(pages)
    }
}
