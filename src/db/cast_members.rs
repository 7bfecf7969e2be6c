//! Cast member database repository
//!
//! Cast members are only created through the scraping path, so every
//! persisted row is linked to at least one show.

use anyhow::Result;
use sqlx::PgPool;

/// Cast member record. Identity is the upstream person id.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct CastMemberRecord {
    pub id: i64,
    pub name: String,
    pub birthday: Option<chrono::NaiveDate>,
}

pub struct CastMemberRepository {
    pool: PgPool,
}

impl CastMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or update a cast member by its upstream id
    pub async fn upsert(&self, member: &CastMemberRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cast_members (id, name, birthday)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                birthday = EXCLUDED.birthday
            "#,
        )
        .bind(member.id)
        .bind(&member.name)
        .bind(member.birthday)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Associate a cast member with a show at the given relevance position
    pub async fn link_to_show(&self, show_id: i64, person_id: i64, credit_order: i32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO show_cast (show_id, person_id, credit_order)
            VALUES ($1, $2, $3)
            ON CONFLICT (show_id, person_id) DO UPDATE SET
                credit_order = EXCLUDED.credit_order
            "#,
        )
        .bind(show_id)
        .bind(person_id)
        .bind(credit_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
