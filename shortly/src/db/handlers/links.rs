//! Database repository for short links.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::Result,
    models::links::{LinkCreateDBRequest, LinkRecord},
};
use crate::types::{LinkId, UserId, abbrev_uuid};

/// Persistence operations for short links.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a link. Surfaces a unique violation if the short code is taken;
    /// the caller decides whether to retry with a fresh code.
    async fn create(&self, request: &LinkCreateDBRequest) -> Result<LinkRecord>;
    async fn get_by_code(&self, short_code: &str) -> Result<Option<LinkRecord>>;
    async fn get_by_id(&self, id: LinkId) -> Result<Option<LinkRecord>>;
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<LinkRecord>>;
    async fn delete(&self, id: LinkId) -> Result<bool>;
}

/// PostgreSQL-backed [`LinkStore`].
pub struct PgLinks {
    pool: PgPool,
}

impl PgLinks {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkStore for PgLinks {
    #[instrument(skip(self, request), fields(owner_id = %abbrev_uuid(&request.owner_id)), err)]
    async fn create(&self, request: &LinkCreateDBRequest) -> Result<LinkRecord> {
        let link_id = Uuid::new_v4();

        let link = sqlx::query_as::<_, LinkRecord>(
            r#"
            INSERT INTO links (id, full_link, short_code, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(link_id)
        .bind(&request.full_link)
        .bind(&request.short_code)
        .bind(request.owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    #[instrument(skip(self), err)]
    async fn get_by_code(&self, short_code: &str) -> Result<Option<LinkRecord>> {
        let link = sqlx::query_as::<_, LinkRecord>("SELECT * FROM links WHERE short_code = $1")
            .bind(short_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    #[instrument(skip(self), fields(link_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: LinkId) -> Result<Option<LinkRecord>> {
        let link = sqlx::query_as::<_, LinkRecord>("SELECT * FROM links WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(link)
    }

    #[instrument(skip(self), fields(owner_id = %abbrev_uuid(&owner_id)), err)]
    async fn list_by_owner(&self, owner_id: UserId) -> Result<Vec<LinkRecord>> {
        let links = sqlx::query_as::<_, LinkRecord>("SELECT * FROM links WHERE owner_id = $1 ORDER BY created_at DESC")
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(links)
    }

    #[instrument(skip(self), fields(link_id = %abbrev_uuid(&id)), err)]
    async fn delete(&self, id: LinkId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1").bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }
}
