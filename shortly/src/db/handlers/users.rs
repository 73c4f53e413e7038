//! Database repository for users.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::db::{
    errors::{DbError, Result},
    models::users::{UserCreateDBRequest, UserRecord},
};
use crate::types::{UserId, abbrev_uuid};

/// Persistence operations the account subsystem needs from the users table.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserRecord>;
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    /// Activate and verify the account with this email in one write. Returns
    /// false if no such account exists.
    async fn mark_verified(&self, email: &str) -> Result<bool>;
    async fn update_email(&self, id: UserId, email: &str) -> Result<UserRecord>;
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<UserRecord>;
}

/// PostgreSQL-backed [`UserStore`].
pub struct PgUsers {
    pool: PgPool,
}

impl PgUsers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUsers {
    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&self, request: &UserCreateDBRequest) -> Result<UserRecord> {
        let user_id = Uuid::new_v4();

        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, email, password_hash, is_active, is_superuser, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.is_active)
        .bind(request.is_superuser)
        .bind(request.is_verified)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&self, id: UserId) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, email), err)]
    async fn mark_verified(&self, email: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_active = TRUE, is_verified = TRUE, updated_at = NOW() WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, email), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_email(&self, id: UserId, email: &str) -> Result<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users SET email = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }

    #[instrument(skip(self, password_hash), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<UserRecord> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}
