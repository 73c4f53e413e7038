//! Database access: pool construction, migrations, models, and repositories.

pub mod errors;
pub mod handlers;
pub mod models;

use anyhow::Context;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

/// Build a connection pool from the configured settings.
pub async fn create_pool(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let settings = &config.pool;

    let mut options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs));

    if settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(Duration::from_secs(settings.idle_timeout_secs));
    }
    if settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(Duration::from_secs(settings.max_lifetime_secs));
    }

    let pool = options.connect(&config.url).await.context("failed to connect to database")?;

    Ok(pool)
}

/// Run pending migrations from the bundled `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await.context("failed to run migrations")?;
    info!("Database migrations applied");
    Ok(())
}
