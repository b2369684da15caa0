//! Database Module
//!
//! PostgreSQL connection pool and the schema in `migrations/`.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::DatabaseSettings;

/// Open the pool and, if configured, bring the schema up to date.
#[instrument(skip(settings), fields(max_connections = settings.max_connections))]
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(&settings.url)
        .await?;
    info!("Database connection established");

    if settings.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(pool)
}
