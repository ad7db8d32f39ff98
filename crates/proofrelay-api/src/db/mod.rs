//! # Database Persistence Layer
//!
//! Postgres persistence for proof records via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, records live in
//! the `proofs` table and survive restarts; when absent the API runs on the
//! in-memory store, which is suitable for development and testing.

pub mod proofs;

pub use proofs::PgProofStore;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect and run embedded migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             Proof records will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
