use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the offending field.
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

pub async fn run_migrations(db: &PgPool) {
    if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }
}

/// Turns a unique violation on `users` into `StoreError::Duplicate`.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("username") => "username",
                _ => "email",
            };
            return StoreError::Duplicate(field);
        }
    }
    StoreError::Database(err)
}
