use std::{str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::config::DbConfig;

/// Opens the shared pool. Connections are acquired per store call and go
/// back to the pool when the call returns, on success or error.
pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    let options = PgConnectOptions::from_str(&cfg.url)
        .context("parse DATABASE_URL")?
        .options([("statement_timeout", format!("{}ms", cfg.statement_timeout_ms))]);

    let db = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect_with(options)
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}
