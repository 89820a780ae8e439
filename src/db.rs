use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, SqlitePool,
};
use tracing::info;

use crate::config::AppConfig;

pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .with_context(|| format!("parse DATABASE_URL {}", config.database_url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(options)
        .await
        .context("connect to database")?;
    Ok(pool)
}

/// Reads the schema file and executes it against the pool.
pub async fn load_schema(db: &SqlitePool, path: &str) -> anyhow::Result<()> {
    let sql = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read schema file {}", path))?;
    apply_schema(db, &sql).await?;
    info!(path, "database schema ensured");
    Ok(())
}

pub async fn apply_schema(db: &SqlitePool, sql: &str) -> anyhow::Result<()> {
    db.execute(sql).await.context("execute schema")?;
    Ok(())
}

/// Single-connection in-memory pool; the database lives as long as that connection.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory sqlite");
    apply_schema(&pool, include_str!("../data/schema.sql"))
        .await
        .expect("apply schema");
    pool
}
