//! SQLite database connection management.
//!
//! WAL mode is enabled so that the HTTP server can keep answering reads
//! while `atlas ingest` rewrites the corpus.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

/// Create a connection pool to the configured SQLite database, creating the
/// file and its parent directories when missing.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let db_path = &config.db.path;

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Single-connection in-memory pool with the schema applied and `corpus`
/// ingested. One connection keeps every query on the same database.
#[cfg(test)]
pub(crate) async fn seeded_pool(corpus: &crate::corpus::CorpusFile) -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    crate::migrate::apply_schema(&pool).await.unwrap();
    crate::ingest::ingest_corpus(&pool, corpus).await.unwrap();
    pool
}
