//! CLI lookups: `atlas resolve`, `atlas passage`, `atlas tree`.
//!
//! Each opens the configured database, runs one query, and prints the
//! result to stdout. Failures print `Error: ...` to stderr and exit 1.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::error::LibraryError;
use crate::migrate;
use crate::passage::get_passage;
use crate::reference::resolve;
use crate::store::sqlite::SqliteStore;
use crate::tree::load_tree;

async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    Ok(SqliteStore::new(pool))
}

fn exit_on_error<T>(result: std::result::Result<T, LibraryError>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

pub async fn run_resolve(config: &Config, reference: &str) -> Result<()> {
    let store = open_store(config).await?;
    let passage = exit_on_error(resolve(&store, reference).await);
    store.pool().close().await;

    println!("--- Passage ---");
    println!("urn:      {}", passage.urn());
    println!("version:  {}", passage.version.urn);
    println!(
        "start:    {} (depth {}, idx {})",
        passage.start.urn, passage.start.depth, passage.start.idx
    );
    println!(
        "end:      {} (depth {}, idx {})",
        passage.end.urn, passage.end.depth, passage.end.idx
    );
    Ok(())
}

pub async fn run_passage(config: &Config, reference: &str) -> Result<()> {
    let store = open_store(config).await?;
    let passage = exit_on_error(get_passage(&store, reference).await);
    store.pool().close().await;

    println!("{}", serde_json::to_string_pretty(&passage)?);
    Ok(())
}

pub async fn run_tree(config: &Config, urn: &str, up_to: Option<&str>) -> Result<()> {
    let store = open_store(config).await?;
    let tree = exit_on_error(load_tree(&store, urn, up_to).await);
    store.pool().close().await;

    println!("{}", serde_json::to_string_pretty(&tree)?);
    Ok(())
}
