//! # Passage Atlas CLI (`atlas`)
//!
//! ## Usage
//!
//! ```bash
//! atlas --config ./config/atlas.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `atlas init` | Create the SQLite database and run schema migrations |
//! | `atlas ingest <corpus.json>` | Replace the stored corpus with a corpus file |
//! | `atlas resolve <reference>` | Resolve a passage reference to its start/end nodes |
//! | `atlas passage <reference>` | Print passage text parts and metadata as JSON |
//! | `atlas tree <urn>` | Print the nested subtree under a URN as JSON |
//! | `atlas serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! atlas init --config ./config/atlas.toml
//! atlas ingest ./data/iliad.json --config ./config/atlas.toml
//! atlas passage "urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.1-1.10"
//! atlas tree "urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:" --up-to book
//! atlas serve --config ./config/atlas.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use passage_atlas::{config, ingest, logging, lookup, migrate, server};

/// Passage Atlas: a query service for hierarchically cited texts, their
/// alignments, and annotations.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/atlas.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "atlas",
    about = "Passage Atlas: query cited texts by CTS reference",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/atlas.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Replace the stored corpus with the contents of a corpus file.
    Ingest {
        /// Path to the corpus JSON file.
        path: PathBuf,

        /// Validate and count without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve a reference such as `urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.1-1.10`.
    Resolve { reference: String },

    /// Print a passage's text parts and metadata as JSON.
    Passage { reference: String },

    /// Print the subtree under a URN as nested JSON.
    Tree {
        urn: String,

        /// Do not descend below nodes of this kind.
        #[arg(long)]
        up_to: Option<String>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path, dry_run } => {
            ingest::run_ingest(&cfg, &path, dry_run).await?;
        }
        Commands::Resolve { reference } => {
            lookup::run_resolve(&cfg, &reference).await?;
        }
        Commands::Passage { reference } => {
            lookup::run_passage(&cfg, &reference).await?;
        }
        Commands::Tree { urn, up_to } => {
            lookup::run_tree(&cfg, &urn, up_to.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
