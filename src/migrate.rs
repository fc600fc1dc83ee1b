//! Database schema migrations (idempotent).
//!
//! `text_parts` carries the tree index: `(parent_id, idx)` for children and
//! sibling windows, `path` for ancestors, and `(lft, rgt)` for subtree range
//! scans.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS text_parts (
        id INTEGER PRIMARY KEY,
        urn TEXT NOT NULL UNIQUE,
        reference TEXT,
        idx INTEGER NOT NULL,
        depth INTEGER NOT NULL,
        rank INTEGER NOT NULL,
        kind TEXT NOT NULL,
        label TEXT,
        text_content TEXT,
        metadata_json TEXT NOT NULL DEFAULT '{}',
        parent_id INTEGER REFERENCES text_parts(id),
        path TEXT NOT NULL UNIQUE,
        lft INTEGER NOT NULL UNIQUE,
        rgt INTEGER NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tokens (
        id INTEGER PRIMARY KEY,
        text_part_id INTEGER NOT NULL REFERENCES text_parts(id),
        value TEXT NOT NULL,
        word_value TEXT,
        subref_value TEXT,
        lemma TEXT,
        gloss TEXT,
        part_of_speech TEXT,
        tag TEXT,
        position INTEGER NOT NULL,
        idx INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS text_alignments (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        metadata_json TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS text_alignment_chunks (
        id INTEGER PRIMARY KEY,
        alignment_id INTEGER NOT NULL REFERENCES text_alignments(id),
        idx INTEGER NOT NULL,
        citation TEXT NOT NULL,
        items_json TEXT NOT NULL DEFAULT '[]',
        version_id INTEGER NOT NULL REFERENCES text_parts(id),
        start_id INTEGER NOT NULL REFERENCES text_parts(id),
        end_id INTEGER NOT NULL REFERENCES text_parts(id),
        UNIQUE(alignment_id, idx)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS text_annotations (
        id INTEGER PRIMARY KEY,
        urn TEXT NOT NULL,
        kind TEXT NOT NULL,
        idx INTEGER NOT NULL,
        data_json TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS image_annotations (
        id INTEGER PRIMARY KEY,
        urn TEXT NOT NULL,
        kind TEXT NOT NULL,
        idx INTEGER NOT NULL,
        data_json TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS image_annotation_text_parts (
        annotation_id INTEGER NOT NULL REFERENCES image_annotations(id),
        text_part_id INTEGER NOT NULL REFERENCES text_parts(id),
        PRIMARY KEY (annotation_id, text_part_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS audio_annotations (
        id INTEGER PRIMARY KEY,
        urn TEXT NOT NULL,
        kind TEXT NOT NULL,
        idx INTEGER NOT NULL,
        data_json TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS named_entities (
        id INTEGER PRIMARY KEY,
        urn TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT,
        kind TEXT NOT NULL,
        url TEXT,
        data_json TEXT NOT NULL DEFAULT '{}'
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS named_entity_text_parts (
        named_entity_id INTEGER NOT NULL REFERENCES named_entities(id),
        text_part_id INTEGER NOT NULL REFERENCES text_parts(id),
        PRIMARY KEY (named_entity_id, text_part_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_text_parts_parent_idx ON text_parts(parent_id, idx)",
    "CREATE INDEX IF NOT EXISTS idx_text_parts_reference_depth ON text_parts(reference, depth)",
    "CREATE INDEX IF NOT EXISTS idx_text_parts_kind ON text_parts(kind)",
    "CREATE INDEX IF NOT EXISTS idx_tokens_text_part ON tokens(text_part_id, idx)",
    "CREATE INDEX IF NOT EXISTS idx_chunks_version ON text_alignment_chunks(version_id)",
    "CREATE INDEX IF NOT EXISTS idx_text_annotations_urn ON text_annotations(urn)",
    "CREATE INDEX IF NOT EXISTS idx_image_annotations_urn ON image_annotations(urn)",
    "CREATE INDEX IF NOT EXISTS idx_audio_annotations_urn ON audio_annotations(urn)",
];

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
