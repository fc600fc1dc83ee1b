//! Bulk ingestion: corpus file → flatten → SQLite.
//!
//! An ingest replaces the stored corpus. Everything runs in one transaction,
//! so readers see either the old corpus or the new one.

use std::path::Path;

use anyhow::Result;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

use crate::config::Config;
use crate::corpus::{flatten, load_corpus_file, CorpusFile, FlatCorpus};
use crate::db;
use crate::error::LibraryError;
use crate::migrate;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub text_parts: usize,
    pub tokens: usize,
    pub alignments: usize,
    pub chunks: usize,
    pub annotations: usize,
    pub named_entities: usize,
}

/// CLI entry point for `atlas ingest <file>`.
pub async fn run_ingest(config: &Config, path: &Path, dry_run: bool) -> Result<()> {
    let corpus = load_corpus_file(path)?;

    if dry_run {
        let flat = flatten(&corpus.nodes)?;
        println!("Ingest dry run: {}", path.display());
        println!("  text parts:     {}", flat.nodes.len());
        println!("  tokens:         {}", flat.tokens.len());
        println!("  alignments:     {}", corpus.alignments.len());
        return Ok(());
    }

    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let stats = ingest_corpus(&pool, &corpus).await;
    pool.close().await;
    let stats = stats?;

    println!("Ingest {}: ok", path.display());
    println!("  text parts:     {}", stats.text_parts);
    println!("  tokens:         {}", stats.tokens);
    println!("  alignments:     {}", stats.alignments);
    println!("  chunks:         {}", stats.chunks);
    println!("  annotations:    {}", stats.annotations);
    println!("  named entities: {}", stats.named_entities);
    Ok(())
}

/// Replaces the stored corpus with `corpus`.
pub async fn ingest_corpus(pool: &SqlitePool, corpus: &CorpusFile) -> Result<IngestStats> {
    let flat = flatten(&corpus.nodes)?;
    let mut tx = pool.begin().await?;

    clear(&mut tx).await?;
    let mut stats = IngestStats {
        text_parts: insert_text_parts(&mut tx, &flat).await?,
        tokens: insert_tokens(&mut tx, &flat).await?,
        ..Default::default()
    };
    let (alignments, chunks) = insert_alignments(&mut tx, corpus, &flat).await?;
    stats.alignments = alignments;
    stats.chunks = chunks;
    stats.annotations = insert_annotations(&mut tx, corpus, &flat).await?;
    stats.named_entities = insert_named_entities(&mut tx, corpus, &flat).await?;

    tx.commit().await?;
    info!(
        text_parts = stats.text_parts,
        chunks = stats.chunks,
        annotations = stats.annotations,
        "corpus ingested"
    );
    Ok(stats)
}

async fn clear(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    for table in [
        "named_entity_text_parts",
        "named_entities",
        "image_annotation_text_parts",
        "image_annotations",
        "audio_annotations",
        "text_annotations",
        "text_alignment_chunks",
        "text_alignments",
        "tokens",
        "text_parts",
    ] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn insert_text_parts(tx: &mut Transaction<'_, Sqlite>, flat: &FlatCorpus) -> Result<usize> {
    for node in &flat.nodes {
        sqlx::query(
            r#"
            INSERT INTO text_parts (id, urn, reference, idx, depth, rank, kind, label,
                                    text_content, metadata_json, parent_id, path, lft, rgt)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(node.id)
        .bind(&node.urn)
        .bind(&node.reference)
        .bind(node.idx)
        .bind(node.depth)
        .bind(node.rank)
        .bind(&node.kind)
        .bind(&node.label)
        .bind(&node.text_content)
        .bind(node.metadata.to_string())
        .bind(node.parent_id)
        .bind(&node.path)
        .bind(node.lft)
        .bind(node.rgt)
        .execute(&mut **tx)
        .await?;
    }
    Ok(flat.nodes.len())
}

async fn insert_tokens(tx: &mut Transaction<'_, Sqlite>, flat: &FlatCorpus) -> Result<usize> {
    for token in &flat.tokens {
        sqlx::query(
            r#"
            INSERT INTO tokens (text_part_id, value, word_value, subref_value, lemma, gloss,
                                part_of_speech, tag, position, idx)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(token.text_part_id)
        .bind(&token.source.value)
        .bind(&token.source.word_value)
        .bind(&token.source.subref_value)
        .bind(&token.source.lemma)
        .bind(&token.source.gloss)
        .bind(&token.source.part_of_speech)
        .bind(&token.source.tag)
        .bind(token.position)
        .bind(token.idx)
        .execute(&mut **tx)
        .await?;
    }
    Ok(flat.tokens.len())
}

async fn insert_alignments(
    tx: &mut Transaction<'_, Sqlite>,
    corpus: &CorpusFile,
    flat: &FlatCorpus,
) -> Result<(usize, usize)> {
    let mut chunk_count = 0;
    for alignment in &corpus.alignments {
        let alignment_id: i64 = sqlx::query_scalar(
            "INSERT INTO text_alignments (name, slug, metadata_json) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&alignment.name)
        .bind(&alignment.slug)
        .bind(alignment.metadata.to_string())
        .fetch_one(&mut **tx)
        .await?;

        for (idx, chunk) in alignment.chunks.iter().enumerate() {
            let context = format!("chunk {} of alignment {}", idx, alignment.slug);
            let version_id = flat.require_id(&chunk.version, &context)?;
            let start_id = flat.require_id(&chunk.start, &context)?;
            let end_id = flat.require_id(&chunk.end, &context)?;

            let start_lft = flat.node(&chunk.start).map_or(0, |n| n.lft);
            let end_lft = flat.node(&chunk.end).map_or(0, |n| n.lft);
            if end_lft < start_lft {
                return Err(LibraryError::InvalidCorpus(format!(
                    "{} ends before it starts",
                    context
                ))
                .into());
            }

            sqlx::query(
                r#"
                INSERT INTO text_alignment_chunks (alignment_id, idx, citation, items_json,
                                                   version_id, start_id, end_id)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(alignment_id)
            .bind(idx as i64)
            .bind(&chunk.citation)
            .bind(serde_json::to_string(&chunk.items)?)
            .bind(version_id)
            .bind(start_id)
            .bind(end_id)
            .execute(&mut **tx)
            .await?;
            chunk_count += 1;
        }
    }
    Ok((corpus.alignments.len(), chunk_count))
}

async fn insert_annotations(
    tx: &mut Transaction<'_, Sqlite>,
    corpus: &CorpusFile,
    flat: &FlatCorpus,
) -> Result<usize> {
    let layers = [
        ("text_annotations", &corpus.text_annotations),
        ("image_annotations", &corpus.image_annotations),
        ("audio_annotations", &corpus.audio_annotations),
    ];

    let mut count = 0;
    for (table, annotations) in layers {
        for (idx, annotation) in annotations.iter().enumerate() {
            let id: i64 = sqlx::query_scalar(&format!(
                "INSERT INTO {} (urn, kind, idx, data_json) VALUES (?, ?, ?, ?) RETURNING id",
                table
            ))
            .bind(&annotation.urn)
            .bind(&annotation.kind)
            .bind(idx as i64)
            .bind(annotation.data.to_string())
            .fetch_one(&mut **tx)
            .await?;

            if table == "image_annotations" {
                for urn in &annotation.text_parts {
                    let text_part_id =
                        flat.require_id(urn, &format!("image annotation {}", annotation.urn))?;
                    sqlx::query(
                        "INSERT OR IGNORE INTO image_annotation_text_parts (annotation_id, text_part_id) VALUES (?, ?)",
                    )
                    .bind(id)
                    .bind(text_part_id)
                    .execute(&mut **tx)
                    .await?;
                }
            }
            count += 1;
        }
    }
    Ok(count)
}

async fn insert_named_entities(
    tx: &mut Transaction<'_, Sqlite>,
    corpus: &CorpusFile,
    flat: &FlatCorpus,
) -> Result<usize> {
    for entity in &corpus.named_entities {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO named_entities (urn, title, description, kind, url, data_json)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&entity.urn)
        .bind(&entity.title)
        .bind(&entity.description)
        .bind(&entity.kind)
        .bind(&entity.url)
        .bind(entity.data.to_string())
        .fetch_one(&mut **tx)
        .await?;

        for urn in &entity.text_parts {
            let text_part_id = flat.require_id(urn, &format!("named entity {}", entity.urn))?;
            sqlx::query(
                "INSERT OR IGNORE INTO named_entity_text_parts (named_entity_id, text_part_id) VALUES (?, ?)",
            )
            .bind(id)
            .bind(text_part_id)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(corpus.named_entities.len())
}
