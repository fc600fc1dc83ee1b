//! Text alignments and their chunks.
//!
//! A chunk aligns a span of one version (`start..=end`) with content from
//! other versions. Span overlap is tested on the nested-interval bounds: a
//! chunk covers `[start.lft, end.rgt]`.

use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::Result;
use crate::models::{TextAlignment, TextAlignmentChunk, TextPart};
use crate::reference::resolve;
use crate::store::TextPartStore;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlignmentFilter {
    pub name: Option<String>,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkFilter {
    /// Passage reference; keeps chunks overlapping the resolved passage.
    pub reference: Option<String>,
    pub idx: Option<i64>,
    pub alignment_slug: Option<String>,
}

const CHUNK_SELECT: &str = r#"
    SELECT c.id, c.idx, c.citation, c.items_json,
           a.slug AS alignment_slug, v.urn AS version_urn,
           s.urn AS start_urn, e.urn AS end_urn
    FROM text_alignment_chunks c
    JOIN text_alignments a ON a.id = c.alignment_id
    JOIN text_parts v ON v.id = c.version_id
    JOIN text_parts s ON s.id = c.start_id
    JOIN text_parts e ON e.id = c.end_id
    WHERE 1 = 1"#;

fn row_to_chunk(row: &SqliteRow) -> Result<TextAlignmentChunk> {
    let items_json: String = row.get("items_json");
    Ok(TextAlignmentChunk {
        id: row.get("id"),
        idx: row.get("idx"),
        citation: row.get("citation"),
        items: serde_json::from_str(&items_json)?,
        alignment_slug: row.get("alignment_slug"),
        version_urn: row.get("version_urn"),
        start_urn: row.get("start_urn"),
        end_urn: row.get("end_urn"),
    })
}

pub async fn list_alignments(
    pool: &SqlitePool,
    filter: &AlignmentFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextAlignment>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT id, name, slug, metadata_json FROM text_alignments WHERE 1 = 1");
    if let Some(name) = &filter.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(slug) = &filter.slug {
        qb.push(" AND slug = ").push_bind(slug.clone());
    }
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            let metadata_json: String = row.get("metadata_json");
            Ok(TextAlignment {
                id: row.get("id"),
                name: row.get("name"),
                slug: row.get("slug"),
                metadata: crate::case::camelize(&serde_json::from_str(&metadata_json)?),
            })
        })
        .collect()
}

/// Chunks matching `filter`. A `reference` is resolved first, so unknown
/// versions or refs surface as not-found errors rather than empty lists.
pub async fn list_chunks<S: TextPartStore + ?Sized>(
    pool: &SqlitePool,
    store: &S,
    filter: &ChunkFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextAlignmentChunk>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(CHUNK_SELECT);

    if let Some(reference) = &filter.reference {
        let passage = resolve(store, reference).await?;
        qb.push(" AND c.version_id = ").push_bind(passage.version.id);
        push_overlap(&mut qb, passage.start.lft, passage.end.rgt);
    }
    if let Some(idx) = filter.idx {
        qb.push(" AND c.idx = ").push_bind(idx);
    }
    if let Some(slug) = &filter.alignment_slug {
        qb.push(" AND a.slug = ").push_bind(slug.clone());
    }
    qb.push(" ORDER BY a.id, c.idx LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(row_to_chunk).collect()
}

fn push_overlap(qb: &mut QueryBuilder<Sqlite>, lft: i64, rgt: i64) {
    qb.push(" AND s.lft <= ")
        .push_bind(rgt)
        .push(" AND e.rgt >= ")
        .push_bind(lft);
}

/// Number of chunks overlapping `anchor`'s subtree.
pub async fn count_overlapping(pool: &SqlitePool, anchor: &TextPart) -> Result<i64> {
    let count = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM text_alignment_chunks c
        JOIN text_parts s ON s.id = c.start_id
        JOIN text_parts e ON e.id = c.end_id
        WHERE s.lft <= ? AND e.rgt >= ?
        "#,
    )
    .bind(anchor.rgt)
    .bind(anchor.lft)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// A window of the chunks overlapping `anchor`'s subtree, ordered by
/// alignment and then chunk idx.
pub async fn overlapping(
    pool: &SqlitePool,
    anchor: &TextPart,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextAlignmentChunk>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(CHUNK_SELECT);
    push_overlap(&mut qb, anchor.lft, anchor.rgt);
    qb.push(" ORDER BY a.id, c.idx LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    rows.iter().map(row_to_chunk).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::fixtures::{self, VERSION_URN};
    use crate::db::seeded_pool;
    use crate::error::LibraryError;
    use crate::store::sqlite::SqliteStore;

    async fn setup() -> SqliteStore {
        SqliteStore::new(seeded_pool(&fixtures::iliad_with_layers()).await)
    }

    fn reference(range: &str) -> ChunkFilter {
        ChunkFilter {
            reference: Some(format!("{}{}", VERSION_URN, range)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_alignments_camelizes_metadata() {
        let store = setup().await;
        let all = list_alignments(store.pool(), &AlignmentFilter::default(), 100, 0)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].metadata["translatorName"], "Lattimore");

        let filter = AlignmentFilter {
            slug: Some("iliad-lines".into()),
            ..Default::default()
        };
        let one = list_alignments(store.pool(), &filter, 100, 0).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].name, "Iliad line by line");
    }

    #[tokio::test]
    async fn test_chunks_by_reference_overlap() {
        let store = setup().await;
        let chunks = list_chunks(store.pool(), &store, &reference("1.5"), 100, 0)
            .await
            .unwrap();
        let citations: Vec<_> = chunks.iter().map(|c| c.citation.as_str()).collect();
        assert_eq!(citations, vec!["1.5", "1.1-1.5"]);
    }

    #[tokio::test]
    async fn test_chunks_spanning_books() {
        let store = setup().await;
        let chunks = list_chunks(store.pool(), &store, &reference("2"), 100, 0)
            .await
            .unwrap();
        let spans: Vec<_> = chunks
            .iter()
            .filter(|c| c.alignment_slug == "iliad-spans")
            .map(|c| c.citation.as_str())
            .collect();
        assert_eq!(spans, vec!["1.12-2.1", "2.1-2.5"]);
        assert_eq!(chunks.len(), 7);
    }

    #[tokio::test]
    async fn test_chunks_by_slug_and_idx() {
        let store = setup().await;
        let filter = ChunkFilter {
            alignment_slug: Some("iliad-spans".into()),
            idx: Some(4),
            ..Default::default()
        };
        let chunks = list_chunks(store.pool(), &store, &filter, 100, 0).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].citation, "3.1-3.3");
        assert_eq!(chunks[0].start_urn, format!("{}3.1", VERSION_URN));
        assert_eq!(chunks[0].items, serde_json::json!([["αὐτὰρ ἐπεὶ"], ["now when"]]));
    }

    #[tokio::test]
    async fn test_chunks_unknown_reference() {
        let store = setup().await;
        let err = list_chunks(store.pool(), &store, &reference("9.9"), 100, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::ReferenceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_overlapping_window() {
        let store = setup().await;
        let version = store.get_by_urn(VERSION_URN).await.unwrap().unwrap();
        assert_eq!(count_overlapping(store.pool(), &version).await.unwrap(), 25);

        let page = overlapping(store.pool(), &version, 10, 20).await.unwrap();
        assert_eq!(page.len(), 5);
        assert!(page.iter().all(|c| c.alignment_slug == "iliad-spans"));

        let book3 = store
            .get_by_urn(&format!("{}3", VERSION_URN))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(count_overlapping(store.pool(), &book3).await.unwrap(), 4);
    }
}
