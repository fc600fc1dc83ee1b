//! SQLite-backed [`TextPartStore`] implementation.
//!
//! Every traversal is a single indexed query against the `text_parts` table
//! created by [`migrate`](crate::migrate).

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::Result;
use crate::models::TextPart;

use super::{ancestor_paths, TextPartFilter, TextPartStore};

pub(crate) const TEXT_PART_COLUMNS: &str = "id, urn, reference, idx, depth, rank, kind, label, \
     text_content, metadata_json, parent_id, path, lft, rgt";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn row_to_text_part(row: &SqliteRow) -> TextPart {
    let metadata_json: String = row.get("metadata_json");
    TextPart {
        id: row.get("id"),
        urn: row.get("urn"),
        reference: row.get("reference"),
        idx: row.get("idx"),
        depth: row.get("depth"),
        rank: row.get("rank"),
        kind: row.get("kind"),
        label: row.get("label"),
        text_content: row.get("text_content"),
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({})),
        parent_id: row.get("parent_id"),
        path: row.get("path"),
        lft: row.get("lft"),
        rgt: row.get("rgt"),
    }
}

#[async_trait]
impl TextPartStore for SqliteStore {
    async fn get_by_urn(&self, urn: &str) -> Result<Option<TextPart>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM text_parts WHERE urn = ?",
            TEXT_PART_COLUMNS
        ))
        .bind(urn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_text_part))
    }

    async fn find_descendant_by_ref(
        &self,
        root: &TextPart,
        reference: &str,
        depth: i64,
    ) -> Result<Option<TextPart>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM text_parts
            WHERE reference = ? AND depth = ? AND lft > ? AND lft < ?
            ORDER BY lft
            LIMIT 1
            "#,
            TEXT_PART_COLUMNS
        ))
        .bind(reference)
        .bind(depth)
        .bind(root.lft)
        .bind(root.rgt)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_text_part))
    }

    async fn children(&self, node: &TextPart) -> Result<Vec<TextPart>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM text_parts WHERE parent_id = ? ORDER BY idx",
            TEXT_PART_COLUMNS
        ))
        .bind(node.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_text_part).collect())
    }

    async fn ancestors(&self, node: &TextPart) -> Result<Vec<TextPart>> {
        let paths = ancestor_paths(&node.path);
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM text_parts WHERE path IN (",
            TEXT_PART_COLUMNS
        ));
        let mut separated = qb.separated(", ");
        for p in paths {
            separated.push_bind(p);
        }
        separated.push_unseparated(") ORDER BY path");

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_text_part).collect())
    }

    async fn descendants(
        &self,
        node: &TextPart,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TextPart>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM text_parts
            WHERE lft > ? AND lft < ?
            ORDER BY lft
            LIMIT ? OFFSET ?
            "#,
            TEXT_PART_COLUMNS
        ))
        .bind(node.lft)
        .bind(node.rgt)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_text_part).collect())
    }

    async fn siblings(&self, node: &TextPart) -> Result<Vec<TextPart>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM text_parts WHERE parent_id IS ? ORDER BY idx",
            TEXT_PART_COLUMNS
        ))
        .bind(node.parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_text_part).collect())
    }

    async fn siblings_in_range(
        &self,
        node: &TextPart,
        first_idx: i64,
        last_idx: i64,
    ) -> Result<Vec<TextPart>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM text_parts
            WHERE parent_id IS ? AND idx >= ? AND idx <= ?
            ORDER BY idx
            "#,
            TEXT_PART_COLUMNS
        ))
        .bind(node.parent_id)
        .bind(first_idx)
        .bind(last_idx)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_text_part).collect())
    }

    async fn leaves_between(&self, start: &TextPart, end: &TextPart) -> Result<Vec<TextPart>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM text_parts
            WHERE lft >= ? AND lft <= ? AND rgt = lft + 1
            ORDER BY lft
            "#,
            TEXT_PART_COLUMNS
        ))
        .bind(start.lft)
        .bind(end.rgt)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_text_part).collect())
    }

    async fn filter(
        &self,
        filter: &TextPartFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TextPart>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM text_parts WHERE 1 = 1",
            TEXT_PART_COLUMNS
        ));

        if let Some(v) = &filter.urn {
            qb.push(" AND urn = ").push_bind(v.clone());
        }
        if let Some(v) = &filter.urn_startswith {
            qb.push(" AND instr(urn, ").push_bind(v.clone()).push(") = 1");
        }
        if let Some(v) = &filter.reference_exact {
            qb.push(" AND reference = ").push_bind(v.clone());
        }
        if let Some(v) = &filter.ref_startswith {
            qb.push(" AND instr(reference, ")
                .push_bind(v.clone())
                .push(") = 1");
        }
        if let Some(v) = filter.depth {
            qb.push(" AND depth = ").push_bind(v);
        }
        if let Some(v) = filter.depth_lt {
            qb.push(" AND depth < ").push_bind(v);
        }
        if let Some(v) = filter.depth_gt {
            qb.push(" AND depth > ").push_bind(v);
        }
        if let Some(v) = filter.rank {
            qb.push(" AND rank = ").push_bind(v);
        }
        if let Some(v) = filter.rank_lt {
            qb.push(" AND rank < ").push_bind(v);
        }
        if let Some(v) = filter.rank_gt {
            qb.push(" AND rank > ").push_bind(v);
        }
        if let Some(v) = &filter.kind {
            qb.push(" AND kind = ").push_bind(v.clone());
        }
        if let Some(v) = filter.idx {
            qb.push(" AND idx = ").push_bind(v);
        }

        qb.push(" ORDER BY path LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_text_part).collect())
    }
}
