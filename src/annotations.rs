//! Annotation layers, named entities, and tokens.

use serde::Deserialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::case::camelize;
use crate::error::Result;
use crate::models::{Annotation, AnnotationLayer, NamedEntity, Token};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrnFilter {
    pub urn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenFilter {
    pub text_part_urn: Option<String>,
    pub text_part_urn_startswith: Option<String>,
}

pub async fn list_annotations(
    pool: &SqlitePool,
    layer: AnnotationLayer,
    filter: &UrnFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Annotation>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT id, urn, kind, idx, data_json FROM {} WHERE 1 = 1",
        layer.table()
    ));
    if let Some(urn) = &filter.urn {
        qb.push(" AND urn = ").push_bind(urn.clone());
    }
    qb.push(" ORDER BY idx LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    let mut annotations = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: i64 = row.get("id");
        let data_json: String = row.get("data_json");
        let text_parts = match layer {
            AnnotationLayer::Image => linked_text_parts(pool, id).await?,
            _ => Vec::new(),
        };
        annotations.push(Annotation {
            urn: row.get("urn"),
            kind: row.get("kind"),
            idx: row.get("idx"),
            data: camelize(&serde_json::from_str(&data_json)?),
            text_parts,
        });
    }
    Ok(annotations)
}

async fn linked_text_parts(pool: &SqlitePool, annotation_id: i64) -> Result<Vec<String>> {
    let urns = sqlx::query_scalar(
        r#"
        SELECT tp.urn
        FROM image_annotation_text_parts l
        JOIN text_parts tp ON tp.id = l.text_part_id
        WHERE l.annotation_id = ?
        ORDER BY tp.lft
        "#,
    )
    .bind(annotation_id)
    .fetch_all(pool)
    .await?;
    Ok(urns)
}

pub async fn list_named_entities(
    pool: &SqlitePool,
    filter: &UrnFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<NamedEntity>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, urn, title, description, kind, url, data_json FROM named_entities WHERE 1 = 1",
    );
    if let Some(urn) = &filter.urn {
        qb.push(" AND urn = ").push_bind(urn.clone());
    }
    qb.push(" ORDER BY id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    let mut entities = Vec::with_capacity(rows.len());
    for row in &rows {
        let id: i64 = row.get("id");
        let data_json: String = row.get("data_json");
        let text_parts = sqlx::query_scalar(
            r#"
            SELECT tp.urn
            FROM named_entity_text_parts l
            JOIN text_parts tp ON tp.id = l.text_part_id
            WHERE l.named_entity_id = ?
            ORDER BY tp.lft
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await?;

        entities.push(NamedEntity {
            urn: row.get("urn"),
            title: row.get("title"),
            description: row.get("description"),
            kind: row.get("kind"),
            url: row.get("url"),
            data: camelize(&serde_json::from_str(&data_json)?),
            text_parts,
        });
    }
    Ok(entities)
}

/// Tokens in document order: by text part position, then token idx.
pub async fn list_tokens(
    pool: &SqlitePool,
    filter: &TokenFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Token>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT tp.urn AS text_part_urn, t.value, t.word_value, t.subref_value, t.lemma,
               t.gloss, t.part_of_speech, t.tag, t.position, t.idx
        FROM tokens t
        JOIN text_parts tp ON tp.id = t.text_part_id
        WHERE 1 = 1"#,
    );
    if let Some(urn) = &filter.text_part_urn {
        qb.push(" AND tp.urn = ").push_bind(urn.clone());
    }
    if let Some(prefix) = &filter.text_part_urn_startswith {
        qb.push(" AND instr(tp.urn, ")
            .push_bind(prefix.clone())
            .push(") = 1");
    }
    qb.push(" ORDER BY tp.lft, t.idx LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = qb.build().fetch_all(pool).await?;
    Ok(rows
        .iter()
        .map(|row| Token {
            text_part_urn: row.get("text_part_urn"),
            value: row.get("value"),
            word_value: row.get("word_value"),
            subref_value: row.get("subref_value"),
            lemma: row.get("lemma"),
            gloss: row.get("gloss"),
            part_of_speech: row.get("part_of_speech"),
            tag: row.get("tag"),
            position: row.get("position"),
            idx: row.get("idx"),
        })
        .collect())
}
