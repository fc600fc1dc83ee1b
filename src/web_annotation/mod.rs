//! W3C Web Annotation collections over alignment records.
//!
//! | Path | Document |
//! |------|----------|
//! | `/wa/{urn}/{kind}/collection/{format}` | `AnnotationCollection` |
//! | `/wa/{urn}/{kind}/collection/{format}/{page}` | `AnnotationPage` (0-based page) |
//! | `/wa/{urn}/{kind}/annotation/{idx}/{format}` | single `Annotation` |
//!
//! The records for an anchor URN are the alignment chunks overlapping its
//! subtree, ordered by alignment and chunk idx and numbered from 0.

pub mod generator;
pub mod paginator;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::alignments;
use crate::error::{LibraryError, Result};
use crate::library::require_text_part;
use crate::store::TextPartStore;

use generator::{generator_for_kind, AlignmentRecord, AnnotationFormat, WebAnnotation};
use paginator::{as_zero_based, Paginator};

pub const ANNO_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";

#[derive(Debug, Clone, Serialize)]
pub struct AnnotationCollection {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    pub total: i64,
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPage {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub part_of: String,
    pub start_index: i64,
    pub items: Vec<WebAnnotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// One `/wa/{urn}/{kind}/...` request: anchor, kind, format, and the base
/// for absolute URLs.
#[derive(Debug, Clone)]
pub struct AnnotationRequest<'a> {
    pub base_url: &'a str,
    pub urn: &'a str,
    pub kind: &'a str,
    pub format: &'a str,
}

impl AnnotationRequest<'_> {
    fn collection_url(&self) -> String {
        format!(
            "{}/wa/{}/{}/collection/{}",
            self.base_url.trim_end_matches('/'),
            self.urn,
            self.kind,
            self.format
        )
    }

    fn page_url(&self, zero_page: i64) -> String {
        format!("{}/{}", self.collection_url(), zero_page)
    }

    fn annotation_url(&self, idx: i64) -> String {
        format!(
            "{}/wa/{}/{}/annotation/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.urn,
            self.kind,
            idx,
            self.format
        )
    }
}

pub async fn collection<S: TextPartStore + ?Sized>(
    pool: &SqlitePool,
    store: &S,
    request: &AnnotationRequest<'_>,
    per_page: i64,
) -> Result<AnnotationCollection> {
    let generator = generator_for_kind(request.kind)?;
    request.format.parse::<AnnotationFormat>()?;
    let anchor = require_text_part(store, request.urn).await?;

    let total = alignments::count_overlapping(pool, &anchor).await?;
    let paginator = Paginator::new(total, per_page);

    Ok(AnnotationCollection {
        context: ANNO_CONTEXT,
        id: request.collection_url(),
        kind: "AnnotationCollection",
        label: generator.label(request.urn),
        total,
        first: request.page_url(0),
        last: request.page_url(as_zero_based(paginator.num_pages())),
    })
}

/// The page at 0-based `zero_page`.
pub async fn page<S: TextPartStore + ?Sized>(
    pool: &SqlitePool,
    store: &S,
    request: &AnnotationRequest<'_>,
    zero_page: i64,
    per_page: i64,
) -> Result<AnnotationPage> {
    let generator = generator_for_kind(request.kind)?;
    let format: AnnotationFormat = request.format.parse()?;
    let anchor = require_text_part(store, request.urn).await?;

    let total = alignments::count_overlapping(pool, &anchor).await?;
    let page = Paginator::new(total, per_page).page(zero_page)?;

    let chunks = alignments::overlapping(pool, &anchor, page.per_page, page.offset()).await?;
    let items = chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let record = AlignmentRecord {
                idx: page.offset() + i as i64,
                chunk,
            };
            generator.generate(request.annotation_url(record.idx), &record, format)
        })
        .collect();

    Ok(AnnotationPage {
        context: ANNO_CONTEXT,
        id: request.page_url(zero_page),
        kind: "AnnotationPage",
        part_of: request.collection_url(),
        start_index: as_zero_based(page.start_index()),
        items,
        prev: page
            .previous_number()
            .map(|n| request.page_url(as_zero_based(n))),
        next: page.next_number().map(|n| request.page_url(as_zero_based(n))),
    })
}

/// The record numbered `idx` as a single annotation.
pub async fn annotation<S: TextPartStore + ?Sized>(
    pool: &SqlitePool,
    store: &S,
    request: &AnnotationRequest<'_>,
    idx: i64,
) -> Result<WebAnnotation> {
    let generator = generator_for_kind(request.kind)?;
    let format: AnnotationFormat = request.format.parse()?;
    let anchor = require_text_part(store, request.urn).await?;

    let not_found = || LibraryError::AnnotationNotFound {
        urn: request.urn.to_string(),
        idx,
    };
    if idx < 0 {
        return Err(not_found());
    }
    let chunk = alignments::overlapping(pool, &anchor, 1, idx)
        .await?
        .into_iter()
        .next()
        .ok_or_else(not_found)?;

    let record = AlignmentRecord { idx, chunk };
    Ok(generator.generate(request.annotation_url(idx), &record, format))
}
