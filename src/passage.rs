//! Passage queries: leaf text parts plus ancestor / sibling / children
//! metadata for a resolved reference.

use serde::Serialize;

use crate::error::Result;
use crate::models::{TextPart, TextPartResponse};
use crate::reference::{passage_urn, resolve, ResolvedPassage};
use crate::store::TextPartStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestorRef {
    #[serde(rename = "ref")]
    pub reference: String,
    pub urn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiblingLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRef {
    pub lsb: String,
    pub urn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageMetadata {
    pub ancestors: Vec<AncestorRef>,
    pub siblings: SiblingLinks,
    pub children: Vec<ChildRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassageResponse {
    pub reference: String,
    pub urn: String,
    pub version_urn: String,
    pub text_parts: Vec<TextPartResponse>,
    pub metadata: PassageMetadata,
}

/// Resolves `reference` and assembles its leaf text parts and metadata.
pub async fn get_passage<S: TextPartStore + ?Sized>(
    store: &S,
    reference: &str,
) -> Result<PassageResponse> {
    let passage = resolve(store, reference).await?;
    let leaves = store.leaves_between(&passage.start, &passage.end).await?;
    let metadata = build_metadata(store, &passage).await?;

    Ok(PassageResponse {
        reference: reference.to_string(),
        urn: passage.urn(),
        version_urn: passage.version.urn.clone(),
        text_parts: leaves.iter().map(TextPartResponse::from).collect(),
        metadata,
    })
}

pub async fn build_metadata<S: TextPartStore + ?Sized>(
    store: &S,
    passage: &ResolvedPassage,
) -> Result<PassageMetadata> {
    let start = &passage.start;

    Ok(PassageMetadata {
        ancestors: ancestor_metadata(&passage.version, start),
        siblings: sibling_metadata(store, &passage.version, start, &passage.end).await?,
        children: children_metadata(store, start).await?,
    })
}

/// The first ancestor of `node`, clipped at the version boundary.
pub fn ancestor_metadata(version: &TextPart, node: &TextPart) -> Vec<AncestorRef> {
    if node.parent_id == Some(version.id) {
        return Vec::new();
    }
    let Some((ancestor_urn, _)) = node.urn.rsplit_once('.') else {
        return Vec::new();
    };
    let Some((_, ancestor_ref)) = ancestor_urn.rsplit_once(':') else {
        return Vec::new();
    };
    vec![AncestorRef {
        reference: ancestor_ref.to_string(),
        urn: ancestor_urn.to_string(),
    }]
}

/// Previous and next passages adjacent to the `start..=end` span. A span
/// that crosses parents takes its previous link from `start`'s siblings and
/// its next link from `end`'s.
pub async fn sibling_metadata<S: TextPartStore + ?Sized>(
    store: &S,
    version: &TextPart,
    start: &TextPart,
    end: &TextPart,
) -> Result<SiblingLinks> {
    let (previous, next) = if start.parent_id == end.parent_id {
        let count = end.idx - start.idx + 1;
        prev_next_boundaries(store, start, start.idx, count).await?
    } else {
        let (previous, _) = prev_next_boundaries(store, start, start.idx, 1).await?;
        let (_, next) = prev_next_boundaries(store, end, end.idx, 1).await?;
        (previous, next)
    };
    Ok(SiblingLinks {
        previous: boundary_urn(version, &previous),
        next: boundary_urn(version, &next),
    })
}

fn boundary_urn(version: &TextPart, nodes: &[TextPart]) -> Option<String> {
    let (first, last) = (nodes.first()?, nodes.last()?);
    Some(passage_urn(
        &version.urn,
        (&first.urn, first.ref_or_empty()),
        (&last.urn, last.ref_or_empty()),
    ))
}

/// Returns the sibling just before `start_idx` and the one just after the
/// `count`-long span starting there. Each side is a one-slot idx window on
/// the sibling index, so the full sibling set is never loaded.
pub async fn prev_next_boundaries<S: TextPartStore + ?Sized>(
    store: &S,
    anchor: &TextPart,
    start_idx: i64,
    count: i64,
) -> Result<(Vec<TextPart>, Vec<TextPart>)> {
    let previous = if start_idx > 0 {
        store
            .siblings_in_range(anchor, start_idx - 1, start_idx - 1)
            .await?
    } else {
        Vec::new()
    };

    let next_idx = start_idx + count;
    let next = store.siblings_in_range(anchor, next_idx, next_idx).await?;

    Ok((previous, next))
}

pub async fn children_metadata<S: TextPartStore + ?Sized>(
    store: &S,
    node: &TextPart,
) -> Result<Vec<ChildRef>> {
    Ok(store
        .children(node)
        .await?
        .into_iter()
        .map(|child| ChildRef {
            lsb: least_significant_segment(child.ref_or_empty()).to_string(),
            urn: child.urn,
        })
        .collect())
}

/// Last dot-separated segment of a ref: `"1.10"` → `"10"`.
pub fn least_significant_segment(reference: &str) -> &str {
    reference
        .rsplit_once('.')
        .map_or(reference, |(_, last)| last)
}
