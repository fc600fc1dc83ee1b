//! Version and text-part queries behind the JSON endpoints.

use serde_json::Value;

use crate::error::{LibraryError, Result};
use crate::models::{TextPart, TextPartResponse};
use crate::reference::resolve;
use crate::store::{TextPartFilter, TextPartStore};
use crate::urn::{Urn, UrnLevel};

const VERSION_KIND: &str = "version";

/// Versions ordered by URN.
pub async fn list_versions<S: TextPartStore + ?Sized>(
    store: &S,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextPartResponse>> {
    let filter = TextPartFilter {
        kind: Some(VERSION_KIND.to_string()),
        ..Default::default()
    };
    let mut versions = store.filter(&filter, i64::MAX, 0).await?;
    versions.sort_by(|a, b| a.urn.cmp(&b.urn));
    Ok(versions
        .iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .map(version_response)
        .collect())
}

pub async fn get_version<S: TextPartStore + ?Sized>(
    store: &S,
    urn: &str,
) -> Result<TextPartResponse> {
    match store.get_by_urn(urn).await? {
        Some(tp) if tp.kind == VERSION_KIND => Ok(version_response(&tp)),
        _ => Err(LibraryError::VersionNotFound(urn.to_string())),
    }
}

/// A version's response, with `workUrn` added to its metadata.
pub fn version_response(version: &TextPart) -> TextPartResponse {
    let mut tp = version.clone();
    let source = tp
        .metadata
        .get("first_passage_urn")
        .and_then(Value::as_str)
        .unwrap_or(&version.urn)
        .to_string();
    let work_urn = Urn::parse(&source).and_then(|u| u.up_to(UrnLevel::Work));
    if let (Some(map), Some(work_urn)) = (tp.metadata.as_object_mut(), work_urn) {
        map.insert("work_urn".to_string(), Value::String(work_urn));
    }
    TextPartResponse::from(&tp)
}

/// Text parts matching `filter`. With a `reference`, only the resolved start
/// and end nodes are candidates.
pub async fn filter_text_parts<S: TextPartStore + ?Sized>(
    store: &S,
    filter: &TextPartFilter,
    reference: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextPartResponse>> {
    let parts = match reference {
        Some(reference) => {
            let passage = resolve(store, reference).await?;
            let mut ends = vec![passage.start.clone()];
            if !passage.is_single() {
                ends.push(passage.end.clone());
            }
            ends.retain(|tp| filter.matches(tp));
            window(ends, limit, offset.max(0))
        }
        None => store.filter(filter, limit, offset).await?,
    };
    Ok(parts.iter().map(TextPartResponse::from).collect())
}

pub async fn require_text_part<S: TextPartStore + ?Sized>(store: &S, urn: &str) -> Result<TextPart> {
    store
        .get_by_urn(urn)
        .await?
        .ok_or_else(|| LibraryError::TextPartNotFound(urn.to_string()))
}

/// The traversal views of `/text-parts/{urn}/...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Children,
    Ancestors,
    Descendants,
    Siblings,
}

pub async fn related<S: TextPartStore + ?Sized>(
    store: &S,
    urn: &str,
    relation: Relation,
    limit: i64,
    offset: i64,
) -> Result<Vec<TextPartResponse>> {
    let node = require_text_part(store, urn).await?;
    let offset = offset.max(0);

    // Descendants page in the store; the other views are small enough to
    // window here.
    let parts = match relation {
        Relation::Descendants => store.descendants(&node, limit, offset).await?,
        Relation::Children => window(store.children(&node).await?, limit, offset),
        Relation::Ancestors => window(store.ancestors(&node).await?, limit, offset),
        Relation::Siblings => window(store.siblings(&node).await?, limit, offset),
    };
    Ok(parts.iter().map(TextPartResponse::from).collect())
}

fn window(parts: Vec<TextPart>, limit: i64, offset: i64) -> Vec<TextPart> {
    parts
        .into_iter()
        .skip(offset as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{fixtures, flatten};
    use crate::store::memory::InMemoryStore;

    fn store() -> InMemoryStore {
        InMemoryStore::from_corpus(&flatten(&fixtures::iliad().nodes).unwrap())
    }

    fn urn(range: &str) -> String {
        format!("{}{}", fixtures::VERSION_URN, range)
    }

    #[tokio::test]
    async fn test_versions_carry_work_urn() {
        let versions = list_versions(&store(), 100, 0).await.unwrap();
        assert_eq!(versions.len(), 1);
        let metadata = &versions[0].metadata;
        assert_eq!(metadata["workUrn"], "urn:cts:greekLit:tlg0012.tlg001:");
        assert_eq!(metadata["citationScheme"][0], "book");
        assert!(metadata.get("first_passage_urn").is_none());
    }

    #[tokio::test]
    async fn test_get_version_rejects_other_kinds() {
        let store = store();
        assert!(get_version(&store, fixtures::VERSION_URN).await.is_ok());
        let err = get_version(&store, &urn("1")).await.unwrap_err();
        assert!(matches!(err, LibraryError::VersionNotFound(_)));
    }

    #[test]
    fn test_work_urn_falls_back_to_version_urn() {
        let flat = flatten(&fixtures::iliad().nodes).unwrap();
        let mut version = flat.node(fixtures::VERSION_URN).unwrap().clone();
        version.metadata = serde_json::json!({});
        let response = version_response(&version);
        assert_eq!(
            response.metadata["workUrn"],
            "urn:cts:greekLit:tlg0012.tlg001:"
        );
    }

    #[tokio::test]
    async fn test_filter_by_reference_returns_ends() {
        let store = store();
        let parts = filter_text_parts(
            &store,
            &TextPartFilter::default(),
            Some(&urn("1.2-1.4")),
            100,
            0,
        )
        .await
        .unwrap();
        let urns: Vec<_> = parts.iter().map(|p| p.urn.clone()).collect();
        assert_eq!(urns, vec![urn("1.2"), urn("1.4")]);

        let single = filter_text_parts(&store, &TextPartFilter::default(), Some(&urn("2")), 100, 0)
            .await
            .unwrap();
        assert_eq!(single.len(), 1);
    }

    #[tokio::test]
    async fn test_filter_fields() {
        let store = store();
        let filter = TextPartFilter {
            kind: Some("line".into()),
            ref_startswith: Some("3.".into()),
            ..Default::default()
        };
        let parts = filter_text_parts(&store, &filter, None, 100, 0).await.unwrap();
        assert_eq!(parts.len(), 3);
    }

    #[tokio::test]
    async fn test_related_views() {
        let store = store();
        let children = related(&store, &urn("2"), Relation::Children, 100, 0)
            .await
            .unwrap();
        assert_eq!(children.len(), 5);

        let ancestors = related(&store, &urn("2.1"), Relation::Ancestors, 100, 0)
            .await
            .unwrap();
        let kinds: Vec<_> = ancestors.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["textgroup", "work", "version", "book"]);

        let siblings = related(&store, &urn("2"), Relation::Siblings, 100, 0)
            .await
            .unwrap();
        assert_eq!(siblings.len(), 3);

        let descendants = related(&store, &urn("1"), Relation::Descendants, 5, 10)
            .await
            .unwrap();
        assert_eq!(descendants.len(), 2);
        assert_eq!(descendants[0].urn, urn("1.11"));

        let err = related(&store, &urn("7"), Relation::Children, 100, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::TextPartNotFound(_)));
    }
}
