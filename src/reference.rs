//! Passage reference parsing and resolution.
//!
//! A reference names a version and a position or range inside it:
//!
//! ```text
//! urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.1-1.10
//! └──────────── version urn ─────────────────┘└ range ┘
//! ```
//!
//! The version URN keeps its trailing `:`. Both ends of a range are looked
//! up at the same depth below the version, the one implied by the number of
//! dot-separated segments, so that refs repeated at different levels of the
//! tree never collide.

use crate::error::{LibraryError, Result};
use crate::models::TextPart;
use crate::store::TextPartStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub version_urn: String,
    pub start: String,
    pub end: String,
}

impl Reference {
    /// Parses `"<version_urn>:<ref>"` or `"<version_urn>:<ref>-<ref>"`.
    pub fn parse(value: &str) -> Result<Reference> {
        let (prefix, range) = value
            .rsplit_once(':')
            .ok_or_else(|| LibraryError::invalid_reference(value, "missing ':'"))?;
        if prefix.is_empty() {
            return Err(LibraryError::invalid_reference(value, "missing version urn"));
        }
        if range.is_empty() {
            return Err(LibraryError::invalid_reference(value, "missing passage range"));
        }

        let parts: Vec<&str> = range.split('-').collect();
        let (start, end) = match parts.as_slice() {
            [single] => (*single, *single),
            [start, end] => (*start, *end),
            _ => {
                return Err(LibraryError::invalid_reference(
                    value,
                    "a range has exactly one '-'",
                ))
            }
        };
        if start.is_empty() || end.is_empty() {
            return Err(LibraryError::invalid_reference(
                value,
                "both ends of a range must be present",
            ));
        }
        if segment_count(start) != segment_count(end) {
            return Err(LibraryError::invalid_reference(
                value,
                "both ends of a range must cite the same level",
            ));
        }

        Ok(Reference {
            version_urn: format!("{}:", prefix),
            start: start.to_string(),
            end: end.to_string(),
        })
    }

    pub fn is_range(&self) -> bool {
        self.start != self.end
    }

    /// Depth of the cited nodes relative to the version node.
    pub fn relative_depth(&self) -> i64 {
        segment_count(&self.start) as i64
    }
}

fn segment_count(reference: &str) -> usize {
    reference.split('.').count()
}

/// A reference resolved against the tree.
#[derive(Debug, Clone)]
pub struct ResolvedPassage {
    pub reference: Reference,
    pub version: TextPart,
    pub start: TextPart,
    pub end: TextPart,
}

impl ResolvedPassage {
    pub fn is_single(&self) -> bool {
        self.start.id == self.end.id
    }

    /// The canonical URN of the passage: the node's own URN for a single
    /// node, `{version_urn}{start_ref}-{end_ref}` for a range.
    pub fn urn(&self) -> String {
        passage_urn(
            &self.version.urn,
            (&self.start.urn, self.start.ref_or_empty()),
            (&self.end.urn, self.end.ref_or_empty()),
        )
    }
}

/// Builds a passage URN from its first and last `(urn, ref)` pairs.
pub fn passage_urn(version_urn: &str, first: (&str, &str), last: (&str, &str)) -> String {
    if first.0 == last.0 {
        return first.0.to_string();
    }
    format!("{}{}-{}", version_urn, first.1, last.1)
}

/// Resolves `value` to its version and start/end nodes.
pub async fn resolve<S: TextPartStore + ?Sized>(store: &S, value: &str) -> Result<ResolvedPassage> {
    let reference = Reference::parse(value)?;
    resolve_reference(store, reference).await
}

pub async fn resolve_reference<S: TextPartStore + ?Sized>(
    store: &S,
    reference: Reference,
) -> Result<ResolvedPassage> {
    let version = store
        .get_by_urn(&reference.version_urn)
        .await?
        .ok_or_else(|| LibraryError::VersionNotFound(reference.version_urn.clone()))?;

    let depth = version.depth + reference.relative_depth();
    let start = find_at_depth(store, &version, &reference.start, depth).await?;
    let end = if reference.is_range() {
        find_at_depth(store, &version, &reference.end, depth).await?
    } else {
        start.clone()
    };

    if end.lft < start.lft {
        return Err(LibraryError::invalid_reference(
            &format!("{}{}-{}", reference.version_urn, reference.start, reference.end),
            "range ends before it starts",
        ));
    }

    Ok(ResolvedPassage {
        reference,
        version,
        start,
        end,
    })
}

async fn find_at_depth<S: TextPartStore + ?Sized>(
    store: &S,
    version: &TextPart,
    reference: &str,
    depth: i64,
) -> Result<TextPart> {
    store
        .find_descendant_by_ref(version, reference, depth)
        .await?
        .ok_or_else(|| LibraryError::ReferenceNotFound {
            version: version.urn.clone(),
            reference: reference.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{fixtures, flatten, CorpusNode};
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn store() -> InMemoryStore {
        InMemoryStore::from_corpus(&flatten(&fixtures::iliad().nodes).unwrap())
    }

    fn reference(range: &str) -> String {
        format!("{}{}", fixtures::VERSION_URN, range)
    }

    #[test]
    fn test_parse_single() {
        let r = Reference::parse(&reference("1.10")).unwrap();
        assert_eq!(r.version_urn, fixtures::VERSION_URN);
        assert_eq!(r.start, "1.10");
        assert_eq!(r.end, "1.10");
        assert!(!r.is_range());
        assert_eq!(r.relative_depth(), 2);
    }

    #[test]
    fn test_parse_range_splits_on_last_colon() {
        let r = Reference::parse("urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:1.1-1.10").unwrap();
        assert_eq!(r.version_urn, "urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:");
        assert_eq!(r.start, "1.1");
        assert_eq!(r.end, "1.10");
        assert!(r.is_range());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let malformed = vec![
            "no-colon-here".to_string(),
            ":1.1".to_string(),
            reference(""),
            reference("1.1-"),
            reference("-1.1"),
            reference("1.1-1.2-1.3"),
            reference("1-1.2"),
        ];
        for bad in &malformed {
            assert!(
                matches!(
                    Reference::parse(bad),
                    Err(LibraryError::InvalidReference { .. })
                ),
                "expected {} to be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_single_line() {
        let store = store();
        let passage = resolve(&store, &reference("2.3")).await.unwrap();
        assert!(passage.is_single());
        assert_eq!(passage.start.urn, reference("2.3"));
        assert_eq!(passage.version.urn, fixtures::VERSION_URN);
    }

    #[tokio::test]
    async fn test_resolve_round_trips_urn() {
        let store = store();
        for r in ["1", "1.1", "1.1-1.10", "1-2", "2.5", "1.12-2.1"] {
            let passage = resolve(&store, &reference(r)).await.unwrap();
            assert_eq!(passage.urn(), reference(r));
        }
    }

    #[tokio::test]
    async fn test_resolve_unknown_version() {
        let store = store();
        let err = resolve(&store, "urn:cts:greekLit:tlg9999.tlg001.x:1.1")
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::VersionNotFound(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_unknown_ref() {
        let store = store();
        let err = resolve(&store, &reference("1.1-1.99")).await.unwrap_err();
        assert!(matches!(err, LibraryError::ReferenceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_resolve_backwards_range_rejected() {
        let store = store();
        let err = resolve(&store, &reference("2.1-1.1")).await.unwrap_err();
        assert!(matches!(err, LibraryError::InvalidReference { .. }));
    }

    #[tokio::test]
    async fn test_depth_disambiguates_repeated_refs() {
        // Book "2" comes first in document order and numbers its own
        // sections from "1", so "1" and "1.1" both occur one level deeper
        // than the book "1" and its line "1.1".
        let version = "urn:cts:latinLit:phi0001.phi001.x:";
        let nodes: Vec<CorpusNode> = serde_json::from_value(json!([{
            "urn": version, "kind": "version", "rank": 1,
            "children": [
                {
                    "urn": format!("{}2", version), "ref": "2", "kind": "book", "rank": 2,
                    "children": [{
                        "urn": format!("{}2.s1", version), "ref": "1", "kind": "section", "rank": 3,
                        "children": [{
                            "urn": format!("{}2.s1.1", version), "ref": "1.1", "kind": "line", "rank": 4
                        }]
                    }]
                },
                {
                    "urn": format!("{}1", version), "ref": "1", "kind": "book", "rank": 2,
                    "children": [{
                        "urn": format!("{}1.1", version), "ref": "1.1", "kind": "line", "rank": 3
                    }]
                }
            ]
        }]))
        .unwrap();
        let store = InMemoryStore::from_corpus(&flatten(&nodes).unwrap());

        let passage = resolve(&store, &format!("{}1", version)).await.unwrap();
        assert_eq!(passage.start.kind, "book");
        assert_eq!(passage.start.urn, format!("{}1", version));

        let passage = resolve(&store, &format!("{}1.1", version)).await.unwrap();
        assert_eq!(passage.start.urn, format!("{}1.1", version));
        assert_eq!(passage.start.depth, passage.version.depth + 2);
    }
}
