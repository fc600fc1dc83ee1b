//! Storage abstraction for the text tree.
//!
//! The [`TextPartStore`] trait is the traversal capability the resolver and
//! the passage metadata builder depend on. Every method maps onto a range
//! scan over the materialized-path / nested-interval index:
//!
//! | Method | Index used |
//! |--------|------------|
//! | [`find_descendant_by_ref`](TextPartStore::find_descendant_by_ref) | `lft` range + `depth` + `ref` |
//! | [`children`](TextPartStore::children) | `(parent_id, idx)` |
//! | [`siblings_in_range`](TextPartStore::siblings_in_range) | `(parent_id, idx)` window |
//! | [`ancestors`](TextPartStore::ancestors) | path prefixes |
//! | [`descendants`](TextPartStore::descendants) | `lft` range |
//! | [`leaves_between`](TextPartStore::leaves_between) | `lft` range + `rgt = lft + 1` |
//!
//! Implementations must be `Send + Sync` to be shared across request handlers.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;
use crate::models::TextPart;

/// Width of one materialized-path step.
pub const PATH_STEP: usize = 6;

/// Field filters accepted by `GET /text-parts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextPartFilter {
    pub urn: Option<String>,
    pub urn_startswith: Option<String>,
    #[serde(rename = "ref")]
    pub reference_exact: Option<String>,
    pub ref_startswith: Option<String>,
    pub depth: Option<i64>,
    pub depth_lt: Option<i64>,
    pub depth_gt: Option<i64>,
    pub rank: Option<i64>,
    pub rank_lt: Option<i64>,
    pub rank_gt: Option<i64>,
    pub kind: Option<String>,
    pub idx: Option<i64>,
}

impl TextPartFilter {
    pub fn matches(&self, tp: &TextPart) -> bool {
        let tp_ref = tp.reference.as_deref();
        self.urn.as_deref().map_or(true, |u| tp.urn == u)
            && self
                .urn_startswith
                .as_deref()
                .map_or(true, |p| tp.urn.starts_with(p))
            && self
                .reference_exact
                .as_deref()
                .map_or(true, |r| tp_ref == Some(r))
            && self
                .ref_startswith
                .as_deref()
                .map_or(true, |p| tp_ref.is_some_and(|r| r.starts_with(p)))
            && self.depth.map_or(true, |d| tp.depth == d)
            && self.depth_lt.map_or(true, |d| tp.depth < d)
            && self.depth_gt.map_or(true, |d| tp.depth > d)
            && self.rank.map_or(true, |r| tp.rank == r)
            && self.rank_lt.map_or(true, |r| tp.rank < r)
            && self.rank_gt.map_or(true, |r| tp.rank > r)
            && self.kind.as_deref().map_or(true, |k| tp.kind == k)
            && self.idx.map_or(true, |i| tp.idx == i)
    }
}

/// Read-only traversal over the stored text tree.
#[async_trait]
pub trait TextPartStore: Send + Sync {
    /// Look up a node by its URN.
    async fn get_by_urn(&self, urn: &str) -> Result<Option<TextPart>>;

    /// Find the descendant of `root` at exactly `depth` whose ref equals
    /// `reference`.
    async fn find_descendant_by_ref(
        &self,
        root: &TextPart,
        reference: &str,
        depth: i64,
    ) -> Result<Option<TextPart>>;

    /// Direct children, ordered by idx.
    async fn children(&self, node: &TextPart) -> Result<Vec<TextPart>>;

    /// All ancestors, root first.
    async fn ancestors(&self, node: &TextPart) -> Result<Vec<TextPart>>;

    /// Descendants in document order, paginated.
    async fn descendants(&self, node: &TextPart, limit: i64, offset: i64)
        -> Result<Vec<TextPart>>;

    /// Every sibling of `node` (itself included), ordered by idx.
    async fn siblings(&self, node: &TextPart) -> Result<Vec<TextPart>>;

    /// Siblings of `node` whose idx lies in `first_idx..=last_idx`.
    async fn siblings_in_range(
        &self,
        node: &TextPart,
        first_idx: i64,
        last_idx: i64,
    ) -> Result<Vec<TextPart>>;

    /// Leaves in document order from the first leaf under `start` through
    /// the last leaf under `end`.
    async fn leaves_between(&self, start: &TextPart, end: &TextPart) -> Result<Vec<TextPart>>;

    /// Nodes matching `filter`, ordered by path.
    async fn filter(&self, filter: &TextPartFilter, limit: i64, offset: i64)
        -> Result<Vec<TextPart>>;
}

/// Splits a materialized path into the paths of its proper ancestors.
pub fn ancestor_paths(path: &str) -> Vec<String> {
    let steps = path.len() / PATH_STEP;
    (1..steps).map(|n| path[..n * PATH_STEP].to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestor_paths() {
        assert_eq!(
            ancestor_paths("000000000001000002"),
            vec!["000000".to_string(), "000000000001".to_string()]
        );
        assert!(ancestor_paths("000003").is_empty());
    }
}
