//! In-memory [`TextPartStore`] implementation for tests and ad-hoc corpora.
//!
//! Nodes are kept in pre-order (sorted by `lft`), so range scans are slices
//! located with binary search.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::corpus::FlatCorpus;
use crate::error::Result;
use crate::models::TextPart;

use super::{ancestor_paths, TextPartFilter, TextPartStore};

pub struct InMemoryStore {
    nodes: Vec<TextPart>,
    by_urn: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
    children: HashMap<Option<i64>, Vec<usize>>,
}

impl InMemoryStore {
    pub fn new(mut nodes: Vec<TextPart>) -> Self {
        nodes.sort_by_key(|n| n.lft);

        let mut by_urn = HashMap::new();
        let mut by_path = HashMap::new();
        let mut children: HashMap<Option<i64>, Vec<usize>> = HashMap::new();
        for (i, n) in nodes.iter().enumerate() {
            by_urn.insert(n.urn.clone(), i);
            by_path.insert(n.path.clone(), i);
            children.entry(n.parent_id).or_default().push(i);
        }
        for list in children.values_mut() {
            list.sort_by_key(|&i| nodes[i].idx);
        }

        Self {
            nodes,
            by_urn,
            by_path,
            children,
        }
    }

    pub fn from_corpus(flat: &FlatCorpus) -> Self {
        Self::new(flat.nodes.clone())
    }

    /// Nodes with `lo < lft < hi`, in document order.
    fn interior(&self, lo: i64, hi: i64) -> &[TextPart] {
        let start = self.nodes.partition_point(|n| n.lft <= lo);
        let end = self.nodes.partition_point(|n| n.lft < hi);
        &self.nodes[start..end.max(start)]
    }

    fn sibling_indexes(&self, node: &TextPart) -> &[usize] {
        self.children
            .get(&node.parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl TextPartStore for InMemoryStore {
    async fn get_by_urn(&self, urn: &str) -> Result<Option<TextPart>> {
        Ok(self.by_urn.get(urn).map(|&i| self.nodes[i].clone()))
    }

    async fn find_descendant_by_ref(
        &self,
        root: &TextPart,
        reference: &str,
        depth: i64,
    ) -> Result<Option<TextPart>> {
        Ok(self
            .interior(root.lft, root.rgt)
            .iter()
            .find(|n| n.depth == depth && n.reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn children(&self, node: &TextPart) -> Result<Vec<TextPart>> {
        Ok(self
            .children
            .get(&Some(node.id))
            .map(|list| list.iter().map(|&i| self.nodes[i].clone()).collect())
            .unwrap_or_default())
    }

    async fn ancestors(&self, node: &TextPart) -> Result<Vec<TextPart>> {
        Ok(ancestor_paths(&node.path)
            .iter()
            .filter_map(|p| self.by_path.get(p).map(|&i| self.nodes[i].clone()))
            .collect())
    }

    async fn descendants(
        &self,
        node: &TextPart,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TextPart>> {
        Ok(self
            .interior(node.lft, node.rgt)
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn siblings(&self, node: &TextPart) -> Result<Vec<TextPart>> {
        Ok(self
            .sibling_indexes(node)
            .iter()
            .map(|&i| self.nodes[i].clone())
            .collect())
    }

    async fn siblings_in_range(
        &self,
        node: &TextPart,
        first_idx: i64,
        last_idx: i64,
    ) -> Result<Vec<TextPart>> {
        let siblings = self.sibling_indexes(node);
        let start = siblings.partition_point(|&i| self.nodes[i].idx < first_idx);
        Ok(siblings[start..]
            .iter()
            .map(|&i| &self.nodes[i])
            .take_while(|n| n.idx <= last_idx)
            .cloned()
            .collect())
    }

    async fn leaves_between(&self, start: &TextPart, end: &TextPart) -> Result<Vec<TextPart>> {
        let first = self.nodes.partition_point(|n| n.lft < start.lft);
        let last = self.nodes.partition_point(|n| n.lft <= end.rgt);
        Ok(self.nodes[first..last.max(first)]
            .iter()
            .filter(|n| n.is_leaf())
            .cloned()
            .collect())
    }

    async fn filter(
        &self,
        filter: &TextPartFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TextPart>> {
        Ok(self
            .nodes
            .iter()
            .filter(|n| filter.matches(n))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{fixtures, flatten};

    fn store() -> InMemoryStore {
        InMemoryStore::from_corpus(&flatten(&fixtures::iliad().nodes).unwrap())
    }

    async fn node(store: &InMemoryStore, suffix: &str) -> TextPart {
        store
            .get_by_urn(&format!("{}{}", fixtures::VERSION_URN, suffix))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_children_ordered() {
        let store = store();
        let version = node(&store, "").await;
        let books = store.children(&version).await.unwrap();
        let refs: Vec<_> = books.iter().map(|b| b.ref_or_empty()).collect();
        assert_eq!(refs, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_ancestors_root_first() {
        let store = store();
        let line = node(&store, "2.2").await;
        let kinds: Vec<_> = store
            .ancestors(&line)
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(kinds, vec!["textgroup", "work", "version", "book"]);
    }

    #[tokio::test]
    async fn test_siblings_in_range_window() {
        let store = store();
        let line = node(&store, "1.5").await;
        let window = store.siblings_in_range(&line, 3, 5).await.unwrap();
        let refs: Vec<_> = window.iter().map(|n| n.ref_or_empty()).collect();
        assert_eq!(refs, vec!["1.4", "1.5", "1.6"]);

        assert!(store.siblings_in_range(&line, 40, 41).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_leaves_between_books() {
        let store = store();
        let book1 = node(&store, "1").await;
        let book2 = node(&store, "2").await;
        let leaves = store.leaves_between(&book1, &book2).await.unwrap();
        assert_eq!(leaves.len(), 17);
        assert_eq!(leaves[0].ref_or_empty(), "1.1");
        assert_eq!(leaves[16].ref_or_empty(), "2.5");
    }

    #[tokio::test]
    async fn test_descendants_paginated() {
        let store = store();
        let book3 = node(&store, "3").await;
        let page = store.descendants(&book3, 2, 1).await.unwrap();
        let refs: Vec<_> = page.iter().map(|n| n.ref_or_empty()).collect();
        assert_eq!(refs, vec!["3.2", "3.3"]);
    }

    #[tokio::test]
    async fn test_filter_by_depth_and_prefix() {
        let store = store();
        let filter = TextPartFilter {
            depth: Some(5),
            ref_startswith: Some("3.".into()),
            ..Default::default()
        };
        let found = store.filter(&filter, 100, 0).await.unwrap();
        assert_eq!(found.len(), 3);
    }
}
