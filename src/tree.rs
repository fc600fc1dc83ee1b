//! Nested JSON dump of a subtree.

use serde::Serialize;

use crate::error::{LibraryError, Result};
use crate::models::TextPart;
use crate::store::TextPartStore;

#[derive(Debug, Clone, Serialize)]
pub struct TreeData {
    pub urn: String,
    pub kind: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub rank: i64,
    pub depth: i64,
    pub idx: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub data: TreeData,
    pub children: Vec<TreeNode>,
}

impl From<&TextPart> for TreeData {
    fn from(tp: &TextPart) -> Self {
        Self {
            urn: tp.urn.clone(),
            kind: tp.kind.clone(),
            reference: tp.reference.clone(),
            label: tp.label.clone(),
            rank: tp.rank,
            depth: tp.depth,
            idx: tp.idx,
        }
    }
}

/// Loads the subtree under `urn` and nests it. Nodes whose kind equals
/// `up_to` are emitted as leaves.
pub async fn load_tree<S: TextPartStore + ?Sized>(
    store: &S,
    urn: &str,
    up_to: Option<&str>,
) -> Result<Vec<TreeNode>> {
    let root = store
        .get_by_urn(urn)
        .await?
        .ok_or_else(|| LibraryError::TextPartNotFound(urn.to_string()))?;
    let descendants = store.descendants(&root, i64::MAX, 0).await?;
    Ok(dump_tree(&root, &descendants, up_to))
}

/// Nests `descendants` (the root's subtree in document order) under `root`.
pub fn dump_tree(root: &TextPart, descendants: &[TextPart], up_to: Option<&str>) -> Vec<TreeNode> {
    let mut nodes = Vec::with_capacity(descendants.len() + 1);
    nodes.push(root);
    nodes.extend(descendants.iter().filter(|d| root.contains(d)));

    let mut pos = 0;
    vec![nest(&nodes, &mut pos, up_to)]
}

fn nest(nodes: &[&TextPart], pos: &mut usize, up_to: Option<&str>) -> TreeNode {
    let node = nodes[*pos];
    *pos += 1;

    let mut children = Vec::new();
    let stop = up_to == Some(node.kind.as_str());
    while *pos < nodes.len() && nodes[*pos].lft < node.rgt {
        if stop {
            *pos += 1;
        } else {
            children.push(nest(nodes, pos, up_to));
        }
    }

    TreeNode {
        data: TreeData::from(node),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{fixtures, flatten};
    use crate::store::memory::InMemoryStore;

    fn store() -> InMemoryStore {
        InMemoryStore::from_corpus(&flatten(&fixtures::iliad().nodes).unwrap())
    }

    fn count(nodes: &[TreeNode]) -> usize {
        nodes.iter().map(|n| 1 + count(&n.children)).sum()
    }

    #[tokio::test]
    async fn test_full_version_tree() {
        let tree = load_tree(&store(), fixtures::VERSION_URN, None).await.unwrap();
        assert_eq!(tree.len(), 1);
        let version = &tree[0];
        assert_eq!(version.data.urn, fixtures::VERSION_URN);
        assert_eq!(version.children.len(), 3);
        assert_eq!(version.children[0].children.len(), 12);
        assert_eq!(version.children[1].children.len(), 5);
        // version + 3 books + 20 lines
        assert_eq!(count(&tree), 24);
    }

    #[tokio::test]
    async fn test_up_to_kind_stops_descent() {
        let tree = load_tree(&store(), fixtures::VERSION_URN, Some("book"))
            .await
            .unwrap();
        let books = &tree[0].children;
        assert_eq!(books.len(), 3);
        assert!(books.iter().all(|b| b.children.is_empty()));
        assert_eq!(books[2].data.reference.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_unknown_root() {
        let err = load_tree(&store(), "urn:cts:greekLit:nope:", None)
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::TextPartNotFound(_)));
    }

    #[test]
    fn test_tree_serializes_ref_key() {
        let flat = flatten(&fixtures::iliad().nodes).unwrap();
        let line = flat
            .node(&format!("{}1.1", fixtures::VERSION_URN))
            .unwrap()
            .clone();
        let tree = dump_tree(&line, &[], None);
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value[0]["data"]["ref"], "1.1");
        assert_eq!(value[0]["children"], serde_json::json!([]));
    }
}
