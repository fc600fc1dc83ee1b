//! Corpus file format and tree flattening.
//!
//! A corpus file is a JSON document with a nested `nodes` tree plus the
//! annotation layers that point into it by URN. [`flatten`] walks the tree
//! once in pre-order and assigns every node its `idx`, `depth`, materialized
//! `path`, and nested-interval bounds.
//!
//! ```json
//! {
//!   "nodes": [{
//!     "urn": "urn:cts:greekLit:tlg0012:", "kind": "textgroup", "rank": 1,
//!     "children": [{ "urn": "urn:cts:greekLit:tlg0012.tlg001:", "kind": "work", "rank": 2,
//!       "children": [{ "urn": "urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:", "kind": "version",
//!         "rank": 3, "children": [{ "urn": "...:1", "ref": "1", "kind": "book", "rank": 4 }] }] }]
//!   }],
//!   "alignments": [], "text_annotations": [], "image_annotations": [],
//!   "audio_annotations": [], "named_entities": []
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LibraryError, Result};
use crate::models::TextPart;
use crate::store::PATH_STEP;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorpusFile {
    #[serde(default)]
    pub nodes: Vec<CorpusNode>,
    #[serde(default)]
    pub alignments: Vec<CorpusAlignment>,
    #[serde(default)]
    pub text_annotations: Vec<CorpusAnnotation>,
    #[serde(default)]
    pub image_annotations: Vec<CorpusAnnotation>,
    #[serde(default)]
    pub audio_annotations: Vec<CorpusAnnotation>,
    #[serde(default)]
    pub named_entities: Vec<CorpusEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusNode {
    pub urn: String,
    pub kind: String,
    pub rank: i64,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    #[serde(default)]
    pub tokens: Vec<CorpusToken>,
    #[serde(default)]
    pub children: Vec<CorpusNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusToken {
    pub value: String,
    #[serde(default)]
    pub word_value: Option<String>,
    #[serde(default)]
    pub subref_value: Option<String>,
    #[serde(default)]
    pub lemma: Option<String>,
    #[serde(default)]
    pub gloss: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusAlignment {
    pub name: String,
    pub slug: String,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    #[serde(default)]
    pub chunks: Vec<CorpusChunk>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusChunk {
    pub citation: String,
    pub version: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusAnnotation {
    pub urn: String,
    #[serde(default = "default_annotation_kind")]
    pub kind: String,
    #[serde(default = "empty_object")]
    pub data: Value,
    #[serde(default)]
    pub text_parts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusEntity {
    pub urn: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "empty_object")]
    pub data: Value,
    #[serde(default)]
    pub text_parts: Vec<String>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn default_annotation_kind() -> String {
    "annotation".to_string()
}

/// A flattened token with its owning text part resolved to an id.
#[derive(Debug, Clone)]
pub struct FlatToken {
    pub text_part_id: i64,
    pub source: CorpusToken,
    pub position: i64,
    pub idx: i64,
}

/// The tree after [`flatten`]: nodes in pre-order plus their tokens.
#[derive(Debug, Clone, Default)]
pub struct FlatCorpus {
    pub nodes: Vec<TextPart>,
    pub tokens: Vec<FlatToken>,
    by_urn: HashMap<String, usize>,
}

impl FlatCorpus {
    pub fn node(&self, urn: &str) -> Option<&TextPart> {
        self.by_urn.get(urn).map(|&i| &self.nodes[i])
    }

    /// Looks up a node id, failing the ingest when the URN is unknown.
    pub fn require_id(&self, urn: &str, context: &str) -> Result<i64> {
        self.node(urn).map(|n| n.id).ok_or_else(|| {
            LibraryError::InvalidCorpus(format!("{} references unknown urn {}", context, urn))
        })
    }
}

pub fn load_corpus_file(path: &Path) -> anyhow::Result<CorpusFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    let corpus: CorpusFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse corpus file: {}", path.display()))?;
    Ok(corpus)
}

/// Flattens the nested node tree, assigning ids in pre-order starting at 1.
pub fn flatten(roots: &[CorpusNode]) -> Result<FlatCorpus> {
    let mut flat = FlatCorpus::default();
    let mut counter = 0i64;
    for (idx, root) in roots.iter().enumerate() {
        visit(root, None, "", idx as i64, 1, &mut counter, &mut flat)?;
    }
    Ok(flat)
}

fn visit(
    node: &CorpusNode,
    parent_id: Option<i64>,
    parent_path: &str,
    idx: i64,
    depth: i64,
    counter: &mut i64,
    flat: &mut FlatCorpus,
) -> Result<()> {
    if node.urn.is_empty() {
        return Err(LibraryError::InvalidCorpus("node with empty urn".into()));
    }
    if flat.by_urn.contains_key(&node.urn) {
        return Err(LibraryError::InvalidCorpus(format!(
            "duplicate urn {}",
            node.urn
        )));
    }
    if idx >= 10i64.pow(PATH_STEP as u32) {
        return Err(LibraryError::InvalidCorpus(format!(
            "{} has more siblings than the path key can order",
            node.urn
        )));
    }
    if !node.metadata.is_object() {
        return Err(LibraryError::InvalidCorpus(format!(
            "metadata of {} must be an object",
            node.urn
        )));
    }

    *counter += 1;
    let lft = *counter;
    let id = flat.nodes.len() as i64 + 1;
    let path = format!("{}{:0width$}", parent_path, idx, width = PATH_STEP);

    let slot = flat.nodes.len();
    flat.by_urn.insert(node.urn.clone(), slot);
    flat.nodes.push(TextPart {
        id,
        urn: node.urn.clone(),
        reference: node.reference.clone(),
        idx,
        depth,
        rank: node.rank,
        kind: node.kind.clone(),
        label: node.label.clone(),
        text_content: node.text_content.clone(),
        metadata: node.metadata.clone(),
        parent_id,
        path: path.clone(),
        lft,
        rgt: 0,
    });

    for (i, token) in node.tokens.iter().enumerate() {
        flat.tokens.push(FlatToken {
            text_part_id: id,
            source: token.clone(),
            position: i as i64 + 1,
            idx: i as i64,
        });
    }

    for (child_idx, child) in node.children.iter().enumerate() {
        visit(
            child,
            Some(id),
            &path,
            child_idx as i64,
            depth + 1,
            counter,
            flat,
        )?;
    }

    *counter += 1;
    flat.nodes[slot].rgt = *counter;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_assigns_indexes() {
        let corpus = fixtures::iliad();
        let flat = flatten(&corpus.nodes).unwrap();

        // textgroup + work + version + 3 books + 20 lines
        assert_eq!(flat.nodes.len(), 26);

        let version = flat.node(fixtures::VERSION_URN).unwrap();
        assert_eq!(version.depth, 3);
        assert_eq!(version.path.len(), 3 * PATH_STEP);

        let book2 = flat.node(&format!("{}2", fixtures::VERSION_URN)).unwrap();
        assert_eq!(book2.idx, 1);
        assert_eq!(book2.depth, 4);
        assert_eq!(book2.parent_id, Some(version.id));
        assert!(book2.path.starts_with(&version.path));

        let line = flat.node(&format!("{}2.3", fixtures::VERSION_URN)).unwrap();
        assert_eq!(line.idx, 2);
        assert_eq!(line.depth, 5);
        assert!(line.is_leaf());
        assert!(book2.contains(line));
        assert!(version.contains(line));
    }

    #[test]
    fn test_intervals_nest_properly() {
        let flat = flatten(&fixtures::iliad().nodes).unwrap();
        for a in &flat.nodes {
            assert!(a.lft < a.rgt);
            for b in &flat.nodes {
                let disjoint = a.rgt < b.lft || b.rgt < a.lft;
                let nested = a.contains(b) || b.contains(a) || a.id == b.id;
                assert!(disjoint || nested, "{} and {} overlap", a.urn, b.urn);
                assert_eq!(
                    a.contains(b),
                    b.path.starts_with(&a.path) && a.path != b.path
                );
            }
        }
    }

    #[test]
    fn test_tokens_are_positioned() {
        let flat = flatten(&fixtures::iliad().nodes).unwrap();
        let first_line = flat
            .node(&format!("{}1.1", fixtures::VERSION_URN))
            .unwrap();
        let tokens: Vec<_> = flat
            .tokens
            .iter()
            .filter(|t| t.text_part_id == first_line.id)
            .collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].position, 1);
        assert_eq!(tokens[1].idx, 1);
        assert_eq!(tokens[1].source.lemma.as_deref(), Some("ἀείδω"));
    }

    #[test]
    fn test_duplicate_urn_rejected() {
        let nodes: Vec<CorpusNode> = serde_json::from_value(json!([
            {"urn": "urn:cts:x:a:", "kind": "version", "rank": 1},
            {"urn": "urn:cts:x:a:", "kind": "version", "rank": 1}
        ]))
        .unwrap();
        assert!(matches!(
            flatten(&nodes),
            Err(LibraryError::InvalidCorpus(_))
        ));
    }

    #[test]
    fn test_require_id_reports_unknown_urn() {
        let flat = flatten(&fixtures::iliad().nodes).unwrap();
        let err = flat.require_id("urn:cts:nope:", "chunk 0").unwrap_err();
        assert!(err.to_string().contains("urn:cts:nope:"));
    }
}
