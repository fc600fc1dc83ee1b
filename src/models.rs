//! Core data models for the text tree and its annotation layers.
//!
//! Rows are read from SQLite (or the in-memory store) into these types; the
//! `*Response` types are the camel-cased shapes returned by the HTTP API.

use serde::Serialize;
use serde_json::Value;

use crate::case::camelize;

/// Any level of a text hierarchy: text group, work, version, book, line, ...
#[derive(Debug, Clone, PartialEq)]
pub struct TextPart {
    pub id: i64,
    pub urn: String,
    /// Local reference ("1.10"); `None` above the version level.
    pub reference: Option<String>,
    pub idx: i64,
    pub depth: i64,
    pub rank: i64,
    pub kind: String,
    pub label: Option<String>,
    pub text_content: Option<String>,
    pub metadata: Value,
    pub parent_id: Option<i64>,
    /// Sortable materialized path; ancestors are exactly its prefixes.
    pub path: String,
    pub lft: i64,
    pub rgt: i64,
}

impl TextPart {
    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    /// True when `other` lies strictly inside this node's subtree.
    pub fn contains(&self, other: &TextPart) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }

    pub fn ref_or_empty(&self) -> &str {
        self.reference.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPartResponse {
    pub urn: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub idx: i64,
    pub depth: i64,
    pub rank: i64,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
    pub metadata: Value,
}

impl From<&TextPart> for TextPartResponse {
    fn from(tp: &TextPart) -> Self {
        Self {
            urn: tp.urn.clone(),
            reference: tp.reference.clone(),
            idx: tp.idx,
            depth: tp.depth,
            rank: tp.rank,
            kind: tp.kind.clone(),
            label: tp.label.clone(),
            text_content: tp.text_content.clone(),
            metadata: camelize(&tp.metadata),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAlignment {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub metadata: Value,
}

/// An indexed unit of cross-version alignment data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAlignmentChunk {
    #[serde(skip)]
    pub id: i64,
    pub idx: i64,
    pub citation: String,
    pub items: Value,
    pub alignment_slug: String,
    pub version_urn: String,
    pub start_urn: String,
    pub end_urn: String,
}

/// Which annotation table a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLayer {
    Text,
    Image,
    Audio,
}

impl AnnotationLayer {
    pub fn table(&self) -> &'static str {
        match self {
            AnnotationLayer::Text => "text_annotations",
            AnnotationLayer::Image => "image_annotations",
            AnnotationLayer::Audio => "audio_annotations",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub urn: String,
    pub kind: String,
    pub idx: i64,
    pub data: Value,
    /// Text parts an image annotation illustrates; empty for other layers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text_parts: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub text_part_urn: String,
    pub value: String,
    pub word_value: Option<String>,
    pub subref_value: Option<String>,
    pub lemma: Option<String>,
    pub gloss: Option<String>,
    pub part_of_speech: Option<String>,
    pub tag: Option<String>,
    pub position: i64,
    pub idx: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedEntity {
    pub urn: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub url: Option<String>,
    pub data: Value,
    pub text_parts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(lft: i64, rgt: i64) -> TextPart {
        TextPart {
            id: lft,
            urn: format!("urn:x:{}", lft),
            reference: Some("1".into()),
            idx: 0,
            depth: 1,
            rank: 1,
            kind: "line".into(),
            label: None,
            text_content: None,
            metadata: json!({}),
            parent_id: None,
            path: "000000".into(),
            lft,
            rgt,
        }
    }

    #[test]
    fn test_leaf_and_containment() {
        let outer = node(1, 6);
        let inner = node(2, 3);
        assert!(inner.is_leaf());
        assert!(!outer.is_leaf());
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&outer));
    }

    #[test]
    fn test_response_camelizes_metadata() {
        let mut tp = node(1, 2);
        tp.metadata = json!({"citation_scheme": ["book", "line"]});
        let resp = TextPartResponse::from(&tp);
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["metadata"]["citationScheme"], json!(["book", "line"]));
        assert_eq!(value["ref"], json!("1"));
        assert!(value.get("textContent").is_none());
    }
}
