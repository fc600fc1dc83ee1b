//! Turns alignment records into W3C Web Annotation documents.

use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use crate::error::LibraryError;
use crate::models::TextAlignmentChunk;

use super::ANNO_CONTEXT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationFormat {
    Text,
    Html,
}

impl AnnotationFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AnnotationFormat::Text => "text/plain",
            AnnotationFormat::Html => "text/html",
        }
    }
}

impl FromStr for AnnotationFormat {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(AnnotationFormat::Text),
            "html" => Ok(AnnotationFormat::Html),
            other => Err(LibraryError::UnknownFormat(other.to_string())),
        }
    }
}

/// One alignment chunk as it is paginated: its position in the collection
/// plus the chunk itself.
#[derive(Debug, Clone)]
pub struct AlignmentRecord {
    pub idx: i64,
    pub chunk: TextAlignmentChunk,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextualBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: String,
    pub format: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebAnnotation {
    #[serde(rename = "@context")]
    pub context: &'static str,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub body: Vec<TextualBody>,
    pub target: Vec<String>,
}

/// Renders records of one annotation kind.
pub trait AnnotationGenerator: Send + Sync {
    /// The kind segment used in `/wa/{urn}/{kind}/...` URLs.
    fn kind(&self) -> &'static str;

    fn label(&self, urn: &str) -> String;

    fn generate(&self, id: String, record: &AlignmentRecord, format: AnnotationFormat)
        -> WebAnnotation;
}

pub struct TranslationAlignmentGenerator;

impl AnnotationGenerator for TranslationAlignmentGenerator {
    fn kind(&self) -> &'static str {
        "translation-alignment"
    }

    fn label(&self, urn: &str) -> String {
        format!("Translation Alignments for {}", urn)
    }

    fn generate(
        &self,
        id: String,
        record: &AlignmentRecord,
        format: AnnotationFormat,
    ) -> WebAnnotation {
        let body = record
            .chunk
            .items
            .as_array()
            .map(|items| items.iter().map(|item| textual_body(item, format)).collect())
            .unwrap_or_default();

        let mut target = vec![record.chunk.start_urn.clone()];
        if record.chunk.end_urn != record.chunk.start_urn {
            target.push(record.chunk.end_urn.clone());
        }

        WebAnnotation {
            context: ANNO_CONTEXT,
            id,
            kind: "Annotation",
            body,
            target,
        }
    }
}

fn textual_body(item: &Value, format: AnnotationFormat) -> TextualBody {
    let lines: Vec<String> = match item {
        Value::Array(parts) => parts.iter().map(plain_text).collect(),
        other => vec![plain_text(other)],
    };
    let value = match format {
        AnnotationFormat::Text => lines.join(" "),
        AnnotationFormat::Html => lines
            .iter()
            .map(|line| quick_xml::escape::escape(line.as_str()).into_owned())
            .collect::<Vec<_>>()
            .join("<br/>"),
    };
    TextualBody {
        kind: "TextualBody",
        value,
        format: format.mime_type(),
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The generator for a `kind` URL segment.
pub fn generator_for_kind(kind: &str) -> Result<Box<dyn AnnotationGenerator>, LibraryError> {
    let generators: Vec<Box<dyn AnnotationGenerator>> =
        vec![Box::new(TranslationAlignmentGenerator)];
    generators
        .into_iter()
        .find(|generator| generator.kind() == kind)
        .ok_or_else(|| LibraryError::UnknownAnnotationKind(kind.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(items: Value, start: &str, end: &str) -> AlignmentRecord {
        AlignmentRecord {
            idx: 3,
            chunk: TextAlignmentChunk {
                id: 1,
                idx: 0,
                citation: "1.1".into(),
                items,
                alignment_slug: "iliad".into(),
                version_urn: "urn:cts:greekLit:tlg0012.tlg001.perseus-grc2:".into(),
                start_urn: start.into(),
                end_urn: end.into(),
            },
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("text".parse::<AnnotationFormat>().unwrap(), AnnotationFormat::Text);
        assert_eq!("html".parse::<AnnotationFormat>().unwrap(), AnnotationFormat::Html);
        assert!(matches!(
            "pdf".parse::<AnnotationFormat>(),
            Err(LibraryError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let generator = generator_for_kind("translation-alignment").unwrap();
        assert_eq!(generator.kind(), "translation-alignment");
        assert!(matches!(
            generator_for_kind("commentary"),
            Err(LibraryError::UnknownAnnotationKind(_))
        ));
    }

    #[test]
    fn test_text_annotation() {
        let rec = record(json!([["μῆνιν", "ἄειδε"], ["Sing"]]), "urn:a:1.1", "urn:a:1.1");
        let wa = TranslationAlignmentGenerator.generate("http://x/1".into(), &rec, AnnotationFormat::Text);
        assert_eq!(wa.body.len(), 2);
        assert_eq!(wa.body[0].value, "μῆνιν ἄειδε");
        assert_eq!(wa.body[0].format, "text/plain");
        assert_eq!(wa.target, vec!["urn:a:1.1".to_string()]);

        let value = serde_json::to_value(&wa).unwrap();
        assert_eq!(value["@context"], ANNO_CONTEXT);
        assert_eq!(value["type"], "Annotation");
        assert_eq!(value["body"][1]["type"], "TextualBody");
    }

    #[test]
    fn test_html_annotation_escapes() {
        let rec = record(json!([["<b>", "a & b"]]), "urn:a:1.1", "urn:a:1.3");
        let wa = TranslationAlignmentGenerator.generate("http://x/1".into(), &rec, AnnotationFormat::Html);
        assert_eq!(wa.body[0].value, "&lt;b&gt;<br/>a &amp; b");
        assert_eq!(wa.body[0].format, "text/html");
        assert_eq!(wa.target.len(), 2);
    }
}
