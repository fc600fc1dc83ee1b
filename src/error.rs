//! Domain error type shared by the resolver, the stores, and the HTTP layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("{0} was not found")]
    VersionNotFound(String),

    #[error("reference {reference} was not found in {version}")]
    ReferenceNotFound { version: String, reference: String },

    #[error("text part {0} was not found")]
    TextPartNotFound(String),

    #[error("annotation page {0} was not found")]
    PageNotFound(i64),

    #[error("annotation {idx} was not found for {urn}")]
    AnnotationNotFound { urn: String, idx: i64 },

    #[error("unknown annotation kind: {0}")]
    UnknownAnnotationKind(String),

    #[error("unknown annotation format: {0}")]
    UnknownFormat(String),

    #[error("invalid reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("invalid corpus: {0}")]
    InvalidCorpus(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LibraryError {
    pub(crate) fn invalid_reference(reference: &str, reason: impl Into<String>) -> Self {
        LibraryError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }

    /// True for every variant that surfaces as "not found" to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LibraryError::VersionNotFound(_)
                | LibraryError::ReferenceNotFound { .. }
                | LibraryError::TextPartNotFound(_)
                | LibraryError::PageNotFound(_)
                | LibraryError::AnnotationNotFound { .. }
                | LibraryError::UnknownAnnotationKind(_)
                | LibraryError::UnknownFormat(_)
        )
    }

    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            LibraryError::InvalidReference { .. } | LibraryError::InvalidCorpus(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
