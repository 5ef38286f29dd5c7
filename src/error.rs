use std::fmt;

use crate::service::ServiceError;

/// What a reference failed to resolve to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotFoundKind {
    Document,
    Tab,
    Heading,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotFoundKind::Document => "document",
            NotFoundKind::Tab => "tab",
            NotFoundKind::Heading => "heading",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{kind} not found: {reference:?}")]
    NotFound {
        kind: NotFoundKind,
        reference: String,
    },
    #[error("invalid range [{start}, {end})")]
    InvalidRange { start: usize, end: usize },
    #[error("document {document_id} rejected edits at index {index}: {message}")]
    RemoteRejected {
        document_id: String,
        index: usize,
        message: String,
    },
    #[error("remote service error: {0}")]
    Service(#[from] ServiceError),
}

impl Error {
    pub fn not_found(kind: NotFoundKind, reference: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            reference: reference.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// A failed exposed operation, naming what was attempted and on what.
#[derive(Debug, thiserror::Error)]
#[error("{operation} failed for {target}: {source}")]
pub struct ToolError {
    pub operation: &'static str,
    pub target: String,
    #[source]
    pub source: Error,
}

impl ToolError {
    pub fn new(operation: &'static str, target: impl Into<String>, source: Error) -> Self {
        Self {
            operation,
            target: target.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_names_operation_target_and_cause() {
        let err = ToolError::new(
            "insert-after-heading",
            "doc-1",
            Error::not_found(NotFoundKind::Heading, "Nonexistent"),
        );
        assert_eq!(
            err.to_string(),
            "insert-after-heading failed for doc-1: heading not found: \"Nonexistent\""
        );
        assert!(err.source.is_not_found());
    }

    #[test]
    fn rejected_carries_document_and_index() {
        let err = Error::RemoteRejected {
            document_id: "doc-1".to_string(),
            index: 42,
            message: "index out of bounds".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "document doc-1 rejected edits at index 42: index out of bounds"
        );
    }
}
