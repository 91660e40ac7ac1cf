//! Error types for port operations.

use spellbind_domain::DocumentUuid;

/// Store operation errors with context for debugging.
///
/// A refused creation is not an error; see [`super::DocumentStore::create`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Document not found - includes the document kind and uuid.
    #[error("{document_name} not found: {uuid}")]
    NotFound {
        document_name: &'static str,
        uuid: DocumentUuid,
    },

    /// Backend operation failed - includes operation name for tracing.
    #[error("Store error in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// Document has the wrong shape for the operation.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl StoreError {
    pub fn not_found(document_name: &'static str, uuid: &DocumentUuid) -> Self {
        Self::NotFound {
            document_name,
            uuid: uuid.clone(),
        }
    }

    pub fn backend(operation: &'static str, message: impl ToString) -> Self {
        Self::Backend {
            operation,
            message: message.to_string(),
        }
    }

    pub fn invalid_document(message: impl ToString) -> Self {
        Self::InvalidDocument(message.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
