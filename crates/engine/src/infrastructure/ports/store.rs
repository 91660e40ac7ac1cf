//! Persistence port for the host's document layer.

use async_trait::async_trait;
use spellbind_domain::{DependentRef, DocumentUuid, StoredDocument};

use super::error::StoreError;

/// A document to create, plus how the host should treat it.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub document: StoredDocument,
    /// Keep the document's id instead of letting the host assign one
    pub keep_id: bool,
}

impl CreateRequest {
    pub fn new(document: impl Into<StoredDocument>) -> Self {
        Self {
            document: document.into(),
            keep_id: false,
        }
    }

    /// Create with the document's own id; status conditions rely on this.
    pub fn keep_id(document: impl Into<StoredDocument>) -> Self {
        Self {
            document: document.into(),
            keep_id: true,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look a document up by uuid. `None` when it no longer exists.
    async fn resolve(&self, uuid: &DocumentUuid) -> Result<Option<StoredDocument>, StoreError>;

    /// Create a document. `Ok(None)` means the host refused the creation.
    async fn create(&self, request: CreateRequest) -> Result<Option<StoredDocument>, StoreError>;

    /// Documents embedded directly in `parent`.
    async fn children(&self, parent: &DocumentUuid) -> Result<Vec<StoredDocument>, StoreError>;

    /// Delete a document together with everything embedded in it.
    async fn delete(&self, uuid: &DocumentUuid) -> Result<(), StoreError>;

    /// Replace the dependents recorded on an effect.
    async fn set_dependents(
        &self,
        owner: &DocumentUuid,
        dependents: Vec<DependentRef>,
    ) -> Result<(), StoreError>;
}
