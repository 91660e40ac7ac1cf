//! In-memory document store.
//!
//! Backs the dry-run binary and the e2e tests. Effects embedded in a seeded
//! item are indexed under their own uuids as well, so rider lookups resolve.

use async_trait::async_trait;
use dashmap::DashMap;
use spellbind_domain::{DependentRef, DocumentId, DocumentUuid, StoredDocument};

use super::ports::{CreateRequest, DocumentStore, StoreError};

type VetoFn = dyn Fn(&StoredDocument) -> bool + Send + Sync;

/// Thread-safe document map keyed by uuid.
pub struct MemoryDocumentStore {
    documents: DashMap<DocumentUuid, StoredDocument>,
    veto: Option<Box<VetoFn>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            veto: None,
        }
    }

    /// Refuse every creation the predicate matches, like a host hook returning false.
    pub fn with_veto(mut self, veto: impl Fn(&StoredDocument) -> bool + Send + Sync + 'static) -> Self {
        self.veto = Some(Box::new(veto));
        self
    }

    /// Seed a document without running creation checks.
    pub fn insert(&self, document: impl Into<StoredDocument>) {
        let document = document.into();
        if let StoredDocument::Item(item) = &document {
            for effect in &item.effects {
                self.documents
                    .insert(effect.uuid.clone(), StoredDocument::Effect(effect.clone()));
            }
        }
        self.documents.insert(document.uuid().clone(), document);
    }

    pub fn get(&self, uuid: &DocumentUuid) -> Option<StoredDocument> {
        self.documents.get(uuid).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, uuid: &DocumentUuid) -> bool {
        self.documents.contains_key(uuid)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents embedded directly in `parent`, by uuid.
    pub fn children_of(&self, parent: &DocumentUuid) -> Vec<StoredDocument> {
        let mut children: Vec<StoredDocument> = self
            .documents
            .iter()
            .filter(|entry| entry.key().parent().as_ref() == Some(parent))
            .map(|entry| entry.value().clone())
            .collect();
        children.sort_by(|a, b| a.uuid().cmp(b.uuid()));
        children
    }

    /// Give the document a fresh id and matching uuid.
    fn reassign_id(document: &mut StoredDocument) {
        let id = DocumentId::generate();
        match document {
            StoredDocument::Actor(actor) => {
                actor.uuid = DocumentUuid::root("Actor", &id);
                actor.id = id;
            }
            StoredDocument::Item(item) => {
                item.uuid = match item.parent() {
                    Some(parent) => parent.child("Item", &id),
                    None => DocumentUuid::root("Item", &id),
                };
                item.id = id;
                let uuid = item.uuid.clone();
                for effect in &mut item.effects {
                    effect.uuid = uuid.child("ActiveEffect", &effect.id);
                }
            }
            StoredDocument::Effect(effect) => {
                if let Some(parent) = effect.parent() {
                    effect.uuid = parent.child("ActiveEffect", &id);
                }
                effect.id = id;
            }
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn resolve(&self, uuid: &DocumentUuid) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.get(uuid))
    }

    async fn create(&self, request: CreateRequest) -> Result<Option<StoredDocument>, StoreError> {
        let mut document = request.document;
        if self.veto.as_ref().is_some_and(|veto| veto(&document)) {
            tracing::debug!(uuid = %document.uuid(), "Creation vetoed");
            return Ok(None);
        }
        if !request.keep_id {
            Self::reassign_id(&mut document);
        }
        if self.contains(document.uuid()) {
            return Err(StoreError::backend(
                "create",
                format!("{} already exists", document.uuid()),
            ));
        }
        self.insert(document.clone());
        Ok(Some(document))
    }

    async fn children(&self, parent: &DocumentUuid) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self.children_of(parent))
    }

    async fn delete(&self, uuid: &DocumentUuid) -> Result<(), StoreError> {
        if self.documents.remove(uuid).is_none() {
            return Err(StoreError::not_found("Document", uuid));
        }
        self.documents.retain(|key, _| !key.is_within(uuid));
        Ok(())
    }

    async fn set_dependents(
        &self,
        owner: &DocumentUuid,
        dependents: Vec<DependentRef>,
    ) -> Result<(), StoreError> {
        let mut entry = self
            .documents
            .get_mut(owner)
            .ok_or_else(|| StoreError::not_found("ActiveEffect", owner))?;
        match entry.value_mut() {
            StoredDocument::Effect(effect) => {
                effect.dependents = dependents;
                Ok(())
            }
            other => Err(StoreError::invalid_document(format!(
                "{} cannot record dependents",
                other.uuid()
            ))),
        }
    }
}
