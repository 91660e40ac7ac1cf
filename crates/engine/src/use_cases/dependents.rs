//! Dependency tracking between effects and the documents they spawn.
//!
//! Dependents are weak references. Listing them resolves each through the
//! store and quietly skips any that have disappeared; deleting an owner
//! deletes its live dependents through the same routine, so the cascade is
//! transitive. Documents embedded in a deleted owner go with it, and their
//! dependents are cascaded the same way.

use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use spellbind_domain::{DependentRef, DocumentUuid, StoredDocument};

use super::error::LifecycleError;
use crate::infrastructure::enchantment_registry::EnchantmentRegistry;
use crate::infrastructure::ports::{AuthorityPort, DocumentStore, NotificationPort};

/// Warning shown when a deletion would break links the user may not break.
pub const DELETION_VETO_WARNING: &str =
    "Cannot delete this effect while other documents depend on it; ask the GM to remove it.";

pub struct DependencyTracker {
    store: Arc<dyn DocumentStore>,
    authority: Arc<dyn AuthorityPort>,
    notifier: Arc<dyn NotificationPort>,
    registry: Arc<EnchantmentRegistry>,
}

impl DependencyTracker {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        authority: Arc<dyn AuthorityPort>,
        notifier: Arc<dyn NotificationPort>,
        registry: Arc<EnchantmentRegistry>,
    ) -> Self {
        Self {
            store,
            authority,
            notifier,
            registry,
        }
    }

    /// Record documents as dependents of an effect, after any already recorded.
    ///
    /// # Arguments
    /// * `owner` - Uuid of the effect that spawned the documents
    /// * `refs` - References to append, in order
    ///
    /// # Returns
    /// The owner's full dependent list after the update.
    pub async fn add_dependents(
        &self,
        owner: &DocumentUuid,
        refs: Vec<DependentRef>,
    ) -> Result<Vec<DependentRef>, LifecycleError> {
        let mut effect = match self.store.resolve(owner).await? {
            Some(StoredDocument::Effect(effect)) => effect,
            _ => return Err(LifecycleError::not_found("ActiveEffect", owner)),
        };
        effect.record_dependents(refs);
        self.store
            .set_dependents(owner, effect.dependents.clone())
            .await?;
        tracing::debug!(
            owner = %owner,
            count = effect.dependents.len(),
            "Recorded dependents"
        );
        Ok(effect.dependents)
    }

    /// Resolve the dependents recorded on `owner`. Stale references are skipped.
    pub async fn get_dependents(
        &self,
        owner: &StoredDocument,
    ) -> Result<Vec<StoredDocument>, LifecycleError> {
        let mut resolved = Vec::with_capacity(owner.dependents().len());
        for dependent in owner.dependents() {
            match self.store.resolve(&dependent.uuid).await? {
                Some(document) => resolved.push(document),
                None => tracing::debug!(
                    owner = %owner.uuid(),
                    dependent = %dependent.uuid,
                    "Skipping stale dependent"
                ),
            }
        }
        Ok(resolved)
    }

    /// Veto the deletion of an owner with live dependents unless the user
    /// holds elevated authority.
    pub fn check_deletion(
        &self,
        owner: &StoredDocument,
        live_dependents: &[StoredDocument],
    ) -> Result<(), LifecycleError> {
        if live_dependents.is_empty() || self.authority.has_elevated_authority() {
            return Ok(());
        }
        tracing::warn!(
            owner = %owner.uuid(),
            dependents = live_dependents.len(),
            "Deletion vetoed: live dependents and no elevated authority"
        );
        self.notifier.warn(DELETION_VETO_WARNING);
        Err(LifecycleError::DeletionVetoed {
            owner: owner.uuid().clone(),
            dependents: live_dependents.iter().map(|d| d.uuid().clone()).collect(),
        })
    }

    /// Documents embedded in `owner` at any depth, parents before children.
    pub async fn embedded(&self, owner: &DocumentUuid) -> Result<Vec<StoredDocument>, LifecycleError> {
        let mut found = Vec::new();
        let mut pending = vec![owner.clone()];
        while let Some(parent) = pending.pop() {
            for child in self.store.children(&parent).await? {
                pending.push(child.uuid().clone());
                found.push(child);
            }
        }
        Ok(found)
    }

    /// Live dependents of `owner` and of everything embedded in it, leaving
    /// out documents that are removed along with the owner anyway.
    pub async fn blocking_dependents(
        &self,
        owner: &StoredDocument,
        embedded: &[StoredDocument],
    ) -> Result<Vec<StoredDocument>, LifecycleError> {
        let mut live = self.get_dependents(owner).await?;
        for document in embedded {
            live.extend(self.get_dependents(document).await?);
        }
        live.retain(|dependent| !dependent.uuid().is_within(owner.uuid()));
        Ok(live)
    }

    /// Delete a document, everything embedded in it, and transitively the
    /// live dependents of all of those.
    ///
    /// # Returns
    /// Uuids of every deleted document: the owner, then its embedded
    /// documents, then cascaded dependents.
    pub fn delete<'a>(
        &'a self,
        uuid: &'a DocumentUuid,
    ) -> BoxFuture<'a, Result<Vec<DocumentUuid>, LifecycleError>> {
        async move {
            let owner = self
                .store
                .resolve(uuid)
                .await?
                .ok_or_else(|| LifecycleError::not_found("Document", uuid))?;
            let embedded = self.embedded(uuid).await?;
            let blocking = self.blocking_dependents(&owner, &embedded).await?;
            self.check_deletion(&owner, &blocking)?;

            self.store.delete(uuid).await?;
            tracing::debug!(uuid = %uuid, embedded = embedded.len(), "Deleted document");

            let mut deleted = vec![uuid.clone()];
            deleted.extend(embedded.iter().map(|document| document.uuid().clone()));
            for removed in std::iter::once(&owner).chain(&embedded) {
                deleted.extend(self.on_delete(removed).await?);
            }
            Ok(deleted)
        }
        .boxed()
    }

    /// Side effects of a document already removed from the store: drop its
    /// enchantment tracking and delete its live dependents.
    ///
    /// # Returns
    /// Uuids of the cascaded deletions.
    pub async fn on_delete(&self, removed: &StoredDocument) -> Result<Vec<DocumentUuid>, LifecycleError> {
        if let StoredDocument::Effect(effect) = removed {
            if effect.is_applied_enchantment() {
                if let Some(origin) = &effect.origin {
                    self.registry.untrack(origin, &effect.uuid);
                }
            }
        }
        let dependents = self.get_dependents(removed).await?;
        Ok(self.cascade_delete(removed, dependents).await)
    }

    /// Delete each resolved dependent of `owner` in order. A dependent that
    /// fails to delete is logged and the rest continue.
    pub async fn cascade_delete(
        &self,
        owner: &StoredDocument,
        dependents: Vec<StoredDocument>,
    ) -> Vec<DocumentUuid> {
        let mut deleted = Vec::new();
        for dependent in dependents {
            match self.delete(dependent.uuid()).await {
                Ok(uuids) => deleted.extend(uuids),
                Err(e) => tracing::warn!(
                    owner = %owner.uuid(),
                    dependent = %dependent.uuid(),
                    error = %e,
                    "Failed to delete dependent"
                ),
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{
        MockAuthorityPort, MockDocumentStore, MockNotificationPort, StoreError,
    };
    use spellbind_domain::{static_id, ActiveEffect};

    fn actor_uuid() -> DocumentUuid {
        DocumentUuid::from("Actor.hero000000000000")
    }

    fn effect(seed: &str) -> ActiveEffect {
        ActiveEffect::new(static_id(seed), &actor_uuid(), seed)
    }

    fn tracker(
        store: MockDocumentStore,
        elevated: bool,
        notifier: MockNotificationPort,
    ) -> DependencyTracker {
        let mut authority = MockAuthorityPort::new();
        authority
            .expect_has_elevated_authority()
            .returning(move || elevated);
        DependencyTracker::new(
            Arc::new(store),
            Arc::new(authority),
            Arc::new(notifier),
            Arc::new(EnchantmentRegistry::new()),
        )
    }

    #[tokio::test]
    async fn add_dependents_appends_to_the_stored_list() {
        let existing = effect("prone");
        let new = effect("blinded");
        let mut owner = effect("conc");
        owner.record_dependents([DependentRef::new(existing.uuid.clone())]);
        let owner_uuid = owner.uuid.clone();

        let mut store = MockDocumentStore::new();
        let stored = owner.clone();
        store
            .expect_resolve()
            .withf(move |uuid| *uuid == stored.uuid)
            .returning(move |_| Ok(Some(StoredDocument::Effect(owner.clone()))));
        let expected = vec![
            DependentRef::new(existing.uuid.clone()),
            DependentRef::new(new.uuid.clone()),
        ];
        let expected_set = expected.clone();
        store
            .expect_set_dependents()
            .withf(move |_, refs| *refs == expected_set)
            .times(1)
            .returning(|_, _| Ok(()));

        let tracker = tracker(store, false, MockNotificationPort::new());
        let result = tracker
            .add_dependents(&owner_uuid, vec![DependentRef::new(new.uuid.clone())])
            .await
            .unwrap();
        assert_eq!(result, expected);
    }

    #[tokio::test]
    async fn when_owner_missing_add_dependents_returns_error() {
        let mut store = MockDocumentStore::new();
        store.expect_resolve().returning(|_| Ok(None));
        store.expect_set_dependents().times(0);

        let tracker = tracker(store, false, MockNotificationPort::new());
        let err = tracker
            .add_dependents(&effect("conc").uuid, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Store(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn get_dependents_skips_stale_references() {
        let live = effect("prone");
        let stale = effect("gone");
        let mut owner = effect("conc");
        owner.record_dependents([
            DependentRef::new(stale.uuid.clone()),
            DependentRef::new(live.uuid.clone()),
        ]);

        let mut store = MockDocumentStore::new();
        let live_uuid = live.uuid.clone();
        store.expect_resolve().returning(move |uuid| {
            Ok((*uuid == live_uuid).then(|| StoredDocument::Effect(live.clone())))
        });

        let tracker = tracker(store, false, MockNotificationPort::new());
        let dependents = tracker
            .get_dependents(&StoredDocument::Effect(owner))
            .await
            .unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].name(), "prone");
    }

    #[test]
    fn when_not_elevated_deletion_with_live_dependents_is_vetoed() {
        let dependent = effect("prone");
        let owner = effect("conc");

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_warn()
            .withf(|message| message == DELETION_VETO_WARNING)
            .times(1)
            .return_const(());

        let tracker = tracker(MockDocumentStore::new(), false, notifier);
        let err = tracker
            .check_deletion(
                &StoredDocument::Effect(owner.clone()),
                &[StoredDocument::Effect(dependent.clone())],
            )
            .unwrap_err();
        match err {
            LifecycleError::DeletionVetoed { owner: vetoed, dependents } => {
                assert_eq!(vetoed, owner.uuid);
                assert_eq!(dependents, vec![dependent.uuid]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn without_dependents_anyone_may_delete() {
        let mut notifier = MockNotificationPort::new();
        notifier.expect_warn().times(0);
        let tracker = tracker(MockDocumentStore::new(), false, notifier);
        assert!(tracker
            .check_deletion(&StoredDocument::Effect(effect("conc")), &[])
            .is_ok());
    }

    #[tokio::test]
    async fn when_store_delete_fails_error_is_returned() {
        let owner = effect("conc");
        let stored = owner.clone();
        let mut store = MockDocumentStore::new();
        store
            .expect_resolve()
            .returning(move |_| Ok(Some(StoredDocument::Effect(stored.clone()))));
        store.expect_children().returning(|_| Ok(Vec::new()));
        store
            .expect_delete()
            .returning(|_| Err(StoreError::backend("delete", "disk full")));

        let tracker = tracker(store, true, MockNotificationPort::new());
        let err = tracker.delete(&owner.uuid).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Store(StoreError::Backend { .. })));
    }
}
