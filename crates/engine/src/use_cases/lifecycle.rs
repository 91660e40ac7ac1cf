//! Effect lifecycle hooks.
//!
//! Wraps creation and deletion of active effects with the checks and side
//! effects the rules need: enchantment validation before creation, rider
//! documents after it, dependency vetoes and cascades around deletion.

use std::sync::Arc;

use spellbind_domain::{ActiveEffect, DocumentUuid, EffectKind, RulesConfig, StoredDocument};

use super::dependents::DependencyTracker;
use super::error::LifecycleError;
use super::riders::RiderCreator;
use crate::infrastructure::enchantment_registry::EnchantmentRegistry;
use crate::infrastructure::ports::{CreateRequest, DocumentStore, NotificationPort, StoreError};

/// Options for creating an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateOptions {
    /// Keep the origin supplied with the effect; otherwise the parent becomes
    /// the origin.
    pub keep_origin: bool,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self { keep_origin: true }
    }
}

pub struct EffectLifecycle {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn NotificationPort>,
    riders: Arc<RiderCreator>,
    tracker: Arc<DependencyTracker>,
    registry: Arc<EnchantmentRegistry>,
    config: Arc<RulesConfig>,
}

impl EffectLifecycle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn NotificationPort>,
        riders: Arc<RiderCreator>,
        tracker: Arc<DependencyTracker>,
        registry: Arc<EnchantmentRegistry>,
        config: Arc<RulesConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            riders,
            tracker,
            registry,
            config,
        }
    }

    /// Validate and adjust an effect before it is stored.
    ///
    /// # Arguments
    /// * `effect` - The effect about to be created; may be modified
    /// * `options` - Creation options
    ///
    /// # Returns
    /// `Ok(())` when creation may proceed.
    pub async fn pre_create(
        &self,
        effect: &mut ActiveEffect,
        options: CreateOptions,
    ) -> Result<(), LifecycleError> {
        if !options.keep_origin {
            effect.origin = effect.parent();
        }

        if effect.kind == EffectKind::Enchantment && effect.is_on_actor() {
            self.notifier
                .error("Enchantments cannot be added directly to actors.");
            return Err(LifecycleError::EnchantmentOnActor);
        }

        if effect.is_applied_enchantment() {
            let errors = self.enchantment_errors(effect).await?;
            if !errors.is_empty() {
                for error in &errors {
                    tracing::error!(effect = %effect.uuid, "{}", error);
                }
                return Err(LifecycleError::EnchantmentRejected(errors));
            }
            effect.disabled = false;
        }
        Ok(())
    }

    /// Reasons the effect's origin refuses to enchant its parent item.
    async fn enchantment_errors(&self, effect: &ActiveEffect) -> Result<Vec<String>, LifecycleError> {
        let Some(origin_uuid) = effect.origin.as_ref() else {
            return Ok(Vec::new());
        };
        let restrictions = match self.store.resolve(origin_uuid).await? {
            Some(StoredDocument::Item(origin)) => origin.enchantment,
            _ => None,
        };
        let Some(restrictions) = restrictions else {
            return Ok(Vec::new());
        };
        let Some(target_uuid) = effect.parent() else {
            return Ok(Vec::new());
        };
        match self.store.resolve(&target_uuid).await? {
            Some(StoredDocument::Item(target)) => Ok(restrictions.can_enchant(&target)),
            _ => Err(LifecycleError::not_found("Item", &target_uuid)),
        }
    }

    /// Create an effect: validate, store, then run the creation side effects.
    ///
    /// # Returns
    /// The stored effect, or `None` when the store vetoed it.
    pub async fn create(
        &self,
        mut effect: ActiveEffect,
        options: CreateOptions,
    ) -> Result<Option<ActiveEffect>, LifecycleError> {
        self.pre_create(&mut effect, options).await?;

        let name = effect.name.clone();
        let stored = match self.store.create(CreateRequest::keep_id(effect)).await? {
            Some(StoredDocument::Effect(stored)) => stored,
            Some(other) => {
                return Err(StoreError::invalid_document(format!(
                    "expected an ActiveEffect, store returned {}",
                    other.uuid()
                ))
                .into())
            }
            None => {
                tracing::warn!(effect = %name, "Effect creation vetoed");
                self.notifier.warn(&format!("{} could not be created.", name));
                return Ok(None);
            }
        };
        tracing::info!(effect = %stored.uuid, name = %stored.name, "Effect created");

        self.on_create(&stored).await?;
        Ok(Some(stored))
    }

    /// Side effects of a freshly stored effect.
    ///
    /// # Returns
    /// The rider documents created for it.
    pub async fn on_create(&self, effect: &ActiveEffect) -> Result<Vec<StoredDocument>, LifecycleError> {
        let mut created = Vec::new();
        if effect.is_active() && effect.is_on_actor() {
            created.extend(self.riders.create_rider_conditions(effect).await?);
        }
        if effect.is_applied_enchantment() {
            created.extend(self.riders.create_rider_enchantments(effect).await?);
            if let Some(origin) = &effect.origin {
                self.registry.track(origin, &effect.uuid);
            }
        }
        Ok(created)
    }

    /// Start concentrating on an embedded item.
    ///
    /// # Returns
    /// The concentration effect on the item's actor, or `None` when vetoed.
    pub async fn begin_concentration(
        &self,
        item_uuid: &DocumentUuid,
    ) -> Result<Option<ActiveEffect>, LifecycleError> {
        let item = match self.store.resolve(item_uuid).await? {
            Some(StoredDocument::Item(item)) => item,
            _ => return Err(LifecycleError::not_found("Item", item_uuid)),
        };
        let effect = match ActiveEffect::concentration(&item, &self.config) {
            Ok(effect) => effect,
            Err(e) => {
                self.notifier.warn(&e.to_string());
                return Err(e.into());
            }
        };
        self.create(effect, CreateOptions::default()).await
    }

    /// Check whether `uuid` may be deleted right now.
    pub async fn pre_delete(&self, uuid: &DocumentUuid) -> Result<(), LifecycleError> {
        let owner = self
            .store
            .resolve(uuid)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Document", uuid))?;
        let embedded = self.tracker.embedded(uuid).await?;
        let blocking = self.tracker.blocking_dependents(&owner, &embedded).await?;
        self.tracker.check_deletion(&owner, &blocking)
    }

    /// Delete a document with its embedded documents and dependents.
    ///
    /// # Returns
    /// Uuids of every deleted document, the requested one first.
    pub async fn delete(&self, uuid: &DocumentUuid) -> Result<Vec<DocumentUuid>, LifecycleError> {
        let deleted = self.tracker.delete(uuid).await?;
        tracing::info!(uuid = %uuid, count = deleted.len(), "Deleted with dependents");
        Ok(deleted)
    }

    /// Side effects of a document the host removed on its own: untrack it
    /// and delete its live dependents.
    pub async fn on_delete(&self, removed: &StoredDocument) -> Result<Vec<DocumentUuid>, LifecycleError> {
        self.tracker.on_delete(removed).await
    }

    /// Enchantments the origin item currently has applied.
    pub fn applied_enchantments(&self, origin: &DocumentUuid) -> Vec<DocumentUuid> {
        self.registry.applied(origin)
    }
}
