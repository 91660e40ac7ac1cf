//! Rider creation: documents created alongside an effect.
//!
//! Status conditions can bring other conditions with them (unconscious brings
//! prone, and a rider's own riders follow), and enchantments can bring extra effects and items. Riders are
//! created concurrently; results are gathered in input order and every
//! success is recorded as a dependent of the triggering effect. A vetoed
//! rider is dropped on its own.

use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use spellbind_domain::{
    ActiveEffect, DependentRef, DocumentId, DocumentUuid, ItemDocument, RulesConfig,
    StoredDocument,
};

use super::dependents::DependencyTracker;
use super::error::LifecycleError;
use crate::infrastructure::ports::{CreateRequest, DocumentStore, NotificationPort, StoreError};

/// Outcome of a single rider creation.
#[derive(Debug)]
enum RiderOutcome {
    Created(StoredDocument),
    /// The rider was already there; nothing to record
    Existing,
    Vetoed(String),
    Skipped,
}

pub struct RiderCreator {
    store: Arc<dyn DocumentStore>,
    notifier: Arc<dyn NotificationPort>,
    tracker: Arc<DependencyTracker>,
    config: Arc<RulesConfig>,
}

impl RiderCreator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        notifier: Arc<dyn NotificationPort>,
        tracker: Arc<DependencyTracker>,
        config: Arc<RulesConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            tracker,
            config,
        }
    }

    /// Status ids that ride along with the effect's statuses, first seen first.
    pub fn rider_statuses(&self, effect: &ActiveEffect) -> Vec<String> {
        let mut riders: Vec<String> = Vec::new();
        for status in &effect.statuses {
            let Some(template) = self.config.status_effect(status) else {
                continue;
            };
            for rider in &template.riders {
                if !riders.contains(rider) {
                    riders.push(rider.clone());
                }
            }
        }
        riders
    }

    /// Create the conditions that ride along with the effect's statuses.
    ///
    /// Each created condition gets its own riders in turn, recorded as its
    /// dependents. Conditions use fixed ids and existing ones are never
    /// recreated, so rider chains always end.
    ///
    /// # Returns
    /// The conditions created directly for `effect`, in rider order.
    pub fn create_rider_conditions<'a>(
        &'a self,
        effect: &'a ActiveEffect,
    ) -> BoxFuture<'a, Result<Vec<StoredDocument>, LifecycleError>> {
        async move {
            let riders = self.rider_statuses(effect);
            let Some(parent) = effect.parent() else {
                return Ok(Vec::new());
            };
            if riders.is_empty() {
                return Ok(Vec::new());
            }

            let outcomes = join_all(
                riders
                    .iter()
                    .map(|status| self.create_rider_condition(&parent, status)),
            )
            .await;
            let created = self.collect(&effect.uuid, outcomes);
            self.record(&effect.uuid, &created).await?;

            for condition in created.iter().filter_map(StoredDocument::as_effect) {
                if let Err(e) = self.create_rider_conditions(condition).await {
                    tracing::warn!(
                        owner = %condition.uuid,
                        error = %e,
                        "Failed to create nested rider conditions"
                    );
                }
            }
            Ok(created)
        }
        .boxed()
    }

    async fn create_rider_condition(
        &self,
        parent: &DocumentUuid,
        status: &str,
    ) -> Result<RiderOutcome, StoreError> {
        let existing = parent.child("ActiveEffect", &ActiveEffect::status_id(status));
        if self.store.resolve(&existing).await?.is_some() {
            return Ok(RiderOutcome::Existing);
        }
        let Some(template) = self.config.status_effect(status) else {
            tracing::warn!(status = %status, "Rider condition has no status template");
            return Ok(RiderOutcome::Skipped);
        };
        let condition = ActiveEffect::from_status_effect(template, parent);
        let name = condition.name.clone();
        Ok(match self.store.create(CreateRequest::keep_id(condition)).await? {
            Some(document) => RiderOutcome::Created(document),
            None => RiderOutcome::Vetoed(name),
        })
    }

    /// Copy an applied enchantment's rider effects onto the enchanted item, and
    /// its rider items onto the actor owning that item.
    ///
    /// # Returns
    /// Created effects followed by created items.
    pub async fn create_rider_enchantments(
        &self,
        enchantment: &ActiveEffect,
    ) -> Result<Vec<StoredDocument>, LifecycleError> {
        let Some(origin_uuid) = enchantment.origin.as_ref() else {
            return Ok(Vec::new());
        };
        let origin = match self.store.resolve(origin_uuid).await? {
            Some(StoredDocument::Item(item)) => item,
            _ => {
                tracing::debug!(origin = %origin_uuid, "Enchantment origin not found, no riders");
                return Ok(Vec::new());
            }
        };
        let Some(enchanted) = enchantment.parent() else {
            return Ok(Vec::new());
        };

        let effect_outcomes = join_all(
            enchantment
                .riders
                .effects
                .iter()
                .map(|id| self.copy_rider_effect(&origin, &enchanted, id)),
        )
        .await;

        let actor = enchanted
            .parent()
            .filter(|_| enchanted.document_name() == Some("Item"));
        let item_outcomes = match &actor {
            Some(actor) => {
                join_all(
                    enchantment
                        .riders
                        .items
                        .iter()
                        .map(|uuid| self.copy_rider_item(&enchantment.uuid, actor, uuid)),
                )
                .await
            }
            None => Vec::new(),
        };

        let mut created = self.collect(&enchantment.uuid, effect_outcomes);
        created.extend(self.collect(&enchantment.uuid, item_outcomes));
        self.record(&enchantment.uuid, &created).await?;
        Ok(created)
    }

    async fn copy_rider_effect(
        &self,
        origin: &ItemDocument,
        enchanted: &DocumentUuid,
        id: &DocumentId,
    ) -> Result<RiderOutcome, StoreError> {
        let Some(source) = origin.effect(id) else {
            tracing::debug!(effect = %id, origin = %origin.uuid, "Rider effect missing on origin");
            return Ok(RiderOutcome::Skipped);
        };
        let mut rider = source.clone();
        rider.id = DocumentId::generate();
        rider.uuid = enchanted.child("ActiveEffect", &rider.id);
        rider.origin = Some(origin.uuid.clone());
        rider.dependents.clear();
        self.create_rider(rider.into()).await
    }

    async fn copy_rider_item(
        &self,
        enchantment: &DocumentUuid,
        actor: &DocumentUuid,
        uuid: &DocumentUuid,
    ) -> Result<RiderOutcome, StoreError> {
        let Some(StoredDocument::Item(mut rider)) = self.store.resolve(uuid).await? else {
            tracing::debug!(item = %uuid, "Rider item not found");
            return Ok(RiderOutcome::Skipped);
        };
        rider.id = DocumentId::generate();
        rider.enchanted_by = Some(enchantment.clone());
        self.create_rider(rider.embedded_in(actor).into()).await
    }

    async fn create_rider(&self, document: StoredDocument) -> Result<RiderOutcome, StoreError> {
        let name = document.name().to_string();
        Ok(match self.store.create(CreateRequest::keep_id(document)).await? {
            Some(document) => RiderOutcome::Created(document),
            None => RiderOutcome::Vetoed(name),
        })
    }

    /// Keep successes in input order; warn about vetoes and failures.
    fn collect(
        &self,
        owner: &DocumentUuid,
        outcomes: Vec<Result<RiderOutcome, StoreError>>,
    ) -> Vec<StoredDocument> {
        let mut created = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(RiderOutcome::Created(document)) => created.push(document),
                Ok(RiderOutcome::Vetoed(name)) => {
                    tracing::warn!(owner = %owner, rider = %name, "Rider creation vetoed");
                    self.notifier
                        .warn(&format!("{} could not be created.", name));
                }
                Ok(RiderOutcome::Existing | RiderOutcome::Skipped) => {}
                Err(e) => {
                    tracing::warn!(owner = %owner, error = %e, "Rider creation failed");
                }
            }
        }
        created
    }

    async fn record(
        &self,
        owner: &DocumentUuid,
        created: &[StoredDocument],
    ) -> Result<(), LifecycleError> {
        if created.is_empty() {
            return Ok(());
        }
        let refs = created
            .iter()
            .map(|document| DependentRef::new(document.uuid().clone()))
            .collect();
        self.tracker.add_dependents(owner, refs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::enchantment_registry::EnchantmentRegistry;
    use crate::infrastructure::ports::{
        MockAuthorityPort, MockDocumentStore, MockNotificationPort,
    };
    use spellbind_domain::{static_id, StatusEffectTemplate};
    use std::sync::Mutex;

    fn actor_uuid() -> DocumentUuid {
        DocumentUuid::from("Actor.hero000000000000")
    }

    fn creator(store: MockDocumentStore, notifier: MockNotificationPort, config: RulesConfig) -> RiderCreator {
        let store: Arc<dyn DocumentStore> = Arc::new(store);
        let notifier: Arc<dyn NotificationPort> = Arc::new(notifier);
        let tracker = Arc::new(DependencyTracker::new(
            store.clone(),
            Arc::new(MockAuthorityPort::new()),
            notifier.clone(),
            Arc::new(EnchantmentRegistry::new()),
        ));
        RiderCreator::new(store, notifier, tracker, Arc::new(config))
    }

    fn five_rider_config() -> RulesConfig {
        let mut config = RulesConfig::default();
        config.status_effects.push(
            StatusEffectTemplate::new("cursed", "Cursed")
                .with_riders(["rider1", "rider2", "rider3", "rider4", "rider5"]),
        );
        for n in 1..=5 {
            config
                .status_effects
                .push(StatusEffectTemplate::new(format!("rider{n}"), format!("Rider {n}")));
        }
        config
    }

    #[test]
    fn rider_statuses_are_deduplicated_in_first_seen_order() {
        let mut config = RulesConfig::default();
        config
            .status_effects
            .push(StatusEffectTemplate::new("hexed", "Hexed").with_riders(["prone", "blinded"]));
        let creator = creator(MockDocumentStore::new(), MockNotificationPort::new(), config);
        let effect = ActiveEffect::new(static_id("fx"), &actor_uuid(), "Fx")
            .with_statuses(["unconscious", "hexed"]);
        assert_eq!(creator.rider_statuses(&effect), vec!["prone", "blinded"]);
    }

    #[tokio::test]
    async fn veto_of_third_rider_records_the_other_four_in_order() {
        let owner = ActiveEffect::new(static_id("curse"), &actor_uuid(), "Curse").with_statuses(["cursed"]);
        let owner_uuid = owner.uuid.clone();
        let recorded: Arc<Mutex<Vec<DependentRef>>> = Arc::new(Mutex::new(Vec::new()));

        let mut store = MockDocumentStore::new();
        let stored_owner = owner.clone();
        store.expect_resolve().returning(move |uuid| {
            Ok((*uuid == stored_owner.uuid).then(|| StoredDocument::Effect(stored_owner.clone())))
        });
        store.expect_create().times(5).returning(|request| {
            Ok((request.document.name() != "Rider 3").then_some(request.document))
        });
        let sink = recorded.clone();
        store
            .expect_set_dependents()
            .withf(move |uuid, _| *uuid == owner_uuid)
            .times(1)
            .returning(move |_, refs| {
                *sink.lock().unwrap() = refs;
                Ok(())
            });

        let mut notifier = MockNotificationPort::new();
        notifier
            .expect_warn()
            .withf(|message| message.contains("Rider 3"))
            .times(1)
            .return_const(());

        let creator = creator(store, notifier, five_rider_config());
        let created = creator.create_rider_conditions(&owner).await.unwrap();

        let names: Vec<&str> = created.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["Rider 1", "Rider 2", "Rider 4", "Rider 5"]);
        let expected: Vec<DependentRef> = ["rider1", "rider2", "rider4", "rider5"]
            .iter()
            .map(|status| {
                DependentRef::new(actor_uuid().child("ActiveEffect", &ActiveEffect::status_id(status)))
            })
            .collect();
        assert_eq!(*recorded.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn created_conditions_bring_their_own_riders() {
        let mut config = RulesConfig::default();
        config
            .status_effects
            .push(StatusEffectTemplate::new("dying", "Dying").with_riders(["unconscious"]));
        let owner = ActiveEffect::new(static_id("fall"), &actor_uuid(), "Fall").with_statuses(["dying"]);
        let unconscious_uuid = actor_uuid().child("ActiveEffect", &ActiveEffect::status_id("unconscious"));
        let prone_uuid = actor_uuid().child("ActiveEffect", &ActiveEffect::status_id("prone"));

        let created: Arc<Mutex<Vec<StoredDocument>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded: Arc<Mutex<Vec<(DocumentUuid, Vec<DependentRef>)>>> =
            Arc::new(Mutex::new(Vec::new()));

        let mut store = MockDocumentStore::new();
        let stored_owner = owner.clone();
        let lookup = created.clone();
        store.expect_resolve().returning(move |uuid| {
            if *uuid == stored_owner.uuid {
                return Ok(Some(StoredDocument::Effect(stored_owner.clone())));
            }
            Ok(lookup.lock().unwrap().iter().find(|d| d.uuid() == uuid).cloned())
        });
        let sink = created.clone();
        store.expect_create().times(2).returning(move |request| {
            sink.lock().unwrap().push(request.document.clone());
            Ok(Some(request.document))
        });
        let log = recorded.clone();
        store.expect_set_dependents().times(2).returning(move |owner, refs| {
            log.lock().unwrap().push((owner.clone(), refs));
            Ok(())
        });

        let creator = creator(store, MockNotificationPort::new(), config);
        let direct = creator.create_rider_conditions(&owner).await.unwrap();

        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0].uuid(), &unconscious_uuid);
        assert_eq!(
            *recorded.lock().unwrap(),
            vec![
                (owner.uuid.clone(), vec![DependentRef::new(unconscious_uuid.clone())]),
                (unconscious_uuid, vec![DependentRef::new(prone_uuid)]),
            ]
        );
    }

    #[tokio::test]
    async fn existing_riders_are_not_recreated() {
        let owner = ActiveEffect::new(static_id("ko"), &actor_uuid(), "Knocked Out").with_statuses(["unconscious"]);
        let prone_uuid = actor_uuid().child("ActiveEffect", &ActiveEffect::status_id("prone"));

        let mut store = MockDocumentStore::new();
        store
            .expect_resolve()
            .withf(move |uuid| *uuid == prone_uuid)
            .returning(|uuid| {
                Ok(Some(StoredDocument::Effect(ActiveEffect::new(
                    ActiveEffect::status_id("prone"),
                    &uuid.parent().unwrap_or_else(actor_uuid),
                    "Prone",
                ))))
            });
        store.expect_create().times(0);
        store.expect_set_dependents().times(0);

        let creator = creator(store, MockNotificationPort::new(), RulesConfig::default());
        assert!(creator.create_rider_conditions(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn statuses_without_riders_touch_nothing() {
        let owner = ActiveEffect::new(static_id("blind"), &actor_uuid(), "Blinded").with_statuses(["blinded"]);
        let mut store = MockDocumentStore::new();
        store.expect_resolve().times(0);
        store.expect_create().times(0);

        let creator = creator(store, MockNotificationPort::new(), RulesConfig::default());
        assert!(creator.create_rider_conditions(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_drops_only_that_rider() {
        let mut config = RulesConfig::default();
        config
            .status_effects
            .push(StatusEffectTemplate::new("hexed", "Hexed").with_riders(["prone", "blinded"]));
        let owner = ActiveEffect::new(static_id("hex"), &actor_uuid(), "Hex").with_statuses(["hexed"]);

        let mut store = MockDocumentStore::new();
        let stored_owner = owner.clone();
        store.expect_resolve().returning(move |uuid| {
            Ok((*uuid == stored_owner.uuid).then(|| StoredDocument::Effect(stored_owner.clone())))
        });
        store.expect_create().returning(|request| {
            if request.document.name() == "Prone" {
                Err(StoreError::backend("create", "timeout"))
            } else {
                Ok(Some(request.document))
            }
        });
        store
            .expect_set_dependents()
            .withf(|_, refs| refs.len() == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let creator = creator(store, MockNotificationPort::new(), config);
        let created = creator.create_rider_conditions(&owner).await.unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name(), "Blinded");
    }
}
