//! E2E test helpers for constructing the full application stack.

use std::sync::Arc;

use spellbind_domain::{
    static_id, ActiveEffect, ActorDocument, DocumentUuid, ItemDocument, RulesConfig,
    StatusEffectTemplate, StoredDocument,
};

use crate::app::App;
use crate::infrastructure::memory_store::MemoryDocumentStore;
use crate::infrastructure::session::{RecordingNotifier, SessionAuthority};

/// Fully-wired application over an in-memory store.
pub struct TestHarness {
    pub app: App,
    pub store: Arc<MemoryDocumentStore>,
    pub authority: Arc<SessionAuthority>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(MemoryDocumentStore::new(), RulesConfig::default())
    }

    pub fn with(store: MemoryDocumentStore, config: RulesConfig) -> Self {
        let store = Arc::new(store);
        let authority = Arc::new(SessionAuthority::new(false));
        let notifier = Arc::new(RecordingNotifier::default());
        let app = App::new(store.clone(), authority.clone(), notifier.clone(), config);
        Self {
            app,
            store,
            authority,
            notifier,
        }
    }

    /// Seed an actor and return it.
    pub fn seed_actor(&self, seed: &str, name: &str) -> ActorDocument {
        let actor = ActorDocument::new(static_id(seed), name);
        self.store.insert(actor.clone());
        actor
    }

    /// Seed an item, returning it as stored.
    pub fn seed_item(&self, item: ItemDocument) -> ItemDocument {
        self.store.insert(item.clone());
        item
    }

    pub fn effect(&self, uuid: &DocumentUuid) -> Option<ActiveEffect> {
        match self.store.get(uuid) {
            Some(StoredDocument::Effect(effect)) => Some(effect),
            _ => None,
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.notifier.warnings.lock().unwrap().clone()
    }
}

/// Rules with a `cursed` condition that brings five rider conditions along.
pub fn five_rider_rules() -> RulesConfig {
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

/// Uuid of the status condition effect `status` on `parent`.
pub fn condition_uuid(parent: &DocumentUuid, status: &str) -> DocumentUuid {
    parent.child("ActiveEffect", &ActiveEffect::status_id(status))
}
