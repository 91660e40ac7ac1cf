//! Advance an actor's staged status (exhaustion) by some levels.

use std::sync::Arc;

use spellbind_domain::{DocumentUuid, RulesConfig, StatusLevelChange, StoredDocument};

use super::error::LifecycleError;
use crate::infrastructure::ports::DocumentStore;

pub struct AdvanceStatusLevel {
    store: Arc<dyn DocumentStore>,
    config: Arc<RulesConfig>,
}

impl AdvanceStatusLevel {
    pub fn new(store: Arc<dyn DocumentStore>, config: Arc<RulesConfig>) -> Self {
        Self { store, config }
    }

    /// Compute the new level and the update the host should write.
    ///
    /// # Arguments
    /// * `actor` - Uuid of the actor
    /// * `delta` - Levels to move; negative values recover
    ///
    /// # Returns
    /// `None` when the actor tracks no numeric level.
    pub async fn execute(
        &self,
        actor: &DocumentUuid,
        delta: i32,
    ) -> Result<Option<StatusLevelChange>, LifecycleError> {
        let document = match self.store.resolve(actor).await? {
            Some(StoredDocument::Actor(document)) => document,
            _ => return Err(LifecycleError::not_found("Actor", actor)),
        };
        let change = document.advance_status_level(&self.config, delta);
        match &change {
            Some(change) => tracing::info!(actor = %actor, level = change.level, "Status level changed"),
            None => tracing::debug!(actor = %actor, "Actor has no status level to advance"),
        }
        Ok(change)
    }
}
