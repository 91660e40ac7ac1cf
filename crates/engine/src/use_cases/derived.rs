//! Derived-data pass: fold every active effect's changes into an actor.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use spellbind_domain::{
    get_at_path, set_at_path, ActiveEffect, ActorDocument, ChangeApplicator, ChangeHandler,
    ChangeSet, DocumentSchema, EffectChange, EffectKind, ItemDocument, RulesConfig,
};

/// Result of one derived-data pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedData {
    /// Actor data with every applied change written in
    pub data: Value,
    /// Every key written by the pass, with its final value
    pub overrides: ChangeSet,
    /// Effects as prepared for this pass (suppression, staged status)
    pub effects: Vec<ActiveEffect>,
}

pub struct DerivedDataPass {
    config: Arc<RulesConfig>,
    handler: Arc<dyn ChangeHandler>,
}

impl DerivedDataPass {
    pub fn new(config: Arc<RulesConfig>, handler: Arc<dyn ChangeHandler>) -> Self {
        Self { config, handler }
    }

    /// Prepare effects and apply their changes to a copy of the actor's data.
    ///
    /// Suppression is recomputed for every effect first, so an effect on an
    /// unequipped item contributes nothing regardless of ordering. Changes are
    /// then applied in ascending priority, ties keeping effect order.
    ///
    /// # Arguments
    /// * `actor` - The actor whose data is derived
    /// * `items` - The actor's items, used to resolve effect suppression
    /// * `effects` - Effects on the actor and on its items
    /// * `schema` - Schema the change keys resolve against; the configured
    ///   formula keys are added to it
    pub fn run(
        &self,
        actor: &ActorDocument,
        items: &[ItemDocument],
        effects: Vec<ActiveEffect>,
        schema: &DocumentSchema,
    ) -> DerivedData {
        let effects: Vec<ActiveEffect> = effects
            .into_iter()
            .map(|effect| self.prepare(actor, items, effect))
            .collect();

        let mut changes: Vec<(&ActiveEffect, &EffectChange)> = effects
            .iter()
            .filter(|effect| effect.is_active() && effect.kind == EffectKind::Base)
            .flat_map(|effect| effect.changes.iter().map(move |change| (effect, change)))
            .collect();
        changes.sort_by_key(|(_, change)| change.effective_priority());

        let schema = schema
            .clone()
            .with_formula_keys(self.config.formula_keys.iter().cloned());
        let applicator = ChangeApplicator::new(&self.config, self.handler.as_ref());
        let mut data = actor.data.clone();
        let mut overrides = ChangeSet::new();
        for (effect, change) in changes {
            let Some(set) = applicator.apply(&data, change, &schema) else {
                tracing::debug!(effect = %effect.uuid, key = %change.key, "Change skipped");
                continue;
            };
            for (key, value) in set {
                if !set_at_path(&mut data, &key, value.clone()) {
                    tracing::warn!(effect = %effect.uuid, key = %key, "Cannot write change into actor data");
                    continue;
                }
                overrides.insert(key, value);
            }
        }

        DerivedData {
            data,
            overrides,
            effects,
        }
    }

    fn prepare(
        &self,
        actor: &ActorDocument,
        items: &[ItemDocument],
        mut effect: ActiveEffect,
    ) -> ActiveEffect {
        let parent_item = effect
            .parent()
            .and_then(|parent| items.iter().find(|item| item.uuid == parent));
        if effect.recompute_suppression(parent_item) {
            tracing::debug!(effect = %effect.uuid, "Effect suppressed");
        }

        if effect.is_staged_status(&self.config) {
            if effect.exhaustion_level.is_none() {
                effect.exhaustion_level = get_at_path(&actor.data, &self.config.exhaustion.attribute_key)
                    .and_then(Value::as_i64);
            }
            effect.prepare_exhaustion(&self.config);
        }
        effect
    }
}
