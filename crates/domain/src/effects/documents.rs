//! Documents that host effects
//!
//! Only the shape the rules core needs: an actor's data tree, and the item
//! fields that drive suppression, concentration and enchantment checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::changes::{get_at_path, ChangeSet};
use crate::config::RulesConfig;
use crate::effects::active_effect::{ActiveEffect, DependentRef, EffectDuration};
use crate::effects::status::StagedStatus;
use crate::ids::{DocumentId, DocumentUuid};

// =============================================================================
// Actor
// =============================================================================

/// A creature or character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDocument {
    pub id: DocumentId,
    pub uuid: DocumentUuid,
    pub name: String,
    /// Full data tree that change keys resolve against (`name`, `system`, `flags`)
    #[serde(default)]
    pub data: Value,
}

/// Result of moving an actor's staged status by some levels.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLevelChange {
    pub level: u8,
    /// Update the host writes back to the actor
    pub update: ChangeSet,
}

impl ActorDocument {
    pub fn new(id: DocumentId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: DocumentUuid::root("Actor", &id),
            id,
            data: serde_json::json!({ "name": name.clone() }),
            name,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Move the configured staged status (exhaustion) by `delta` levels.
    ///
    /// Returns `None` when the actor has no numeric level to move.
    pub fn advance_status_level(&self, config: &RulesConfig, delta: i32) -> Option<StatusLevelChange> {
        let key = &config.exhaustion.attribute_key;
        let current = get_at_path(&self.data, key)?.as_f64()?;
        let mut status = StagedStatus::clamped(current as i64, config.exhaustion.levels);
        let level = status.advance(delta);
        let mut update = ChangeSet::new();
        update.insert(key.clone(), Value::from(level));
        Some(StatusLevelChange { level, update })
    }
}

// =============================================================================
// Item
// =============================================================================

/// Duration declared on an item, e.g. `{ "value": 10, "units": "minute" }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDuration {
    #[serde(default)]
    pub value: Option<u64>,
    #[serde(default)]
    pub units: Option<String>,
}

/// Restrictions an enchantment source places on the items it can enchant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnchantmentRestrictions {
    /// Item types that can be enchanted; empty allows any type
    pub allowed_types: Vec<String>,
    /// Whether items that are already magical can be enchanted
    pub allow_magical: bool,
}

impl EnchantmentRestrictions {
    /// Check whether `item` can receive an enchantment from this source.
    ///
    /// # Returns
    /// Every reason the enchantment is rejected; empty when it is allowed.
    pub fn can_enchant(&self, item: &ItemDocument) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.allowed_types.is_empty() && !self.allowed_types.contains(&item.item_type) {
            errors.push(format!(
                "{} cannot be enchanted: {} items are not allowed",
                item.name, item.item_type
            ));
        }
        if item.magical && !self.allow_magical {
            errors.push(format!("{} cannot be enchanted: item is already magical", item.name));
        }
        errors
    }
}

/// An item, either in a world collection or embedded in an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDocument {
    pub id: DocumentId,
    pub uuid: DocumentUuid,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub magical: bool,
    /// Unequipped or unattuned; effects it grants are inactive
    #[serde(default)]
    pub effects_suppressed: bool,
    #[serde(default)]
    pub requires_concentration: bool,
    #[serde(default)]
    pub duration: ItemDuration,
    /// Spell level, for spells
    #[serde(default)]
    pub level: Option<u8>,
    /// Present on items that apply enchantments
    #[serde(default)]
    pub enchantment: Option<EnchantmentRestrictions>,
    /// Enchantment that created this item as a rider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enchanted_by: Option<DocumentUuid>,
    /// Effects embedded in the item
    #[serde(default)]
    pub effects: Vec<ActiveEffect>,
}

impl ItemDocument {
    /// A world-level item.
    pub fn new(id: DocumentId, name: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            uuid: DocumentUuid::root("Item", &id),
            id,
            name: name.into(),
            item_type: item_type.into(),
            magical: false,
            effects_suppressed: false,
            requires_concentration: false,
            duration: ItemDuration::default(),
            level: None,
            enchantment: None,
            enchanted_by: None,
            effects: Vec::new(),
        }
    }

    /// Re-home the item under an actor, keeping its id.
    pub fn embedded_in(mut self, actor: &DocumentUuid) -> Self {
        self.uuid = actor.child("Item", &self.id);
        for effect in &mut self.effects {
            effect.uuid = self.uuid.child("ActiveEffect", &effect.id);
        }
        self
    }

    /// Actor owning this item, if it is embedded.
    pub fn parent(&self) -> Option<DocumentUuid> {
        self.uuid.parent()
    }

    pub fn is_embedded(&self) -> bool {
        self.uuid.is_embedded()
    }

    pub fn effect(&self, id: &DocumentId) -> Option<&ActiveEffect> {
        self.effects.iter().find(|effect| &effect.id == id)
    }

    pub fn effect_duration(&self) -> EffectDuration {
        EffectDuration::from_item(self.duration.units.as_deref(), self.duration.value)
    }
}

// =============================================================================
// Stored documents
// =============================================================================

/// Any document the store can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "documentName")]
pub enum StoredDocument {
    Actor(ActorDocument),
    Item(ItemDocument),
    #[serde(rename = "ActiveEffect")]
    Effect(ActiveEffect),
}

impl StoredDocument {
    pub fn uuid(&self) -> &DocumentUuid {
        match self {
            Self::Actor(actor) => &actor.uuid,
            Self::Item(item) => &item.uuid,
            Self::Effect(effect) => &effect.uuid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Actor(actor) => &actor.name,
            Self::Item(item) => &item.name,
            Self::Effect(effect) => &effect.name,
        }
    }

    /// Dependents recorded on the document. Only effects record any.
    pub fn dependents(&self) -> &[DependentRef] {
        match self {
            Self::Effect(effect) => &effect.dependents,
            _ => &[],
        }
    }

    pub fn as_effect(&self) -> Option<&ActiveEffect> {
        match self {
            Self::Effect(effect) => Some(effect),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&ItemDocument> {
        match self {
            Self::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_actor(&self) -> Option<&ActorDocument> {
        match self {
            Self::Actor(actor) => Some(actor),
            _ => None,
        }
    }
}

impl From<ActorDocument> for StoredDocument {
    fn from(actor: ActorDocument) -> Self {
        Self::Actor(actor)
    }
}

impl From<ItemDocument> for StoredDocument {
    fn from(item: ItemDocument) -> Self {
        Self::Item(item)
    }
}

impl From<ActiveEffect> for StoredDocument {
    fn from(effect: ActiveEffect) -> Self {
        Self::Effect(effect)
    }
}
