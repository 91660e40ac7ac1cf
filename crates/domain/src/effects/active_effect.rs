//! Active effect entity
//!
//! An effect carries change records, status tags and a duration, and is
//! embedded in an actor or an item. Its `suppressed` flag is derived once per
//! pass and never persisted.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::changes::{get_at_path, EffectChange};
use crate::config::RulesConfig;
use crate::effects::documents::ItemDocument;
use crate::effects::status::StatusEffectTemplate;
use crate::error::DomainError;
use crate::ids::{static_id, DocumentId, DocumentUuid};

/// Prefix for the deterministic ids of status condition effects.
const STATUS_ID_PREFIX: &str = "dnd5e";

/// Kind of effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    #[default]
    Base,
    /// Modifies the item it is applied to rather than the item's owner
    Enchantment,
}

/// How long an effect lasts. All fields empty means indefinitely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectDuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turns: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
}

impl EffectDuration {
    /// Map an item's declared duration onto an effect duration.
    ///
    /// # Arguments
    /// * `units` - Item duration units (`turn`, `round`, `minute`, ...)
    /// * `value` - Amount of units; missing or zero counts as one
    ///
    /// # Returns
    /// An empty duration for units without a fixed length (`inst`, `perm`, `spec`).
    pub fn from_item(units: Option<&str>, value: Option<u64>) -> Self {
        let value = value.filter(|v| *v > 0).unwrap_or(1);
        let seconds = |multiplier: u64| Self {
            seconds: Some(value * multiplier),
            ..Self::default()
        };
        match units {
            Some("turn") => Self {
                turns: Some(value),
                ..Self::default()
            },
            Some("round") => Self {
                rounds: Some(value),
                ..Self::default()
            },
            Some("minute") => seconds(60),
            Some("hour") => seconds(60 * 60),
            Some("day") => seconds(60 * 60 * 24),
            Some("year") => seconds(60 * 60 * 24 * 365),
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_none() && self.turns.is_none() && self.seconds.is_none()
    }
}

/// Weak reference to a document spawned by an effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependentRef {
    pub uuid: DocumentUuid,
}

impl DependentRef {
    pub fn new(uuid: DocumentUuid) -> Self {
        Self { uuid }
    }
}

/// Extra documents an enchantment brings along when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnchantmentRiders {
    /// Ids of effects on the enchantment's origin item to copy onto the enchanted item
    pub effects: Vec<DocumentId>,
    /// Items to copy onto the actor owning the enchanted item
    pub items: Vec<DocumentUuid>,
}

impl EnchantmentRiders {
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty() && self.items.is_empty()
    }
}

/// Modifier document embedded in an actor or item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEffect {
    pub id: DocumentId,
    pub uuid: DocumentUuid,
    pub name: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: EffectKind,
    /// Document that caused the effect
    #[serde(default)]
    pub origin: Option<DocumentUuid>,
    /// Status ids, in insertion order without duplicates
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub duration: EffectDuration,
    #[serde(default)]
    pub changes: Vec<EffectChange>,
    #[serde(default)]
    pub dependents: Vec<DependentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhaustion_level: Option<i64>,
    #[serde(default, skip_serializing_if = "EnchantmentRiders::is_empty")]
    pub riders: EnchantmentRiders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Level of the spell being concentrated on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_level: Option<u8>,
    #[serde(skip)]
    pub suppressed: bool,
}

impl ActiveEffect {
    pub fn new(id: DocumentId, parent: &DocumentUuid, name: impl Into<String>) -> Self {
        Self {
            uuid: parent.child("ActiveEffect", &id),
            id,
            name: name.into(),
            img: None,
            kind: EffectKind::Base,
            origin: None,
            statuses: Vec::new(),
            disabled: false,
            duration: EffectDuration::default(),
            changes: Vec::new(),
            dependents: Vec::new(),
            exhaustion_level: None,
            riders: EnchantmentRiders::default(),
            description: None,
            spell_level: None,
            suppressed: false,
        }
    }

    pub fn with_kind(mut self, kind: EffectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_origin(mut self, origin: DocumentUuid) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_change(mut self, change: EffectChange) -> Self {
        self.changes.push(change);
        self
    }

    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for status in statuses {
            self.add_status(status);
        }
        self
    }

    pub fn with_riders(mut self, riders: EnchantmentRiders) -> Self {
        self.riders = riders;
        self
    }

    /// Instantiate a status condition effect from its template.
    ///
    /// The id is derived from the status id, so the same condition applied
    /// twice to one parent resolves to the same document.
    pub fn from_status_effect(template: &StatusEffectTemplate, parent: &DocumentUuid) -> Self {
        let mut effect = Self::new(Self::status_id(&template.id), parent, template.name.clone())
            .with_statuses(template.all_statuses());
        effect.img = template.img.clone();
        effect.description = template
            .reference
            .as_ref()
            .map(|reference| format!("@Embed[{} inline]", reference));
        effect
    }

    /// Deterministic id of the effect for a status condition.
    pub fn status_id(status: &str) -> DocumentId {
        static_id(&format!("{}{}", STATUS_ID_PREFIX, status))
    }

    /// Build the effect that tracks concentration on `item`.
    ///
    /// # Arguments
    /// * `item` - An item embedded in an actor that requires concentration
    /// * `config` - Supplies the concentrating status template
    ///
    /// # Returns
    /// An effect to create on the item's actor, or a validation error when the
    /// item cannot be concentrated on.
    pub fn concentration(item: &ItemDocument, config: &RulesConfig) -> Result<Self, DomainError> {
        let Some(actor) = item.parent().filter(|_| item.requires_concentration) else {
            return Err(DomainError::validation(format!(
                "You may not begin concentrating on {}",
                item.name
            )));
        };
        let status = config.status_effect(&config.concentrating_status).ok_or_else(|| {
            DomainError::not_found("StatusEffect", config.concentrating_status.clone())
        })?;

        let mut effect = Self::new(
            DocumentId::generate(),
            &actor,
            format!("{}: {}", status.name, item.name),
        )
        .with_origin(item.uuid.clone())
        .with_statuses(status.all_statuses());
        effect.img = status.img.clone();
        effect.description = Some(format!("Concentrating on {} ({})", item.name, item.item_type));
        effect.duration = item.effect_duration();
        if item.item_type == "spell" {
            effect.spell_level = item.level;
        }
        Ok(effect)
    }

    /// Insert a status, keeping the first occurrence.
    pub fn add_status(&mut self, status: impl Into<String>) {
        let status = status.into();
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
    }

    /// Uuid of the document the effect is embedded in.
    pub fn parent(&self) -> Option<DocumentUuid> {
        self.uuid.parent()
    }

    /// Whether the effect sits directly on an actor.
    pub fn is_on_actor(&self) -> bool {
        self.parent()
            .is_some_and(|parent| parent.document_name() == Some("Actor"))
    }

    /// An enchantment that came from some other document than its parent.
    pub fn is_applied_enchantment(&self) -> bool {
        self.kind == EffectKind::Enchantment
            && self
                .origin
                .as_ref()
                .is_some_and(|origin| Some(origin) != self.parent().as_ref())
    }

    pub fn is_active(&self) -> bool {
        !self.disabled && !self.suppressed
    }

    /// Recompute the suppression flag for this pass.
    ///
    /// Effects on an item follow the item's suppression; enchantments never
    /// are suppressed this way. Returns the new flag.
    pub fn recompute_suppression(&mut self, parent_item: Option<&ItemDocument>) -> bool {
        self.suppressed = match (self.kind, parent_item) {
            (EffectKind::Enchantment, _) | (_, None) => false,
            (EffectKind::Base, Some(item)) => item.effects_suppressed,
        };
        self.suppressed
    }

    pub fn is_staged_status(&self, config: &RulesConfig) -> bool {
        self.id == Self::status_id(&config.exhaustion.id)
    }

    /// Set the level-specific name and icon of the staged status effect and
    /// add the terminal statuses at the final level.
    pub fn prepare_exhaustion(&mut self, config: &RulesConfig) {
        let staged = &config.exhaustion;
        let level = self
            .exhaustion_level
            .unwrap_or(1)
            .clamp(0, i64::from(u8::MAX)) as u8;
        self.img = Some(staged.icon_for_level(level));
        self.name = staged.label_for_level(level);
        if level >= staged.levels {
            self.add_status(staged.terminal_status.clone());
            if let Some(terminal) = config.status_effect(&staged.terminal_status) {
                for status in &terminal.statuses {
                    self.add_status(status.clone());
                }
            }
        }
    }

    /// Append dependents, skipping ones already recorded.
    pub fn record_dependents(&mut self, refs: impl IntoIterator<Item = DependentRef>) {
        for dependent in refs {
            if !self.dependents.contains(&dependent) {
                self.dependents.push(dependent);
            }
        }
    }
}

/// Upgrade effect source data written by older versions in place.
///
/// Enchantments were once marked with a `flags.dnd5e.type` flag. Returns
/// whether anything changed.
pub fn migrate_effect_source(source: &mut Value) -> bool {
    let Some(flags) = source
        .get_mut("flags")
        .and_then(|flags| flags.get_mut("dnd5e"))
        .and_then(Value::as_object_mut)
    else {
        return false;
    };
    if flags.get("type").and_then(Value::as_str) != Some("enchantment") {
        return false;
    }
    flags.remove("type");
    if let Some(object) = source.as_object_mut() {
        object.insert("type".to_string(), Value::String("enchantment".to_string()));
    }
    true
}

/// Choices of a set field that effects added or removed.
///
/// Compares the set at `path` in the source data against the derived data and
/// reports each differing choice as `<prefix>.<choice>`, added ones first.
pub fn overridden_choices(source: &Value, derived: &Value, path: &str, prefix: &str) -> Vec<String> {
    let source_set = choice_set(get_at_path(source, path));
    let derived_set = choice_set(get_at_path(derived, path));
    derived_set
        .difference(&source_set)
        .chain(source_set.difference(&derived_set))
        .map(|choice| format!("{}.{}", prefix, choice))
        .collect()
}

fn choice_set(value: Option<&Value>) -> BTreeSet<String> {
    let Some(Value::Array(items)) = value else {
        return BTreeSet::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}
