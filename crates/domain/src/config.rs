//! Rules configuration
//!
//! Everything the rules core needs to know about the game system that is not
//! declared in a document schema: derived formula keys, character flags, status
//! conditions and the staged exhaustion condition. Defaults follow the 5th
//! edition rules; a host can load its own set from JSON.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::effects::status::{StagedStatusConfig, StatusEffectTemplate};
use crate::error::DomainError;
use crate::schema::FieldType;

/// Key prefix of system-owned actor flags.
pub const FLAG_NAMESPACE: &str = "flags.dnd5e.";

/// Value type of a character flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    Boolean,
    Number,
    String,
}

/// A special trait toggled on the character sheet and stored under `flags.dnd5e`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterFlag {
    pub name: String,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    #[serde(default)]
    pub placeholder: Option<Value>,
}

impl CharacterFlag {
    pub fn new(name: impl Into<String>, flag_type: FlagType) -> Self {
        Self {
            name: name.into(),
            flag_type,
            placeholder: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<Value>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn field_type(&self) -> FieldType {
        match self.flag_type {
            FlagType::Boolean => FieldType::Boolean,
            FlagType::Number => FieldType::Number,
            FlagType::String => FieldType::String,
        }
    }

    /// Value the flag takes before anything sets it.
    pub fn initial_value(&self) -> Option<Value> {
        if let Some(placeholder) = &self.placeholder {
            return Some(placeholder.clone());
        }
        match self.flag_type {
            FlagType::Boolean => Some(Value::Bool(false)),
            FlagType::Number => Some(Value::from(0)),
            FlagType::String => None,
        }
    }
}

/// Game-system configuration consumed by the rules core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesConfig {
    /// Derived properties that hold formulas without a declared field
    pub formula_keys: BTreeSet<String>,
    /// Character flags keyed by the part after `flags.dnd5e.`
    pub character_flags: BTreeMap<String, CharacterFlag>,
    pub status_effects: Vec<StatusEffectTemplate>,
    pub exhaustion: StagedStatusConfig,
    /// Status id marking concentration on a spell or item
    pub concentrating_status: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let formula_keys = [
            "system.attributes.ac.bonus",
            "system.attributes.ac.min",
            "system.attributes.encumbrance.bonuses.encumbered",
            "system.attributes.encumbrance.bonuses.heavilyEncumbered",
            "system.attributes.encumbrance.bonuses.maximum",
            "system.attributes.encumbrance.bonuses.overall",
            "system.attributes.encumbrance.multipliers.encumbered",
            "system.attributes.encumbrance.multipliers.heavilyEncumbered",
            "system.attributes.encumbrance.multipliers.maximum",
            "system.attributes.encumbrance.multipliers.overall",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mut character_flags = BTreeMap::new();
        for (key, name) in [
            ("diamondSoul", "Diamond Soul"),
            ("elvenAccuracy", "Elven Accuracy"),
            ("halflingLucky", "Halfling Lucky"),
            ("initiativeAdv", "Advantage on Initiative"),
            ("initiativeAlert", "Alert Feat"),
            ("jackOfAllTrades", "Jack of All Trades"),
            ("observantFeat", "Observant Feat"),
            ("powerfulBuild", "Powerful Build"),
            ("reliableTalent", "Reliable Talent"),
            ("remarkableAthlete", "Remarkable Athlete"),
            ("tavernBrawlerFeat", "Tavern Brawler Feat"),
        ] {
            character_flags.insert(key.to_string(), CharacterFlag::new(name, FlagType::Boolean));
        }
        for (key, name, placeholder) in [
            ("weaponCriticalThreshold", "Weapon Critical Hit Threshold", 20),
            ("spellCriticalThreshold", "Spell Critical Hit Threshold", 20),
            ("meleeCriticalDamageDice", "Melee Critical Damage Dice", 0),
        ] {
            character_flags.insert(
                key.to_string(),
                CharacterFlag::new(name, FlagType::Number).with_placeholder(placeholder),
            );
        }

        let status_effects = vec![
            StatusEffectTemplate::new("blinded", "Blinded"),
            StatusEffectTemplate::new("charmed", "Charmed"),
            StatusEffectTemplate::new("concentrating", "Concentrating"),
            StatusEffectTemplate::new("dead", "Dead").with_statuses(["incapacitated"]),
            StatusEffectTemplate::new("deafened", "Deafened"),
            StatusEffectTemplate::new("exhaustion", "Exhaustion"),
            StatusEffectTemplate::new("frightened", "Frightened"),
            StatusEffectTemplate::new("grappled", "Grappled"),
            StatusEffectTemplate::new("incapacitated", "Incapacitated"),
            StatusEffectTemplate::new("invisible", "Invisible"),
            StatusEffectTemplate::new("paralyzed", "Paralyzed").with_statuses(["incapacitated"]),
            StatusEffectTemplate::new("petrified", "Petrified").with_statuses(["incapacitated"]),
            StatusEffectTemplate::new("poisoned", "Poisoned"),
            StatusEffectTemplate::new("prone", "Prone"),
            StatusEffectTemplate::new("restrained", "Restrained"),
            StatusEffectTemplate::new("stunned", "Stunned").with_statuses(["incapacitated"]),
            StatusEffectTemplate::new("unconscious", "Unconscious")
                .with_statuses(["incapacitated"])
                .with_riders(["prone"]),
        ]
        .into_iter()
        .map(|template| {
            let reference = format!("Compendium.dnd5e.rules.JournalEntry.conditions.{}", template.id);
            template.with_reference(reference)
        })
        .collect();

        Self {
            formula_keys,
            character_flags,
            status_effects,
            exhaustion: StagedStatusConfig::default(),
            concentrating_status: "concentrating".to_string(),
        }
    }
}

impl RulesConfig {
    /// Parse a configuration document; missing sections fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self, DomainError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn status_effect(&self, id: &str) -> Option<&StatusEffectTemplate> {
        self.status_effects.iter().find(|template| template.id == id)
    }

    /// Flag definition for a full key such as `flags.dnd5e.initiativeAlert`.
    pub fn character_flag(&self, key: &str) -> Option<&CharacterFlag> {
        self.character_flags.get(key.strip_prefix(FLAG_NAMESPACE)?)
    }
}
