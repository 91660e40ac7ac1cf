//! Status conditions and staged (multi-level) statuses
//!
//! Status effect templates describe the conditions the host can toggle on a
//! token (blinded, prone, ...). A staged status such as exhaustion is a single
//! condition with an integer level; each level has its own icon and the final
//! level marks the creature dead.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

// =============================================================================
// Status effect templates
// =============================================================================

/// Template from which a status condition effect is instantiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEffectTemplate {
    /// Status id (`"prone"`, `"exhaustion"`)
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub img: Option<String>,
    /// Statuses that always accompany this one on the same effect
    #[serde(default)]
    pub statuses: Vec<String>,
    /// Statuses applied as separate effects whenever this one is applied
    #[serde(default)]
    pub riders: Vec<String>,
    /// Compendium reference for the rules text
    #[serde(default)]
    pub reference: Option<String>,
}

impl StatusEffectTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            img: None,
            statuses: Vec::new(),
            riders: Vec::new(),
            reference: None,
        }
    }

    pub fn with_statuses<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statuses = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_riders<I, S>(mut self, riders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.riders = riders.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// The status itself followed by its co-occurring statuses.
    pub fn all_statuses(&self) -> Vec<String> {
        let mut all = vec![self.id.clone()];
        for status in &self.statuses {
            if !all.contains(status) {
                all.push(status.clone());
            }
        }
        all
    }
}

// =============================================================================
// Staged statuses
// =============================================================================

/// Configuration for a condition tracked as a level (e.g. exhaustion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedStatusConfig {
    /// Status id of the condition
    pub id: String,
    /// Display label; the level is appended
    pub label: String,
    /// Highest level; reaching it is terminal
    pub levels: u8,
    /// Base icon; each level gets `<path>-<level>.<ext>`
    pub icon: String,
    /// Status added when the highest level is reached
    pub terminal_status: String,
    /// Actor key holding the current level
    pub attribute_key: String,
}

impl Default for StagedStatusConfig {
    fn default() -> Self {
        Self {
            id: "exhaustion".to_string(),
            label: "Exhaustion".to_string(),
            levels: 6,
            icon: "systems/dnd5e/icons/svg/statuses/exhaustion.svg".to_string(),
            terminal_status: "dead".to_string(),
            attribute_key: "system.attributes.exhaustion".to_string(),
        }
    }
}

impl StagedStatusConfig {
    /// Icon for a level, derived by appending the level to the base path.
    pub fn icon_for_level(&self, level: u8) -> String {
        match self.icon.rsplit_once('.') {
            Some((path, ext)) if !ext.contains('/') => format!("{}-{}.{}", path, level, ext),
            _ => format!("{}-{}", self.icon, level),
        }
    }

    pub fn label_for_level(&self, level: u8) -> String {
        format!("{} {}", self.label, level)
    }
}

/// Current level of a staged status, always within `0..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagedStatus {
    level: u8,
    max: u8,
}

impl StagedStatus {
    pub fn new(level: u8, max: u8) -> Result<Self, DomainError> {
        if level > max {
            return Err(DomainError::invalid_state_transition(format!(
                "level {} exceeds maximum {}",
                level, max
            )));
        }
        Ok(Self { level, max })
    }

    /// Build from an arbitrary level, clamping it into range.
    pub fn clamped(level: i64, max: u8) -> Self {
        Self {
            level: level.clamp(0, i64::from(max)) as u8,
            max,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Move by `delta` levels, clamped to `[0, max]`. Returns the new level.
    pub fn advance(&mut self, delta: i32) -> u8 {
        let next = i64::from(self.level) + i64::from(delta);
        self.level = next.clamp(0, i64::from(self.max)) as u8;
        self.level
    }

    pub fn increase(&mut self) -> u8 {
        self.advance(1)
    }

    pub fn decrease(&mut self) -> u8 {
        self.advance(-1)
    }

    /// The highest level has been reached.
    pub fn is_terminal(&self) -> bool {
        self.level >= self.max
    }
}
