//! Change records and the change set they produce.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::DomainError;

/// How a change combines its value with the field's current value.
///
/// The numeric codes match the host's wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeMode {
    Custom = 0,
    Multiply = 1,
    Add = 2,
    Downgrade = 3,
    Upgrade = 4,
    Override = 5,
}

impl ChangeMode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Custom),
            1 => Some(Self::Multiply),
            2 => Some(Self::Add),
            3 => Some(Self::Downgrade),
            4 => Some(Self::Upgrade),
            5 => Some(Self::Override),
            _ => None,
        }
    }

    /// Priority used when a change does not declare one.
    pub fn default_priority(self) -> i32 {
        i32::from(self.code()) * 10
    }
}

impl fmt::Display for ChangeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Custom => "custom",
            Self::Multiply => "multiply",
            Self::Add => "add",
            Self::Downgrade => "downgrade",
            Self::Upgrade => "upgrade",
            Self::Override => "override",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ChangeMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "custom" => Ok(Self::Custom),
            "multiply" => Ok(Self::Multiply),
            "add" => Ok(Self::Add),
            "downgrade" => Ok(Self::Downgrade),
            "upgrade" => Ok(Self::Upgrade),
            "override" => Ok(Self::Override),
            _ => Err(DomainError::parse(format!("Unknown change mode: {}", s))),
        }
    }
}

impl Serialize for ChangeMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for ChangeMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .and_then(Self::from_code)
                .ok_or_else(|| serde::de::Error::custom(format!("Unknown change mode: {}", n))),
            Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!(
                "Expected change mode, found {}",
                other
            ))),
        }
    }
}

/// Declarative instruction to modify one field of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectChange {
    /// Dotted key path into the document
    pub key: String,
    /// Raw value, usually a string authored in the effect sheet
    pub value: Value,
    pub mode: ChangeMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl EffectChange {
    pub fn new(key: impl Into<String>, mode: ChangeMode, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mode,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or_else(|| self.mode.default_priority())
    }

    /// Raw value rendered as text, the way it was authored.
    pub fn raw_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Accumulated key → new value pairs produced by applying changes.
///
/// The host merges these into the live document.
pub type ChangeSet = BTreeMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_accepts_codes_and_names() {
        let by_code: EffectChange =
            serde_json::from_value(json!({ "key": "a", "value": "1", "mode": 4 })).unwrap();
        let by_name: EffectChange =
            serde_json::from_value(json!({ "key": "a", "value": "1", "mode": "upgrade" })).unwrap();
        assert_eq!(by_code.mode, ChangeMode::Upgrade);
        assert_eq!(by_name.mode, ChangeMode::Upgrade);
    }

    #[test]
    fn unknown_mode_fails_to_deserialize() {
        let result: Result<EffectChange, _> =
            serde_json::from_value(json!({ "key": "a", "value": "1", "mode": 9 }));
        assert!(result.is_err());
    }

    #[test]
    fn mode_serializes_as_code() {
        let change = EffectChange::new("system.attributes.ac.bonus", ChangeMode::Add, "+1");
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["mode"], json!(2));
        assert!(json.get("priority").is_none());
    }

    #[test]
    fn priority_defaults_from_mode() {
        assert_eq!(EffectChange::new("k", ChangeMode::Override, "x").effective_priority(), 50);
        assert_eq!(EffectChange::new("k", ChangeMode::Add, "x").effective_priority(), 20);
        assert_eq!(
            EffectChange::new("k", ChangeMode::Add, "x")
                .with_priority(1)
                .effective_priority(),
            1
        );
    }

    #[test]
    fn raw_text_renders_non_strings() {
        assert_eq!(EffectChange::new("k", ChangeMode::Add, 3).raw_text(), "3");
        assert_eq!(EffectChange::new("k", ChangeMode::Add, "3").raw_text(), "3");
        assert_eq!(EffectChange::new("k", ChangeMode::Add, Value::Null).raw_text(), "");
    }
}
