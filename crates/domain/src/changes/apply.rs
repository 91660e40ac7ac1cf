//! Applying a change record to a document.
//!
//! [`ChangeApplicator::apply`] resolves the target's type, casts the raw value,
//! and combines it with the current value under the change's mode. It never
//! touches the document: every result is returned as a [`ChangeSet`] for the
//! host to merge, so the same change can be dry-run or replayed.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde_json::Value;

use crate::config::{CharacterFlag, FlagType, RulesConfig};
use crate::schema::{DocumentSchema, FieldType};

use super::cast::{cast, cast_flag_boolean, is_truthy, number_value};
use super::change::{ChangeMode, ChangeSet, EffectChange};
use super::formula::{compose_formula, FormulaComposition};
use super::path::get_at_path;

/// Token in a string override that is replaced with the current value.
pub const CURRENT_VALUE_PLACEHOLDER: &str = "{}";

static REMOVAL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s*").expect("valid regex"));

/// Host-side fallbacks for changes the core does not handle itself.
pub trait ChangeHandler: Send + Sync {
    /// Apply a change whose target has no field type the core understands.
    fn apply_untyped(&self, document: &Value, change: &EffectChange) -> Option<ChangeSet>;

    /// Apply a change in custom mode.
    fn apply_custom(
        &self,
        document: &Value,
        change: &EffectChange,
        current: Option<&Value>,
        delta: &Value,
    ) -> Option<ChangeSet>;
}

/// Fallback that infers the type from the current value and applies the
/// conventional combination rules. Custom mode is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericChangeHandler;

impl ChangeHandler for GenericChangeHandler {
    fn apply_untyped(&self, document: &Value, change: &EffectChange) -> Option<ChangeSet> {
        let current = get_at_path(document, &change.key);
        let inferred = match current {
            Some(Value::Number(_)) => FieldType::Number,
            Some(Value::Bool(_)) => FieldType::Boolean,
            Some(Value::String(_)) => FieldType::String,
            Some(Value::Array(_)) => FieldType::Array(Box::new(FieldType::Untyped)),
            Some(Value::Object(_)) => FieldType::Object,
            Some(Value::Null) | None => FieldType::Untyped,
        };
        let delta = match cast(&change.key, &change.value, &inferred) {
            Ok(delta) => delta,
            Err(err) => {
                tracing::warn!(key = %err.key, raw = %err.raw, "Unable to parse untyped change");
                return None;
            }
        };
        let mut changes = ChangeSet::new();
        if let Some(update) = combine(change.mode, current, &delta) {
            changes.insert(change.key.clone(), update);
        }
        Some(changes)
    }

    fn apply_custom(
        &self,
        _document: &Value,
        change: &EffectChange,
        _current: Option<&Value>,
        _delta: &Value,
    ) -> Option<ChangeSet> {
        tracing::debug!(key = %change.key, "No custom handler registered, change ignored");
        Some(ChangeSet::new())
    }
}

/// Applies change records against a document and its schema.
pub struct ChangeApplicator<'a> {
    handler: &'a dyn ChangeHandler,
    config: &'a RulesConfig,
}

impl<'a> ChangeApplicator<'a> {
    pub fn new(config: &'a RulesConfig, handler: &'a dyn ChangeHandler) -> Self {
        Self { handler, config }
    }

    /// Apply one change. Returns `None` when the change was dropped (its value
    /// could not be cast), otherwise the resulting change set, possibly empty.
    pub fn apply(
        &self,
        document: &Value,
        change: &EffectChange,
        schema: &DocumentSchema,
    ) -> Option<ChangeSet> {
        let flag = self.config.character_flag(&change.key);

        let field_type = match flag {
            Some(flag) => flag.field_type(),
            None => schema.resolve_type(&change.key),
        };
        if field_type == FieldType::Untyped {
            return self.handler.apply_untyped(document, change);
        }

        let mut changes = ChangeSet::new();
        let current: Option<Value> = match get_at_path(document, &change.key) {
            Some(value) => Some(value.clone()),
            None => {
                let initial = flag.and_then(CharacterFlag::initial_value);
                if let Some(initial) = &initial {
                    changes.insert(change.key.clone(), initial.clone());
                }
                initial
            }
        };

        if field_type == FieldType::Formula {
            let delta = change.raw_text().trim().to_string();
            let current_text = current.as_ref().and_then(formula_text);
            match compose_formula(current_text.as_deref(), change.mode, &delta) {
                FormulaComposition::Composed(formula) => {
                    changes.insert(change.key.clone(), Value::String(formula));
                }
                FormulaComposition::Custom => {
                    return self.handler.apply_custom(
                        document,
                        change,
                        current.as_ref(),
                        &Value::String(delta),
                    );
                }
            }
            return Some(changes);
        }

        let mut raw = change.value.clone();
        if field_type == FieldType::String && change.mode == ChangeMode::Override {
            if let Value::String(template) = &change.value {
                if template.contains(CURRENT_VALUE_PLACEHOLDER) {
                    let current_text = current.as_ref().map(text_of).unwrap_or_default();
                    raw = Value::String(template.replacen(
                        CURRENT_VALUE_PLACEHOLDER,
                        &current_text,
                        1,
                    ));
                }
            }
        }

        let cast_value = match flag {
            Some(flag) if flag.flag_type == FlagType::Boolean => Ok(cast_flag_boolean(&raw)),
            _ => cast(&change.key, &raw, &field_type),
        };
        let delta = match cast_value {
            Ok(delta) => delta,
            Err(err) => {
                tracing::warn!(
                    key = %err.key,
                    raw = %err.raw,
                    "Unable to parse active effect change"
                );
                return None;
            }
        };

        let update = match change.mode {
            ChangeMode::Add if field_type.is_set() => Some(set_add(current.as_ref(), &delta)),
            ChangeMode::Override if field_type.is_set() => Some(set_override(&delta)),
            ChangeMode::Custom => {
                return self
                    .handler
                    .apply_custom(document, change, current.as_ref(), &delta);
            }
            mode => combine(mode, current.as_ref(), &delta),
        };

        if let Some(update) = update {
            changes.insert(change.key.clone(), update);
        }
        Some(changes)
    }
}

/// Conventional combination of a cast delta with the current value.
///
/// Returns `None` when the mode has nothing to do for this pair of values.
pub fn combine(mode: ChangeMode, current: Option<&Value>, delta: &Value) -> Option<Value> {
    match mode {
        ChangeMode::Add => match current {
            None => Some(delta.clone()),
            Some(Value::Bool(b)) => Some(Value::Bool(*b || is_truthy(delta))),
            Some(Value::Array(items)) => {
                let mut items = items.clone();
                match delta {
                    Value::Array(more) => items.extend(more.iter().cloned()),
                    other => items.push(other.clone()),
                }
                Some(Value::Array(items))
            }
            Some(Value::Number(n)) => {
                let d = delta.as_f64()?;
                number_value(n.as_f64()? + d)
            }
            Some(Value::String(s)) => Some(Value::String(format!("{}{}", s, text_of(delta)))),
            Some(Value::Object(map)) => {
                let Value::Object(more) = delta else {
                    return None;
                };
                let mut merged = map.clone();
                merged.extend(more.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(Value::Object(merged))
            }
            Some(Value::Null) => Some(delta.clone()),
        },
        ChangeMode::Multiply => match current? {
            Value::Number(n) => number_value(n.as_f64()? * delta.as_f64()?),
            Value::Bool(b) => Some(Value::Bool(*b && is_truthy(delta))),
            _ => None,
        },
        ChangeMode::Override => Some(delta.clone()),
        ChangeMode::Upgrade | ChangeMode::Downgrade => {
            let Some(current) = current else {
                return Some(delta.clone());
            };
            let (current, proposed) = match (current, delta) {
                (Value::Number(c), Value::Number(d)) => (c.as_f64()?, d.as_f64()?),
                (Value::Bool(c), Value::Bool(d)) => (f64::from(u8::from(*c)), f64::from(u8::from(*d))),
                _ => return None,
            };
            let replace = if mode == ChangeMode::Upgrade {
                proposed > current
            } else {
                proposed < current
            };
            replace.then(|| delta.clone())
        }
        ChangeMode::Custom => None,
    }
}

/// Add tokens to a set; a token prefixed with `-` removes its unprefixed form.
fn set_add(current: Option<&Value>, delta: &Value) -> Value {
    let mut entries: Vec<Value> = match current {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let tokens: Vec<&Value> = match delta {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for token in tokens {
        let removal = token.as_str().and_then(|s| {
            let stripped = REMOVAL_PREFIX_RE.replace(s, "");
            (stripped.len() != s.len()).then(|| stripped.into_owned())
        });
        match removal {
            Some(removed) => entries.retain(|entry| entry.as_str() != Some(removed.as_str())),
            None => {
                if !entries.contains(token) {
                    entries.push(token.clone());
                }
            }
        }
    }
    Value::Array(entries)
}

/// Replace the whole set with the delta's tokens.
fn set_override(delta: &Value) -> Value {
    let tokens: Vec<Value> = match delta {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let mut entries: Vec<Value> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !entries.contains(&token) {
            entries.push(token);
        }
    }
    Value::Array(entries)
}

fn formula_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
