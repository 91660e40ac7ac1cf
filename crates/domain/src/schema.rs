//! Document schemas and field type resolution
//!
//! A [`DocumentSchema`] mirrors the host's field declarations closely enough to
//! answer one question: what kind of value lives at a dotted key path? The answer
//! is an explicit [`FieldType`] tag, produced once per change and dispatched on
//! by the caster and the mode applicator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Namespace prefix under which the system-specific sub-schema lives.
pub const SYSTEM_PREFIX: &str = "system.";

// =============================================================================
// Field declarations
// =============================================================================

/// Declaration of a single field, as exposed by the host's data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum FieldDescriptor {
    /// Nested group of named fields
    Schema(SchemaField),
    /// Dice/arithmetic expression kept in symbolic form
    Formula {
        #[serde(default)]
        deterministic: bool,
    },
    /// Ordered list of elements
    Array { element: Box<FieldDescriptor> },
    /// Unordered collection without duplicates
    Set { element: Box<FieldDescriptor> },
    /// Free-form JSON object
    Object,
    Boolean,
    Number {
        #[serde(default)]
        integer: bool,
    },
    String,
}

impl FieldDescriptor {
    pub fn formula() -> Self {
        Self::Formula {
            deterministic: false,
        }
    }

    pub fn deterministic_formula() -> Self {
        Self::Formula {
            deterministic: true,
        }
    }

    pub fn number() -> Self {
        Self::Number { integer: false }
    }

    pub fn integer() -> Self {
        Self::Number { integer: true }
    }

    pub fn array(element: FieldDescriptor) -> Self {
        Self::Array {
            element: Box::new(element),
        }
    }

    pub fn set(element: FieldDescriptor) -> Self {
        Self::Set {
            element: Box::new(element),
        }
    }

    pub fn schema(fields: SchemaField) -> Self {
        Self::Schema(fields)
    }
}

/// Group of named fields. Paths into it are dotted (`attributes.ac.bonus`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDescriptor>,
}

impl SchemaField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field declaration.
    pub fn with(mut self, name: impl Into<String>, field: FieldDescriptor) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Walk the dotted path through nested schemas.
    pub fn get_field(&self, path: &str) -> Option<&FieldDescriptor> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut field = self.fields.get(first)?;
        for segment in segments {
            match field {
                FieldDescriptor::Schema(inner) => field = inner.fields.get(segment)?,
                _ => return None,
            }
        }
        Some(field)
    }
}

/// Complete schema of a document: its base fields plus the namespaced
/// system sub-schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSchema {
    #[serde(default)]
    pub base: SchemaField,
    #[serde(default)]
    pub system: Option<SchemaField>,
    /// Keys of derived properties that have no declared field but hold formulas.
    #[serde(default)]
    pub formula_keys: BTreeSet<String>,
}

impl DocumentSchema {
    pub fn new(base: SchemaField) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    pub fn with_system(mut self, system: SchemaField) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_formula_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formula_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Look up a field by its full key, delegating `system.` paths to the sub-schema.
    pub fn get_field(&self, key: &str) -> Option<&FieldDescriptor> {
        match key.strip_prefix(SYSTEM_PREFIX) {
            Some(rest) => self.system.as_ref()?.get_field(rest),
            None => self.base.get_field(key),
        }
    }

    /// Resolve the type tag for a key. Missing fields resolve to [`FieldType::Untyped`].
    pub fn resolve_type(&self, key: &str) -> FieldType {
        if self.formula_keys.contains(key) {
            return FieldType::Formula;
        }
        self.get_field(key)
            .map(FieldType::from_descriptor)
            .unwrap_or(FieldType::Untyped)
    }
}

// =============================================================================
// Type tags
// =============================================================================

/// Semantic type of a change target, derived structurally from the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Formula,
    Array(Box<FieldType>),
    Set(Box<FieldType>),
    Object,
    Boolean,
    Number,
    String,
    /// No field the core understands; the host's generic handler takes over.
    Untyped,
}

impl FieldType {
    pub fn from_descriptor(field: &FieldDescriptor) -> Self {
        match field {
            FieldDescriptor::Formula { .. } => Self::Formula,
            FieldDescriptor::Array { element } => Self::Array(Box::new(Self::from_descriptor(element))),
            FieldDescriptor::Set { element } => Self::Set(Box::new(Self::from_descriptor(element))),
            FieldDescriptor::Object => Self::Object,
            FieldDescriptor::Boolean => Self::Boolean,
            FieldDescriptor::Number { .. } => Self::Number,
            FieldDescriptor::String => Self::String,
            FieldDescriptor::Schema(_) => Self::Untyped,
        }
    }

    /// Element type of an array or set field.
    pub fn element_type(&self) -> Option<&FieldType> {
        match self {
            Self::Array(element) | Self::Set(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor_schema() -> DocumentSchema {
        let system = SchemaField::new()
            .with(
                "attributes",
                FieldDescriptor::schema(
                    SchemaField::new()
                        .with("exhaustion", FieldDescriptor::integer())
                        .with(
                            "hp",
                            FieldDescriptor::schema(
                                SchemaField::new()
                                    .with("bonuses", FieldDescriptor::Object)
                                    .with("tempmax", FieldDescriptor::number()),
                            ),
                        ),
                ),
            )
            .with(
                "traits",
                FieldDescriptor::schema(
                    SchemaField::new()
                        .with("di", FieldDescriptor::set(FieldDescriptor::String))
                        .with("size", FieldDescriptor::String),
                ),
            )
            .with("bonuses", FieldDescriptor::array(FieldDescriptor::formula()))
            .with("inspiration", FieldDescriptor::Boolean);
        DocumentSchema::new(SchemaField::new().with("name", FieldDescriptor::String))
            .with_system(system)
            .with_formula_keys(["system.attributes.ac.bonus"])
    }

    #[test]
    fn resolves_system_paths_through_sub_schema() {
        let schema = actor_schema();
        assert_eq!(schema.resolve_type("system.attributes.exhaustion"), FieldType::Number);
        assert_eq!(schema.resolve_type("system.inspiration"), FieldType::Boolean);
        assert_eq!(schema.resolve_type("system.traits.size"), FieldType::String);
        assert_eq!(schema.resolve_type("system.attributes.hp.bonuses"), FieldType::Object);
    }

    #[test]
    fn resolves_base_paths() {
        assert_eq!(actor_schema().resolve_type("name"), FieldType::String);
    }

    #[test]
    fn collection_types_expose_element_type() {
        let schema = actor_schema();
        let di = schema.resolve_type("system.traits.di");
        assert!(di.is_set());
        assert_eq!(di.element_type(), Some(&FieldType::String));

        let bonuses = schema.resolve_type("system.bonuses");
        assert_eq!(bonuses, FieldType::Array(Box::new(FieldType::Formula)));
    }

    #[test]
    fn missing_fields_are_untyped() {
        let schema = actor_schema();
        assert_eq!(schema.resolve_type("system.nope"), FieldType::Untyped);
        assert_eq!(schema.resolve_type("system.attributes.exhaustion.deeper"), FieldType::Untyped);
        assert_eq!(schema.resolve_type("flags.dnd5e.whatever"), FieldType::Untyped);
        assert_eq!(schema.resolve_type("system.attributes"), FieldType::Untyped);
    }

    #[test]
    fn extra_formula_keys_resolve_without_a_field() {
        assert_eq!(actor_schema().resolve_type("system.attributes.ac.bonus"), FieldType::Formula);
    }

    #[test]
    fn system_keys_without_sub_schema_are_untyped() {
        let schema = DocumentSchema::new(SchemaField::new());
        assert_eq!(schema.resolve_type("system.anything"), FieldType::Untyped);
    }

    #[test]
    fn schema_deserializes_from_tagged_json() {
        let json = r#"{
            "system": {
                "fields": {
                    "target": {
                        "type": "schema",
                        "fields": {
                            "count": { "type": "formula", "deterministic": true },
                            "units": { "type": "string" }
                        }
                    }
                }
            }
        }"#;
        let schema: DocumentSchema = serde_json::from_str(json).expect("valid schema json");
        assert_eq!(schema.resolve_type("system.target.count"), FieldType::Formula);
        assert_eq!(schema.resolve_type("system.target.units"), FieldType::String);
    }
}
