//! Spellbind domain: the pure rules core.
//!
//! Resolves change targets against document schemas, casts raw values,
//! composes formulas and applies change records, plus the effect entities and
//! status rules the lifecycle layer builds on. Nothing here performs I/O.

pub mod changes;
pub mod config;
pub mod effects;
pub mod error;
pub mod ids;
pub mod schema;

pub use changes::{
    compose_formula, get_at_path, set_at_path, ChangeApplicator, ChangeHandler, ChangeMode,
    ChangeSet, EffectChange, FormulaComposition, GenericChangeHandler,
};
pub use config::{CharacterFlag, FlagType, RulesConfig, FLAG_NAMESPACE};
pub use effects::{
    migrate_effect_source, overridden_choices, ActiveEffect, ActorDocument, DependentRef,
    EffectDuration, EffectKind, EnchantmentRestrictions, EnchantmentRiders, ItemDocument,
    ItemDuration, StagedStatus, StagedStatusConfig, StatusEffectTemplate, StatusLevelChange,
    StoredDocument,
};
pub use error::{CastError, DomainError};
pub use ids::{static_id, DocumentId, DocumentUuid};
pub use schema::{DocumentSchema, FieldDescriptor, FieldType, SchemaField};
