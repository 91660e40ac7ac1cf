//! Effect entities, the documents hosting them, and status conditions

mod active_effect;
mod documents;
pub mod status;

pub use active_effect::{
    migrate_effect_source, overridden_choices, ActiveEffect, DependentRef, EffectDuration,
    EffectKind, EnchantmentRiders,
};
pub use documents::{
    ActorDocument, EnchantmentRestrictions, ItemDocument, ItemDuration, StatusLevelChange,
    StoredDocument,
};
pub use status::{StagedStatus, StagedStatusConfig, StatusEffectTemplate};
