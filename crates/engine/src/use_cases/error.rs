//! Errors raised by effect lifecycle use cases.

use spellbind_domain::{DocumentUuid, DomainError};

use crate::infrastructure::ports::StoreError;

/// Why a lifecycle operation did not happen.
///
/// None of these are fatal: each one means a single creation or deletion was
/// skipped and the owner left as it was.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Enchantments cannot be added directly to actors")]
    EnchantmentOnActor,

    #[error("Enchantment cannot be applied: {}", .0.join("; "))]
    EnchantmentRejected(Vec<String>),

    #[error("Deletion of {owner} vetoed: {} live dependents", .dependents.len())]
    DeletionVetoed {
        owner: DocumentUuid,
        dependents: Vec<DocumentUuid>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl LifecycleError {
    pub fn not_found(document_name: &'static str, uuid: &DocumentUuid) -> Self {
        Self::Store(StoreError::not_found(document_name, uuid))
    }

    pub fn is_veto(&self) -> bool {
        matches!(self, Self::DeletionVetoed { .. })
    }
}
