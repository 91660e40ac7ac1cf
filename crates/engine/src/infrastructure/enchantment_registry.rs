//! Registry of applied enchantments per origin.

use std::collections::BTreeSet;

use dashmap::DashMap;
use spellbind_domain::DocumentUuid;

/// Tracks which enchantments each origin item has applied, so the origin can
/// count or revoke them.
#[derive(Debug, Default)]
pub struct EnchantmentRegistry {
    applied: DashMap<DocumentUuid, BTreeSet<DocumentUuid>>,
}

impl EnchantmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, origin: &DocumentUuid, enchantment: &DocumentUuid) {
        self.applied
            .entry(origin.clone())
            .or_default()
            .insert(enchantment.clone());
    }

    pub fn untrack(&self, origin: &DocumentUuid, enchantment: &DocumentUuid) {
        let now_empty = match self.applied.get_mut(origin) {
            Some(mut entry) => {
                entry.remove(enchantment);
                entry.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.applied.remove_if(origin, |_, set| set.is_empty());
        }
    }

    /// Enchantments applied by `origin`, in uuid order.
    pub fn applied(&self, origin: &DocumentUuid) -> Vec<DocumentUuid> {
        self.applied
            .get(origin)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default()
    }
}
