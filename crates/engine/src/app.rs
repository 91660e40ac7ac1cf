//! Application state and composition.

use std::sync::Arc;

use spellbind_domain::{ChangeHandler, GenericChangeHandler, RulesConfig};

use crate::infrastructure::{
    enchantment_registry::EnchantmentRegistry,
    ports::{AuthorityPort, DocumentStore, NotificationPort},
};
use crate::use_cases;

/// Main application state.
///
/// Holds the ports and every use case wired against them.
pub struct App {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<RulesConfig>,
    pub registry: Arc<EnchantmentRegistry>,
    pub use_cases: UseCases,
}

/// Container for all use cases.
pub struct UseCases {
    pub dependents: Arc<use_cases::DependencyTracker>,
    pub riders: Arc<use_cases::RiderCreator>,
    pub lifecycle: Arc<use_cases::EffectLifecycle>,
    pub derived: Arc<use_cases::DerivedDataPass>,
    pub status_level: Arc<use_cases::AdvanceStatusLevel>,
}

impl App {
    /// Create a new App with the generic change handler.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        authority: Arc<dyn AuthorityPort>,
        notifier: Arc<dyn NotificationPort>,
        config: RulesConfig,
    ) -> Self {
        Self::with_handler(store, authority, notifier, config, Arc::new(GenericChangeHandler))
    }

    /// Create a new App whose untyped and custom-mode changes go to `handler`.
    pub fn with_handler(
        store: Arc<dyn DocumentStore>,
        authority: Arc<dyn AuthorityPort>,
        notifier: Arc<dyn NotificationPort>,
        config: RulesConfig,
        handler: Arc<dyn ChangeHandler>,
    ) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(EnchantmentRegistry::new());

        let dependents = Arc::new(use_cases::DependencyTracker::new(
            store.clone(),
            authority,
            notifier.clone(),
            registry.clone(),
        ));
        let riders = Arc::new(use_cases::RiderCreator::new(
            store.clone(),
            notifier.clone(),
            dependents.clone(),
            config.clone(),
        ));
        let lifecycle = Arc::new(use_cases::EffectLifecycle::new(
            store.clone(),
            notifier,
            riders.clone(),
            dependents.clone(),
            registry.clone(),
            config.clone(),
        ));
        let derived = Arc::new(use_cases::DerivedDataPass::new(config.clone(), handler));
        let status_level = Arc::new(use_cases::AdvanceStatusLevel::new(
            store.clone(),
            config.clone(),
        ));

        Self {
            store,
            config,
            registry,
            use_cases: UseCases {
                dependents,
                riders,
                lifecycle,
                derived,
                status_level,
            },
        }
    }
}
