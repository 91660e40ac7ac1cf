//! Use cases - effect lifecycle orchestration.
//!
//! Each module drives one rules concern across the document store and the
//! pure domain core.

pub mod dependents;
pub mod derived;
pub mod error;
pub mod lifecycle;
pub mod riders;
pub mod status_level;

pub use dependents::{DependencyTracker, DELETION_VETO_WARNING};
pub use derived::{DerivedData, DerivedDataPass};
pub use error::LifecycleError;
pub use lifecycle::{CreateOptions, EffectLifecycle};
pub use riders::RiderCreator;
pub use status_level::AdvanceStatusLevel;
