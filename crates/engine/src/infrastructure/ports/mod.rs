//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Document persistence (the host's create/delete/lookup layer)
//! - Session authority (who may override deletion vetoes)
//! - Notifications (user-visible warnings and errors)

mod error;
mod session;
mod store;

pub use error::StoreError;
pub use session::{AuthorityPort, NotificationPort};
pub use store::{CreateRequest, DocumentStore};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use session::{MockAuthorityPort, MockNotificationPort};
#[cfg(test)]
pub use store::MockDocumentStore;
