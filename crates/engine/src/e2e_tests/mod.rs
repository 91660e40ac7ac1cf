//! Engine E2E tests.
//!
//! These tests drive a fully-wired [`App`](crate::App) over the in-memory
//! document store:
//! - Rider conditions and enchantment riders created through lifecycle hooks
//! - Dependency vetoes and cascading deletion
//! - The derived-data pass over scenario documents
//!
//! # Running E2E Tests
//!
//! ```bash
//! cargo test -p spellbind-engine --lib e2e_tests
//! ```

mod e2e_helpers;

pub use e2e_helpers::*;
