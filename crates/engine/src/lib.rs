//! Spellbind Engine library.
//!
//! Effect lifecycle orchestration on top of the pure rules core in
//! `spellbind-domain`.
//!
//! ## Structure
//!
//! - `use_cases/` - Rider creation, lifecycle hooks, dependency tracking, derived data
//! - `infrastructure/` - Port traits and the in-memory adapters
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// E2E tests driving the in-memory store through whole lifecycles.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
