//! Infrastructure: ports and the adapters that implement them.

pub mod enchantment_registry;
pub mod memory_store;
pub mod ports;
pub mod session;
