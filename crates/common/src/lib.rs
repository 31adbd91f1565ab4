//! Shared types used across the retail storage crates.

mod types;

pub use types::EntityId;
