//! Type definitions for keyrack storage.

mod ids;
mod keys;
mod query;
mod tags;

// Re-export all types from submodules
pub use ids::*;
pub use keys::*;
pub use query::*;
pub use tags::*;
