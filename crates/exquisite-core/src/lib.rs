//! Exquisite Core Library
//!
//! Error taxonomy, the storage port shared by both backends, list query
//! semantics and the random data generator.

// Re-export pure types from exquisite-types
pub use exquisite_types::*;

pub mod error;
pub mod generator;
pub mod ports;
pub mod query;

pub use error::{Result, StoreError};
pub use ports::EntityStore;
pub use query::{LikePattern, ListQuery};
