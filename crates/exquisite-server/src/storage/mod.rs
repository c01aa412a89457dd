//! Storage layer
//!
//! PostgreSQL when a database is configured, an in-process map otherwise.
//! Both implement `EntityStore`.

pub mod db;
pub mod memory;

pub use db::PgStore;
pub use memory::MemoryStore;
