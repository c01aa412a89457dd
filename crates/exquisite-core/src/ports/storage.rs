//! Storage trait for entity persistence
//!
//! Implemented by the relational store and by the in-memory fallback. Both
//! implementations follow the same contract so the service can hold either
//! one without knowing which.

use crate::query::ListQuery;
use crate::Result;
use async_trait::async_trait;
use exquisite_types::{BackendKind, Entity};

/// Entity store
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Exact lookup. `StoreError::NotFound` if absent.
    async fn get(&self, id: &str) -> Result<Entity>;

    /// Entities whose data matches the query pattern, after `offset`, at most `limit`.
    async fn list(&self, query: &ListQuery) -> Result<Vec<Entity>>;

    /// Persist a new entity. Fails with `StoreError::Persistence` if the id exists.
    async fn insert(&self, entity: &Entity) -> Result<()>;

    /// Replace the data of an existing entity. Never inserts.
    async fn update(&self, id: &str, data: &str) -> Result<Entity>;

    /// Remove an entity. `StoreError::NotFound` if absent.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Insert every entity or none of them.
    async fn insert_batch(&self, entities: &[Entity]) -> Result<()>;

    /// Number of stored entities
    async fn count(&self) -> Result<usize>;
}
