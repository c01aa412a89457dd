//! Entity service
//!
//! Front door for every CRUD call. Holds exactly one store, picked when the
//! service is built, and applies the id, filter and batch policy on top of it.

use crate::storage::MemoryStore;
use exquisite_core::generator::generate_id;
use exquisite_core::{BackendKind, Entity, EntityStore, LikePattern, ListQuery, Result};
use std::sync::Arc;
use tracing::{debug, info};

/// Listing request as received from the caller.
///
/// `limit` is passed through untouched; clamping belongs to the caller.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: usize,
    pub filter: Option<String>,
    pub offset: usize,
}

/// Creation request. A missing or empty `id` gets a generated one.
#[derive(Debug, Clone, Default)]
pub struct NewEntity {
    pub id: Option<String>,
    pub data: String,
}

impl NewEntity {
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            id: None,
            data: data.into(),
        }
    }
}

pub struct EntityService {
    store: Arc<dyn EntityStore>,
}

impl EntityService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        info!("Entity service using {} backend", store.kind());
        Self { store }
    }

    /// Service over a fresh in-memory store
    pub fn fallback() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn backend(&self) -> BackendKind {
        self.store.kind()
    }

    pub async fn get(&self, id: &str) -> Result<Entity> {
        self.store.get(id).await
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Vec<Entity>> {
        let pattern = LikePattern::from_filter(options.filter.as_deref())?;
        let query = ListQuery::new(pattern, options.limit, options.offset);
        self.store.list(&query).await
    }

    pub async fn create(&self, new: NewEntity) -> Result<Entity> {
        let id = match new.id {
            Some(id) if !id.is_empty() => id,
            _ => generate_id(),
        };
        let entity = Entity::new(id, new.data);

        self.store.insert(&entity).await?;
        debug!("Created entity {}", entity.id);
        Ok(entity)
    }

    pub async fn update(&self, id: &str, data: &str) -> Result<Entity> {
        let entity = self.store.update(id, data).await?;
        debug!("Updated entity {}", id);
        Ok(entity)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        debug!("Deleted entity {}", id);
        Ok(())
    }

    /// Insert the whole batch or nothing. Returns how many were inserted.
    pub async fn bulk_insert(&self, entities: Vec<Entity>) -> Result<usize> {
        if entities.is_empty() {
            return Ok(0);
        }

        self.store.insert_batch(&entities).await?;
        info!("Inserted batch of {} entities", entities.len());
        Ok(entities.len())
    }

    pub async fn count(&self) -> Result<usize> {
        self.store.count().await
    }
}
