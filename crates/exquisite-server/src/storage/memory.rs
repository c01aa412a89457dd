//! In-memory entity store, used when no database is configured
//!
//! Nothing survives a restart. The map is only reachable through
//! `MemoryStore`, which owns its lock.

use async_trait::async_trait;
use exquisite_core::{BackendKind, Entity, EntityStore, ListQuery, Result, StoreError};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

/// Fallback store keyed by entity id.
///
/// Reads share the lock; every mutation holds it exclusively.
pub struct MemoryStore {
    entities: RwLock<BTreeMap<String, Entity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(BTreeMap::new()),
        }
    }

    /// Drop every entity
    pub async fn clear(&self) {
        self.entities.write().await.clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    async fn get(&self, id: &str) -> Result<Entity> {
        self.entities
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Entity>> {
        let entities = self.entities.read().await;
        Ok(entities
            .values()
            .filter(|e| query.pattern.matches(&e.data))
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn insert(&self, entity: &Entity) -> Result<()> {
        let mut entities = self.entities.write().await;
        if entities.contains_key(&entity.id) {
            return Err(StoreError::duplicate(&entity.id));
        }
        entities.insert(entity.id.clone(), entity.clone());
        debug!("Stored entity {} in memory", entity.id);
        Ok(())
    }

    async fn update(&self, id: &str, data: &str) -> Result<Entity> {
        let mut entities = self.entities.write().await;
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id))?;
        entity.data = data.to_string();
        Ok(entity.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entities
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(id))
    }

    async fn insert_batch(&self, batch: &[Entity]) -> Result<()> {
        let mut entities = self.entities.write().await;

        // Validate the whole batch before touching the map
        let mut seen = HashSet::with_capacity(batch.len());
        for entity in batch {
            if entities.contains_key(&entity.id) || !seen.insert(entity.id.as_str()) {
                return Err(StoreError::duplicate(&entity.id));
            }
        }

        for entity in batch {
            entities.insert(entity.id.clone(), entity.clone());
        }
        debug!("Stored batch of {} entities in memory", batch.len());
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entities.read().await.len())
    }
}
