//! Startup data seeding
//!
//! Runs once in the background, fills the active store with random
//! entities, then exits.

use crate::config::InitialData;
use crate::services::EntityService;
use exquisite_core::generator::generate_entities;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Start the seeding task. Await the handle to know when it has finished.
pub fn spawn_seeding(service: Arc<EntityService>, initial: Option<InitialData>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(initial) = initial else {
            info!("No initial data will be generated");
            return;
        };

        info!(
            "Seeding {} entities of size {} into {} store",
            initial.count,
            initial.size,
            service.backend()
        );

        // Generation is CPU bound; keep it off the async workers
        let generated =
            tokio::task::spawn_blocking(move || generate_entities(initial.count, initial.size))
                .await;
        let entities = match generated {
            Ok(entities) => entities,
            Err(e) => {
                error!("Initial data generation failed: {}", e);
                return;
            }
        };

        match service.bulk_insert(entities).await {
            Ok(inserted) => info!("Seeded {} entities", inserted),
            Err(e) => error!("Can't fill store with initial data: {}", e),
        }
    })
}
