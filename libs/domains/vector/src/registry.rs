use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{CollectionSpec, CollectionUpdate};
use crate::store::VectorStore;

/// Collection schema management
///
/// Engine rejections propagate to the caller as typed errors; nothing is
/// logged-and-swallowed.
pub struct CollectionRegistry<S: VectorStore> {
    store: Arc<S>,
}

impl<S: VectorStore> CollectionRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a collection; fails with `Schema` if the engine rejects the
    /// definition (name collision, invalid property type, ...)
    pub async fn create(&self, spec: CollectionSpec) -> GatewayResult<()> {
        if spec.name.is_empty() {
            return Err(GatewayError::Validation(
                "Collection name must not be empty".to_string(),
            ));
        }

        self.store.create_collection(spec.clone()).await?;
        tracing::info!(collection = %spec.name, "Created collection");
        Ok(())
    }

    /// Apply a restricted reconfiguration; fails with `Schema` if the target
    /// field is immutable
    pub async fn update(&self, name: &str, update: CollectionUpdate) -> GatewayResult<()> {
        if update.is_empty() {
            return Err(GatewayError::Validation(
                "Collection update must change at least one field".to_string(),
            ));
        }

        self.store.update_collection(name, update).await?;
        tracing::info!(collection = %name, "Updated collection configuration");
        Ok(())
    }

    pub async fn get(&self, name: &str) -> GatewayResult<CollectionSpec> {
        self.store.get_collection(name).await
    }

    pub async fn list(&self) -> GatewayResult<Vec<CollectionSpec>> {
        self.store.list_collections().await
    }

    /// Remove a collection; fails with `NotFound` if the name does not exist
    pub async fn delete(&self, name: &str) -> GatewayResult<()> {
        // Resolve first so a missing name fails the same way `get` does,
        // independent of how lenient the engine's delete is
        self.store.get_collection(name).await?;
        self.store.delete_collection(name).await?;
        tracing::info!(collection = %name, "Deleted collection");
        Ok(())
    }
}
