use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{DataObject, content_id};
use crate::store::VectorStore;

/// Object-level access to a collection: content-addressed insertion,
/// existence probes, and bounded enumeration
pub struct DataGateway<S: VectorStore> {
    store: Arc<S>,
}

impl<S: VectorStore> DataGateway<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Insert an object, returning the identifier used
    ///
    /// When `id` is omitted the identifier is the deterministic content hash
    /// of `properties`, so re-inserting unchanged content overwrites instead
    /// of duplicating. Supplied vectors are validated against the
    /// collection's declared dimensionality when one is configured.
    pub async fn insert(
        &self,
        collection: &str,
        properties: Map<String, Value>,
        vectors: Option<HashMap<String, Vec<f32>>>,
        id: Option<Uuid>,
    ) -> GatewayResult<Uuid> {
        let vectors = vectors.unwrap_or_default();

        if !vectors.is_empty() {
            let spec = self.store.get_collection(collection).await?;
            if let Some(dimension) = spec.vector_index.dimension {
                for (name, values) in &vectors {
                    if values.len() as u32 != dimension {
                        return Err(GatewayError::Validation(format!(
                            "Vector '{}' has {} dimensions, collection '{}' expects {}",
                            name,
                            values.len(),
                            collection,
                            dimension
                        )));
                    }
                }
            }
        }

        let id = id.unwrap_or_else(|| content_id(&properties));
        let object = DataObject {
            id,
            properties,
            vectors,
        };

        let stored = self.store.insert_object(collection, object).await?;
        tracing::info!(collection = %collection, id = %stored, "Inserted object");
        Ok(stored)
    }

    /// Reports whether an object with the content hash of `properties` is
    /// present; a pure existence probe, not a content-equality scan
    pub async fn exists(
        &self,
        collection: &str,
        properties: &Map<String, Value>,
    ) -> GatewayResult<bool> {
        self.store
            .object_exists(collection, content_id(properties))
            .await
    }

    /// Fetch one object; fails with `NotFound` if absent
    pub async fn read_by_id(
        &self,
        collection: &str,
        id: Uuid,
        include_vector: bool,
    ) -> GatewayResult<DataObject> {
        self.store.get_object(collection, id, include_vector).await
    }

    /// Enumerate up to `limit` objects in engine iteration order
    ///
    /// Every call starts fresh; no cursor survives between calls, so two
    /// back-to-back calls without intervening writes see the same prefix.
    pub async fn read_all(
        &self,
        collection: &str,
        limit: usize,
    ) -> GatewayResult<Vec<DataObject>> {
        self.store.list_objects(collection, limit).await
    }
}
