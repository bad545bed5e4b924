use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::GatewayResult;
use crate::models::{CollectionSpec, CollectionUpdate, DataObject, SearchResult};

/// The engine operation seam
///
/// Abstracts the remote vector-search engine so higher components can be
/// tested against a mock. Implementations open a fresh connection per call;
/// nothing here carries cross-call state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    // ===== Collection Management =====

    /// Create a collection; engine rejections surface as `Schema` errors
    async fn create_collection(&self, spec: CollectionSpec) -> GatewayResult<()>;

    /// Apply a restricted reconfiguration to an existing collection
    async fn update_collection(&self, name: &str, update: CollectionUpdate) -> GatewayResult<()>;

    /// Fetch a collection schema; `NotFound` if the name does not exist
    async fn get_collection(&self, name: &str) -> GatewayResult<CollectionSpec>;

    /// Enumerate all collection schemas
    async fn list_collections(&self) -> GatewayResult<Vec<CollectionSpec>>;

    /// Remove a collection and everything in it
    async fn delete_collection(&self, name: &str) -> GatewayResult<()>;

    // ===== Object Operations =====

    /// Insert or overwrite one object under its identifier
    async fn insert_object(&self, collection: &str, object: DataObject) -> GatewayResult<Uuid>;

    /// Fetch one object by identifier; `NotFound` if absent
    async fn get_object(
        &self,
        collection: &str,
        id: Uuid,
        include_vector: bool,
    ) -> GatewayResult<DataObject>;

    /// Existence probe by identifier
    async fn object_exists(&self, collection: &str, id: Uuid) -> GatewayResult<bool>;

    /// Enumerate up to `limit` objects in engine iteration order, starting
    /// fresh on every call
    async fn list_objects(&self, collection: &str, limit: usize)
    -> GatewayResult<Vec<DataObject>>;

    // ===== Queries =====

    /// BM25 keyword relevance query, descending score
    async fn query_bm25(
        &self,
        collection: &str,
        query: &str,
        fields: Option<Vec<String>>,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>>;

    /// Nearest-neighbor query seeded by text via the collection's vectorizer,
    /// ascending distance
    async fn query_near_text(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>>;

    /// Nearest-neighbor query seeded directly by a vector, ascending distance
    async fn query_near_vector(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>>;
}

/// Convenience constructor for property mappings in call sites and tests
pub fn properties_from(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}
