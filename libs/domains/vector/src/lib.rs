//! Vector Store Gateway
//!
//! Domain library for talking to a remote vector-search engine: connection
//! lifecycle, collection schema management, content-addressed data insertion,
//! and keyword/semantic/multi-modal retrieval.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────┐ ┌─────────────┐ ┌─────────────────┐
//! │ CollectionRegistry │ │ DataGateway │ │ RetrievalEngine │
//! └─────────┬──────────┘ └──────┬──────┘ └────────┬────────┘
//!           │                   │                 │
//!           └────────────┬──────┴─────────────────┘
//!                        │
//!               ┌────────▼────────┐
//!               │   VectorStore   │  ← engine seam (trait)
//!               └────────┬────────┘
//!                        │
//!               ┌────────▼────────┐     ┌───────────────────┐
//!               │  WeaviateStore  │────▶│ ConnectionManager │
//!               └─────────────────┘     └───────────────────┘
//! ```
//!
//! Every operation acquires a fresh engine session, runs, and releases it;
//! no session outlives the call that created it and no component carries
//! cross-call state. All four failure kinds (`Connection`, `Schema`,
//! `NotFound`, `Validation`) propagate to the caller as typed errors.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use vector_gateway::{
//!     CollectionRegistry, CollectionSpec, DataGateway, EngineConfig, PropertySpec,
//!     RetrievalEngine, SemanticQuery, WeaviateStore,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(WeaviateStore::new(EngineConfig::from_env()?));
//!
//! let registry = CollectionRegistry::new(Arc::clone(&store));
//! registry
//!     .create(CollectionSpec::new(
//!         "Cards",
//!         vec![PropertySpec::text("title").vectorize_name(), PropertySpec::text("issuer")],
//!     ))
//!     .await?;
//!
//! let data = DataGateway::new(Arc::clone(&store));
//! let mut properties = serde_json::Map::new();
//! properties.insert("title".to_string(), json!("Shopping Plus"));
//! properties.insert("issuer".to_string(), json!("Alpha Bank"));
//! let id = data.insert("Cards", properties, None, None).await?;
//!
//! let retrieval = RetrievalEngine::new(store);
//! let hits = retrieval
//!     .search_semantic("Cards", SemanticQuery::Text("discount shopping".into()), 5)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod data;
pub mod error;
pub mod models;
pub mod recommend;
pub mod registry;
pub mod retrieval;
pub mod store;
pub mod weaviate;

// Re-export commonly used types
pub use config::{EngineConfig, PhaseTimeouts, RetryPolicy};
pub use connection::{ConnectionManager, EngineSession};
pub use data::DataGateway;
pub use error::{GatewayError, GatewayResult};
pub use models::{
    CollectionSpec, CollectionUpdate, DataObject, DataType, DistanceMetric, FilterStrategy,
    PropertySpec, Quantization, QueryFilter, RetrievalTarget, SearchResult, Tokenization,
    VectorIndexConfig, content_id,
};
pub use recommend::{CardQuery, CardRecommendations, Recommendation, RecommendationService};
pub use registry::CollectionRegistry;
pub use retrieval::{
    DEFAULT_MULTI_MODAL_LIMIT, MultiModalConfig, MultiModalQuery, RetrievalEngine, SemanticQuery,
};
pub use store::{VectorStore, properties_from};
pub use weaviate::WeaviateStore;
