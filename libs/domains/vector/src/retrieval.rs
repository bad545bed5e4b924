use std::sync::Arc;

use crate::error::{GatewayError, GatewayResult};
use crate::models::{RetrievalTarget, SearchResult};
use crate::store::VectorStore;

/// Result count for multi-modal retrieval when the caller does not override it
pub const DEFAULT_MULTI_MODAL_LIMIT: usize = 2;

/// Seed for a semantic search: either raw text (vectorized engine-side by the
/// collection's configured vectorizer) or a ready-made vector
///
/// The enum encodes the exactly-one-of rule; there is no way to supply both.
#[derive(Debug, Clone)]
pub enum SemanticQuery {
    Text(String),
    Vector(Vec<f32>),
}

/// Multi-modal retrieval seed: one embedding per modality, or both
#[derive(Debug, Clone)]
pub enum MultiModalQuery {
    Text(Vec<f32>),
    Image(Vec<f32>),
    Both { text: Vec<f32>, image: Vec<f32> },
}

/// Which collections multi-modal retrieval runs against, and how many hits
/// it returns, supplied by the caller instead of hard-wired
#[derive(Debug, Clone)]
pub struct MultiModalConfig {
    pub text_collection: String,
    pub image_collection: String,
    pub limit: usize,
}

impl Default for MultiModalConfig {
    fn default() -> Self {
        Self {
            text_collection: "TextEntries".to_string(),
            image_collection: "ImageEntries".to_string(),
            limit: DEFAULT_MULTI_MODAL_LIMIT,
        }
    }
}

impl MultiModalConfig {
    pub fn collection_for(&self, target: RetrievalTarget) -> &str {
        match target {
            RetrievalTarget::Text => &self.text_collection,
            RetrievalTarget::Image => &self.image_collection,
        }
    }
}

/// The four retrieval modes: keyword, semantic by text, semantic by vector,
/// and multi-modal dispatch
pub struct RetrievalEngine<S: VectorStore> {
    store: Arc<S>,
}

impl<S: VectorStore> RetrievalEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// BM25 keyword search restricted to `fields` if given, otherwise all
    /// text properties; results ordered by descending relevance score
    pub async fn search_keyword(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
        fields: Option<Vec<String>>,
    ) -> GatewayResult<Vec<SearchResult>> {
        if text.trim().is_empty() {
            return Err(GatewayError::Validation(
                "Keyword query must not be empty".to_string(),
            ));
        }

        self.store.query_bm25(collection, text, fields, limit).await
    }

    /// Nearest-neighbor search, ordered by ascending distance under the
    /// collection's configured metric
    pub async fn search_semantic(
        &self,
        collection: &str,
        query: SemanticQuery,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        match query {
            SemanticQuery::Text(text) => {
                if text.trim().is_empty() {
                    return Err(GatewayError::Validation(
                        "Semantic query text must not be empty".to_string(),
                    ));
                }
                self.store.query_near_text(collection, &text, limit).await
            }
            SemanticQuery::Vector(vector) => {
                if vector.is_empty() {
                    return Err(GatewayError::Validation(
                        "Semantic query vector must not be empty".to_string(),
                    ));
                }
                self.store.query_near_vector(collection, vector, limit).await
            }
        }
    }

    /// Nearest-vector retrieval against the target modality's collection
    ///
    /// A `Both` query fuses the two embeddings by element-wise averaging:
    /// the upstream encoders project both modalities into one joint space,
    /// so the mean is a single-vector compromise between them and the
    /// ranking stays a plain distance ranking. Mismatched dimensionality is
    /// rejected.
    pub async fn retrieve_multi_modal(
        &self,
        query: MultiModalQuery,
        target: RetrievalTarget,
        config: &MultiModalConfig,
    ) -> GatewayResult<Vec<SearchResult>> {
        let vector = match query {
            MultiModalQuery::Text(embedding) | MultiModalQuery::Image(embedding) => embedding,
            MultiModalQuery::Both { text, image } => fuse_embeddings(text, image)?,
        };

        if vector.is_empty() {
            return Err(GatewayError::Validation(
                "Multi-modal embedding must not be empty".to_string(),
            ));
        }

        self.store
            .query_near_vector(config.collection_for(target), vector, config.limit)
            .await
    }
}

fn fuse_embeddings(text: Vec<f32>, image: Vec<f32>) -> GatewayResult<Vec<f32>> {
    if text.len() != image.len() {
        return Err(GatewayError::Validation(format!(
            "Cannot fuse embeddings of different dimensions ({} vs {})",
            text.len(),
            image.len()
        )));
    }

    Ok(text
        .into_iter()
        .zip(image)
        .map(|(t, i)| (t + i) / 2.0)
        .collect())
}
