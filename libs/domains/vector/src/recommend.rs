use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GatewayResult;
use crate::models::QueryFilter;
use crate::retrieval::{RetrievalEngine, SemanticQuery};
use crate::store::VectorStore;

/// Result count for recommendations when the caller does not override it
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;

/// Request contract of the card-recommendation boundary: a free-text query
/// plus optional categorical constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardQuery {
    pub query: String,
    #[serde(flatten)]
    pub filter: QueryFilter,
}

/// One recommended card: its stored properties plus the semantic distance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub properties: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

/// Response contract: ranked recommendations, the original query, and only
/// the categories that were actually applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRecommendations {
    pub recommendations: Vec<Recommendation>,
    pub query: String,
    pub filters: BTreeMap<String, String>,
}

/// Boundary consumer of the retrieval engine: one semantic search plus a
/// categorical post-filter pass
///
/// Gateway failures propagate as typed errors so the HTTP layer above can
/// map each kind to a distinct status.
pub struct RecommendationService<S: VectorStore> {
    retrieval: RetrievalEngine<S>,
    collection: String,
    limit: usize,
}

impl<S: VectorStore> RecommendationService<S> {
    pub fn new(store: Arc<S>, collection: impl Into<String>) -> Self {
        Self {
            retrieval: RetrievalEngine::new(store),
            collection: collection.into(),
            limit: DEFAULT_RECOMMENDATION_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub async fn recommend(&self, input: CardQuery) -> GatewayResult<CardRecommendations> {
        let results = self
            .retrieval
            .search_semantic(
                &self.collection,
                SemanticQuery::Text(input.query.clone()),
                self.limit,
            )
            .await?;

        let recommendations: Vec<Recommendation> = results
            .into_iter()
            .filter(|result| input.filter.matches(&result.properties))
            .map(|result| Recommendation {
                properties: result.properties,
                distance: result.distance,
            })
            .collect();

        tracing::info!(
            collection = %self.collection,
            returned = recommendations.len(),
            "Served card recommendations"
        );

        Ok(CardRecommendations {
            recommendations,
            query: input.query,
            filters: input
                .filter
                .applied()
                .into_iter()
                .map(|(field, value)| (field.to_string(), value.to_string()))
                .collect(),
        })
    }
}
