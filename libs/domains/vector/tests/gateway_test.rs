//! Cross-module scenarios against an in-memory engine fake
//!
//! The fake keeps engine-side behavior deliberately simple but honest:
//! insert-or-overwrite by identifier, stable iteration order, term-overlap
//! keyword scoring, and cosine distances over stored vectors.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use test_utils::TestDataBuilder;
use test_utils::assertions::{assert_ascending, assert_descending, assert_some, assert_uuid_eq};
use uuid::Uuid;

use vector_gateway::{
    CollectionRegistry, CollectionSpec, CollectionUpdate, DataGateway, DataObject, GatewayError,
    GatewayResult, PropertySpec, RetrievalEngine, SearchResult, SemanticQuery, VectorStore,
    content_id, properties_from,
};

// ===== In-Memory Engine Fake =====

#[derive(Default)]
struct InMemoryStore {
    collections: Mutex<BTreeMap<String, CollectionSpec>>,
    objects: Mutex<BTreeMap<String, BTreeMap<Uuid, DataObject>>>,
}

/// Tiny fixed-vocabulary text embedding: one axis per known term
fn embed_text(text: &str) -> Vec<f32> {
    const VOCAB: [&str; 8] = [
        "shopping", "discount", "card", "travel", "gold", "free", "plus", "bank",
    ];

    let mut vector = vec![0.0f32; VOCAB.len()];
    for word in text.to_lowercase().split_whitespace() {
        if let Some(idx) = VOCAB.iter().position(|w| *w == word) {
            vector[idx] += 1.0;
        }
    }
    vector
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

impl InMemoryStore {
    fn nearest(
        &self,
        collection: &str,
        query: &[f32],
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        let objects = self.objects.lock().unwrap();
        let stored = objects
            .get(collection)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", collection)))?;

        let mut hits: Vec<SearchResult> = stored
            .values()
            .filter_map(|object| {
                // deterministic pick: lowest-named vector
                let vector = object
                    .vectors
                    .iter()
                    .min_by(|(a, _), (b, _)| a.cmp(b))
                    .map(|(_, values)| values)?;

                Some(SearchResult {
                    id: object.id,
                    properties: object.properties.clone(),
                    distance: Some(cosine_distance(query, vector)),
                    score: None,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
        hits.truncate(limit);
        Ok(hits)
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn create_collection(&self, spec: CollectionSpec) -> GatewayResult<()> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(&spec.name) {
            return Err(GatewayError::Schema(format!(
                "Collection {} already exists",
                spec.name
            )));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(spec.name.clone(), BTreeMap::new());
        collections.insert(spec.name.clone(), spec);
        Ok(())
    }

    async fn update_collection(&self, name: &str, update: CollectionUpdate) -> GatewayResult<()> {
        let mut collections = self.collections.lock().unwrap();
        let spec = collections
            .get_mut(name)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", name)))?;

        if let Some(module) = update.generative_module {
            spec.generative_module = Some(module);
        }
        Ok(())
    }

    async fn get_collection(&self, name: &str) -> GatewayResult<CollectionSpec> {
        self.collections
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", name)))
    }

    async fn list_collections(&self) -> GatewayResult<Vec<CollectionSpec>> {
        Ok(self.collections.lock().unwrap().values().cloned().collect())
    }

    async fn delete_collection(&self, name: &str) -> GatewayResult<()> {
        self.collections
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", name)))?;
        self.objects.lock().unwrap().remove(name);
        Ok(())
    }

    async fn insert_object(&self, collection: &str, object: DataObject) -> GatewayResult<Uuid> {
        let mut objects = self.objects.lock().unwrap();
        let stored = objects
            .get_mut(collection)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", collection)))?;

        let id = object.id;
        stored.insert(id, object);
        Ok(id)
    }

    async fn get_object(
        &self,
        collection: &str,
        id: Uuid,
        include_vector: bool,
    ) -> GatewayResult<DataObject> {
        let objects = self.objects.lock().unwrap();
        let mut object = objects
            .get(collection)
            .and_then(|stored| stored.get(&id))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("Object {}", id)))?;

        if !include_vector {
            object.vectors.clear();
        }
        Ok(object)
    }

    async fn object_exists(&self, collection: &str, id: Uuid) -> GatewayResult<bool> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(collection)
            .is_some_and(|stored| stored.contains_key(&id)))
    }

    async fn list_objects(
        &self,
        collection: &str,
        limit: usize,
    ) -> GatewayResult<Vec<DataObject>> {
        let objects = self.objects.lock().unwrap();
        let stored = objects
            .get(collection)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", collection)))?;

        Ok(stored.values().take(limit).cloned().collect())
    }

    async fn query_bm25(
        &self,
        collection: &str,
        query: &str,
        fields: Option<Vec<String>>,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        let objects = self.objects.lock().unwrap();
        let stored = objects
            .get(collection)
            .ok_or_else(|| GatewayError::NotFound(format!("Collection {}", collection)))?;

        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut hits: Vec<SearchResult> = stored
            .values()
            .filter_map(|object| {
                let haystack: String = object
                    .properties
                    .iter()
                    .filter(|(name, _)| {
                        fields
                            .as_ref()
                            .is_none_or(|fields| fields.contains(name))
                    })
                    .filter_map(|(_, value)| value.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();

                let score: f32 = terms
                    .iter()
                    .map(|term| haystack.matches(term.as_str()).count() as f32)
                    .sum();

                (score > 0.0).then(|| SearchResult {
                    id: object.id,
                    properties: object.properties.clone(),
                    distance: None,
                    score: Some(score),
                })
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(limit);
        Ok(hits)
    }

    async fn query_near_text(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        self.nearest(collection, &embed_text(text), limit)
    }

    async fn query_near_vector(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        self.nearest(collection, &vector, limit)
    }
}

// ===== Fixtures =====

fn cards_spec_named(name: &str) -> CollectionSpec {
    CollectionSpec::new(
        name,
        vec![
            PropertySpec::text("title").vectorize_name(),
            PropertySpec::text("issuer"),
            PropertySpec::text("annualFee"),
        ],
    )
}

fn cards_spec() -> CollectionSpec {
    cards_spec_named("Cards")
}

fn card(title: &str, issuer: &str, fee: &str) -> Map<String, Value> {
    properties_from(&[
        ("title", json!(title)),
        ("issuer", json!(issuer)),
        ("annualFee", json!(fee)),
    ])
}

fn title_vector(properties: &Map<String, Value>) -> HashMap<String, Vec<f32>> {
    let title = properties["title"].as_str().unwrap();
    HashMap::from([("title".to_string(), embed_text(title))])
}

async fn store_with_cards() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::default());
    CollectionRegistry::new(Arc::clone(&store))
        .create(cards_spec())
        .await
        .unwrap();
    store
}

// ===== Scenarios =====

#[tokio::test]
async fn test_idempotent_insert_does_not_duplicate() {
    let store = store_with_cards().await;
    let gateway = DataGateway::new(Arc::clone(&store));
    let properties = card("Shopping Plus", "Alpha Bank", "free");

    let first = gateway
        .insert("Cards", properties.clone(), None, None)
        .await
        .unwrap();
    let second = gateway
        .insert("Cards", properties.clone(), None, None)
        .await
        .unwrap();

    assert_uuid_eq(second, first, "re-insert of unchanged content");

    let all = gateway.read_all("Cards", 10).await.unwrap();
    assert_eq!(all.len(), 1, "no duplicate objects after re-insert");
    assert_eq!(all[0].properties, properties);
}

#[tokio::test]
async fn test_round_trip_preserves_properties_and_vector() {
    let builder = TestDataBuilder::from_test_name("round_trip");
    let collection = builder.name("cards", "round-trip");

    let store = Arc::new(InMemoryStore::default());
    CollectionRegistry::new(Arc::clone(&store))
        .create(cards_spec_named(&collection))
        .await
        .unwrap();

    let gateway = DataGateway::new(Arc::clone(&store));
    let properties = builder.properties(&[
        ("title", "Travel Gold"),
        ("issuer", "Gamma Bank"),
        ("annualFee", "30000"),
    ]);
    let vectors = HashMap::from([("title".to_string(), builder.embedding(8))]);

    let id = gateway
        .insert(&collection, properties.clone(), Some(vectors.clone()), None)
        .await
        .unwrap();

    let fetched = gateway.read_by_id(&collection, id, true).await.unwrap();
    assert_eq!(fetched.properties, properties);
    assert_eq!(fetched.vectors, vectors);

    let without_vector = gateway.read_by_id(&collection, id, false).await.unwrap();
    assert!(without_vector.vectors.is_empty());
}

#[tokio::test]
async fn test_existence_consistency() {
    let store = store_with_cards().await;
    let gateway = DataGateway::new(Arc::clone(&store));

    let inserted = card("Shopping Plus", "Alpha Bank", "free");
    let never_inserted = card("Phantom", "Nobody", "n/a");

    assert!(!gateway.exists("Cards", &inserted).await.unwrap());

    gateway
        .insert("Cards", inserted.clone(), None, None)
        .await
        .unwrap();

    assert!(gateway.exists("Cards", &inserted).await.unwrap());
    assert!(!gateway.exists("Cards", &never_inserted).await.unwrap());
}

#[tokio::test]
async fn test_read_by_id_missing_object_is_not_found() {
    let builder = TestDataBuilder::from_test_name("missing_object");
    let store = store_with_cards().await;
    let gateway = DataGateway::new(store);

    let err = gateway
        .read_by_id("Cards", builder.object_id(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn test_keyword_ranking_orders_by_term_overlap() {
    let store = store_with_cards().await;
    let gateway = DataGateway::new(Arc::clone(&store));

    // Known differing overlap with "shopping discount card"
    for properties in [
        card("shopping discount card", "Alpha Bank", "free"),
        card("shopping card", "Beta Bank", "free"),
        card("travel card", "Gamma Bank", "30000"),
        card("gold club", "Delta Bank", "50000"),
    ] {
        gateway.insert("Cards", properties, None, None).await.unwrap();
    }

    let engine = RetrievalEngine::new(store);
    let results = engine
        .search_keyword("Cards", "shopping discount card", 10, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 3, "zero-overlap documents are not returned");

    let scores: Vec<f32> = results.iter().filter_map(|r| r.score).collect();
    assert_descending(&scores, "keyword relevance");
    assert_eq!(results[0].properties["title"], json!("shopping discount card"));
}

#[tokio::test]
async fn test_keyword_search_respects_field_restriction() {
    let store = store_with_cards().await;
    let gateway = DataGateway::new(Arc::clone(&store));

    gateway
        .insert("Cards", card("Everyday", "Shopping Bank", "free"), None, None)
        .await
        .unwrap();

    let engine = RetrievalEngine::new(store);

    let unrestricted = engine
        .search_keyword("Cards", "shopping", 10, None)
        .await
        .unwrap();
    assert_eq!(unrestricted.len(), 1, "issuer field matches by default");

    let restricted = engine
        .search_keyword("Cards", "shopping", 10, Some(vec!["title".to_string()]))
        .await
        .unwrap();
    assert!(restricted.is_empty(), "restricted to title, no match");
}

#[tokio::test]
async fn test_semantic_ranking_orders_by_distance() {
    let store = store_with_cards().await;
    let gateway = DataGateway::new(Arc::clone(&store));

    // Stored vectors at known angles from the query [1, 0, 0, 0, 0, 0, 0, 0]
    for (title, vector) in [
        ("exact", vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("close", vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ("orthogonal", vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
    ] {
        let properties = card(title, "Alpha Bank", "free");
        let vectors = HashMap::from([("title".to_string(), vector)]);
        gateway
            .insert("Cards", properties, Some(vectors), None)
            .await
            .unwrap();
    }

    let engine = RetrievalEngine::new(store);
    let query = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];

    let results = engine
        .search_semantic("Cards", SemanticQuery::Vector(query.clone()), 10)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let distances: Vec<f32> = results.iter().filter_map(|r| r.distance).collect();
    assert_ascending(&distances, "semantic distances");
    assert_eq!(results[0].properties["title"], json!("exact"));

    // Count is min(limit, matching)
    let capped = engine
        .search_semantic("Cards", SemanticQuery::Vector(query), 2)
        .await
        .unwrap();
    assert_eq!(capped.len(), 2);
}

#[tokio::test]
async fn test_bounded_iteration_is_restartable() {
    let store = store_with_cards().await;
    let gateway = DataGateway::new(store);

    for i in 0..5 {
        gateway
            .insert("Cards", card(&format!("card-{}", i), "Alpha Bank", "free"), None, None)
            .await
            .unwrap();
    }

    let first = gateway.read_all("Cards", 3).await.unwrap();
    let second = gateway.read_all("Cards", 3).await.unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second, "same prefix on both passes");
}

#[tokio::test]
async fn test_update_swaps_generative_module() {
    let store = store_with_cards().await;
    let registry = CollectionRegistry::new(store);

    registry
        .update(
            "Cards",
            CollectionUpdate {
                generative_module: Some("generative-cohere".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();

    let spec = registry.get("Cards").await.unwrap();
    assert_eq!(spec.generative_module.as_deref(), Some("generative-cohere"));
}

#[tokio::test]
async fn test_create_collision_is_schema_error() {
    let store = store_with_cards().await;
    let registry = CollectionRegistry::new(store);

    let err = registry.create(cards_spec()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Schema(_)));
}

#[tokio::test]
async fn test_end_to_end_cards_scenario() {
    let store = Arc::new(InMemoryStore::default());
    let registry = CollectionRegistry::new(Arc::clone(&store));
    let gateway = DataGateway::new(Arc::clone(&store));
    let engine = RetrievalEngine::new(Arc::clone(&store));

    registry.create(cards_spec()).await.unwrap();

    let shopping = card("Shopping Plus", "Alpha Bank", "free");
    let distractor = card("Travel Gold", "Gamma Bank", "30000");

    let shopping_id = gateway
        .insert("Cards", shopping.clone(), Some(title_vector(&shopping)), None)
        .await
        .unwrap();
    gateway
        .insert("Cards", distractor.clone(), Some(title_vector(&distractor)), None)
        .await
        .unwrap();

    let results = engine
        .search_semantic(
            "Cards",
            SemanticQuery::Text("discount shopping card".to_string()),
            1,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_uuid_eq(results[0].id, content_id(&shopping), "top hit identifier");
    assert_uuid_eq(results[0].id, shopping_id, "insert returned the content hash");
    let distance = assert_some(results[0].distance, "semantic hit distance");
    assert!(distance < 1.0, "shared terms must beat the orthogonal distractor");

    assert!(gateway.exists("Cards", &shopping).await.unwrap());

    registry.delete("Cards").await.unwrap();
    let err = registry.get("Cards").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}
