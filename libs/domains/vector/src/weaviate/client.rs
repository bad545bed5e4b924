use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::connection::ConnectionManager;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{
    CollectionSpec, CollectionUpdate, DataObject, DataType, DistanceMetric, FilterStrategy,
    PropertySpec, Quantization, SearchResult, Tokenization, VectorIndexConfig,
};
use crate::store::VectorStore;

/// Weaviate-protocol implementation of [`VectorStore`]
///
/// Schema, readiness, and search requests go to the control plane; object
/// requests go to the data plane. Every trait method runs inside one scoped
/// session; the wire protocol beyond that split is treated as opaque.
pub struct WeaviateStore {
    connections: ConnectionManager,
}

impl WeaviateStore {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            connections: ConnectionManager::new(config),
        }
    }

    pub fn from_env() -> GatewayResult<Self> {
        Ok(Self::new(EngineConfig::from_env()?))
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Issues one GraphQL search request; the caller resolves the collection
    /// schema once and hands it in for the selection list
    async fn run_search(
        &self,
        spec: &CollectionSpec,
        args: String,
        meta_field: &str,
    ) -> GatewayResult<Vec<SearchResult>> {
        let selection: Vec<String> = spec.properties.iter().map(|p| p.name.clone()).collect();

        let query = format!(
            "{{ Get {{ {class}({args}) {{ {selection} _additional {{ id {meta} }} }} }} }}",
            class = spec.name,
            args = args,
            selection = selection.join(" "),
            meta = meta_field,
        );

        let body = self
            .connections
            .scoped(|session| async move {
                let url = format!("{}/v1/graphql", session.control_url());
                let response = session
                    .http()
                    .post(&url)
                    .timeout(session.query_timeout())
                    .json(&GraphQlRequest { query })
                    .send()
                    .await?;

                let response = query_response(response, "GraphQL query").await?;
                let parsed: GraphQlResponse = response.json().await?;
                Ok(parsed)
            })
            .await?;

        if let Some(errors) = body.errors {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(GatewayError::Internal(format!(
                "GraphQL query failed: {}",
                messages.join("; ")
            )));
        }

        let data = body
            .data
            .ok_or_else(|| GatewayError::Internal("GraphQL response missing data".to_string()))?;

        parse_search_results(&data, &spec.name, meta_field)
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    async fn create_collection(&self, spec: CollectionSpec) -> GatewayResult<()> {
        let payload = class_from_spec(&spec);
        self.connections
            .scoped(|session| async move {
                let url = format!("{}/v1/schema", session.control_url());
                let response = session
                    .http()
                    .post(&url)
                    .timeout(session.query_timeout())
                    .json(&payload)
                    .send()
                    .await?;

                schema_response(response, &format!("Collection {}", payload.class)).await?;
                Ok(())
            })
            .await
    }

    async fn update_collection(&self, name: &str, update: CollectionUpdate) -> GatewayResult<()> {
        // Fetch-merge-put: only the mutable subset is ever touched, so an
        // engine-side rejection means the target field is immutable
        let spec = self.get_collection(name).await?;
        let mut payload = class_from_spec(&spec);

        if let Some(module) = update.generative_module {
            payload.module_config = Some(module_config_for(&module));
        }
        if let Some(description) = update.description {
            payload.description = Some(description);
        }

        self.connections
            .scoped(|session| async move {
                let url = format!(
                    "{}/v1/schema/{}",
                    session.control_url(),
                    urlencoding::encode(&payload.class)
                );
                let response = session
                    .http()
                    .put(&url)
                    .timeout(session.query_timeout())
                    .json(&payload)
                    .send()
                    .await?;

                schema_response(response, &format!("Collection {}", payload.class)).await?;
                Ok(())
            })
            .await
    }

    async fn get_collection(&self, name: &str) -> GatewayResult<CollectionSpec> {
        self.connections
            .scoped(|session| async move {
                let url = format!(
                    "{}/v1/schema/{}",
                    session.control_url(),
                    urlencoding::encode(name)
                );
                let response = session
                    .http()
                    .get(&url)
                    .timeout(session.query_timeout())
                    .send()
                    .await?;

                let response =
                    schema_response(response, &format!("Collection {}", name)).await?;
                let payload: ClassPayload = response.json().await?;
                Ok(spec_from_class(payload))
            })
            .await
    }

    async fn list_collections(&self) -> GatewayResult<Vec<CollectionSpec>> {
        self.connections
            .scoped(|session| async move {
                let url = format!("{}/v1/schema", session.control_url());
                let response = session
                    .http()
                    .get(&url)
                    .timeout(session.query_timeout())
                    .send()
                    .await?;

                let response = schema_response(response, "Schema listing").await?;
                let listing: SchemaListing = response.json().await?;
                Ok(listing.classes.into_iter().map(spec_from_class).collect())
            })
            .await
    }

    async fn delete_collection(&self, name: &str) -> GatewayResult<()> {
        self.connections
            .scoped(|session| async move {
                let url = format!(
                    "{}/v1/schema/{}",
                    session.control_url(),
                    urlencoding::encode(name)
                );
                let response = session
                    .http()
                    .delete(&url)
                    .timeout(session.query_timeout())
                    .send()
                    .await?;

                schema_response(response, &format!("Collection {}", name)).await?;
                Ok(())
            })
            .await
    }

    async fn insert_object(&self, collection: &str, object: DataObject) -> GatewayResult<Uuid> {
        let id = object.id;
        let payload = ObjectPayload {
            class: collection.to_string(),
            id,
            properties: object.properties,
            vectors: object.vectors,
        };

        self.connections
            .scoped(|session| async move {
                // PUT against the object path: insert-or-overwrite semantics
                let url = format!(
                    "{}/v1/objects/{}/{}",
                    session.data_url(),
                    urlencoding::encode(&payload.class),
                    payload.id
                );
                let response = session
                    .http()
                    .put(&url)
                    .timeout(session.insert_timeout())
                    .json(&payload)
                    .send()
                    .await?;

                object_response(response, &format!("Object {}", payload.id)).await?;
                Ok(id)
            })
            .await
    }

    async fn get_object(
        &self,
        collection: &str,
        id: Uuid,
        include_vector: bool,
    ) -> GatewayResult<DataObject> {
        self.connections
            .scoped(|session| async move {
                let mut url = format!(
                    "{}/v1/objects/{}/{}",
                    session.data_url(),
                    urlencoding::encode(collection),
                    id
                );
                if include_vector {
                    url.push_str("?include=vector");
                }

                let response = session
                    .http()
                    .get(&url)
                    .timeout(session.query_timeout())
                    .send()
                    .await?;

                let response = object_response(response, &format!("Object {}", id)).await?;
                let payload: ObjectPayload = response.json().await?;
                Ok(DataObject {
                    id: payload.id,
                    properties: payload.properties,
                    vectors: payload.vectors,
                })
            })
            .await
    }

    async fn object_exists(&self, collection: &str, id: Uuid) -> GatewayResult<bool> {
        self.connections
            .scoped(|session| async move {
                let url = format!(
                    "{}/v1/objects/{}/{}",
                    session.data_url(),
                    urlencoding::encode(collection),
                    id
                );
                let response = session
                    .http()
                    .head(&url)
                    .timeout(session.query_timeout())
                    .send()
                    .await?;

                match response.status() {
                    status if status.is_success() => Ok(true),
                    StatusCode::NOT_FOUND => Ok(false),
                    status => Err(GatewayError::Internal(format!(
                        "Existence probe for {} failed ({})",
                        id, status
                    ))),
                }
            })
            .await
    }

    async fn list_objects(
        &self,
        collection: &str,
        limit: usize,
    ) -> GatewayResult<Vec<DataObject>> {
        self.connections
            .scoped(|session| async move {
                let url = format!(
                    "{}/v1/objects?class={}&limit={}",
                    session.data_url(),
                    urlencoding::encode(collection),
                    limit
                );
                let response = session
                    .http()
                    .get(&url)
                    .timeout(session.query_timeout())
                    .send()
                    .await?;

                let response =
                    object_response(response, &format!("Collection {}", collection)).await?;
                let listing: ObjectListing = response.json().await?;
                Ok(listing
                    .objects
                    .into_iter()
                    .take(limit)
                    .map(|payload| DataObject {
                        id: payload.id,
                        properties: payload.properties,
                        vectors: payload.vectors,
                    })
                    .collect())
            })
            .await
    }

    async fn query_bm25(
        &self,
        collection: &str,
        query: &str,
        fields: Option<Vec<String>>,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        let spec = self.get_collection(collection).await?;
        let fields = fields.unwrap_or_else(|| spec.text_properties());

        let args = bm25_args(query, &fields, limit);
        self.run_search(&spec, args, "score").await
    }

    async fn query_near_text(
        &self,
        collection: &str,
        text: &str,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        let spec = self.get_collection(collection).await?;
        let args = near_text_args(text, limit);
        self.run_search(&spec, args, "distance").await
    }

    async fn query_near_vector(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> GatewayResult<Vec<SearchResult>> {
        let spec = self.get_collection(collection).await?;
        let args = near_vector_args(&vector, limit)?;
        self.run_search(&spec, args, "distance").await
    }
}

// ===== Wire Payloads =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassPayload {
    class: String,
    #[serde(default)]
    properties: Vec<PropertyPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vector_index_config: Option<IndexPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    module_config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PropertyPayload {
    name: String,
    data_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tokenization: Option<String>,
    #[serde(default)]
    vectorize_property_name: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexPayload {
    distance: String,
    quantizer: String,
    filter_strategy: String,
    ef_construction: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimension: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SchemaListing {
    #[serde(default)]
    classes: Vec<ClassPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectPayload {
    class: String,
    id: Uuid,
    properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    vectors: HashMap<String, Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct ObjectListing {
    #[serde(default)]
    objects: Vec<ObjectPayload>,
}

#[derive(Debug, Serialize)]
struct GraphQlRequest {
    query: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

// ===== Conversions =====

fn class_from_spec(spec: &CollectionSpec) -> ClassPayload {
    ClassPayload {
        class: spec.name.clone(),
        properties: spec
            .properties
            .iter()
            .map(|p| PropertyPayload {
                name: p.name.clone(),
                data_type: vec![p.data_type.as_str().to_string()],
                tokenization: Some(p.tokenization.as_str().to_string()),
                vectorize_property_name: p.vectorize_property_name,
            })
            .collect(),
        vector_index_config: Some(IndexPayload {
            distance: spec.vector_index.distance.as_str().to_string(),
            quantizer: spec.vector_index.quantization.as_str().to_string(),
            filter_strategy: spec.vector_index.filter_strategy.as_str().to_string(),
            ef_construction: spec.vector_index.ef_construction,
            dimension: spec.vector_index.dimension,
        }),
        module_config: spec.generative_module.as_deref().map(module_config_for),
        description: None,
    }
}

fn spec_from_class(payload: ClassPayload) -> CollectionSpec {
    let vector_index = payload
        .vector_index_config
        .map(|index| VectorIndexConfig {
            distance: distance_from_wire(&index.distance),
            quantization: quantization_from_wire(&index.quantizer),
            filter_strategy: filter_strategy_from_wire(&index.filter_strategy),
            ef_construction: index.ef_construction,
            dimension: index.dimension,
        })
        .unwrap_or_default();

    CollectionSpec {
        name: payload.class,
        properties: payload
            .properties
            .into_iter()
            .map(|p| PropertySpec {
                data_type: p
                    .data_type
                    .first()
                    .map(|s| data_type_from_wire(s))
                    .unwrap_or_default(),
                tokenization: p
                    .tokenization
                    .as_deref()
                    .map(tokenization_from_wire)
                    .unwrap_or_default(),
                vectorize_property_name: p.vectorize_property_name,
                name: p.name,
            })
            .collect(),
        vector_index,
        generative_module: payload.module_config.as_ref().and_then(|config| {
            config
                .as_object()
                .and_then(|map| map.keys().next().cloned())
        }),
    }
}

fn module_config_for(module: &str) -> Value {
    Value::Object(Map::from_iter([(
        module.to_string(),
        Value::Object(Map::new()),
    )]))
}

fn distance_from_wire(value: &str) -> DistanceMetric {
    match value {
        "dot" => DistanceMetric::Dot,
        "l2-squared" => DistanceMetric::L2Squared,
        "manhattan" => DistanceMetric::Manhattan,
        _ => DistanceMetric::Cosine,
    }
}

fn quantization_from_wire(value: &str) -> Quantization {
    match value {
        "pq" => Quantization::Pq,
        "sq" => Quantization::Sq,
        "none" => Quantization::None,
        _ => Quantization::Bq,
    }
}

fn filter_strategy_from_wire(value: &str) -> FilterStrategy {
    match value {
        "acorn" => FilterStrategy::Acorn,
        _ => FilterStrategy::Sweeping,
    }
}

fn data_type_from_wire(value: &str) -> DataType {
    match value {
        "text[]" => DataType::TextArray,
        "int" => DataType::Int,
        "number" => DataType::Number,
        "boolean" => DataType::Boolean,
        "date" => DataType::Date,
        _ => DataType::Text,
    }
}

fn tokenization_from_wire(value: &str) -> Tokenization {
    match value {
        "lowercase" => Tokenization::Lowercase,
        "whitespace" => Tokenization::Whitespace,
        "field" => Tokenization::Field,
        _ => Tokenization::Word,
    }
}

// ===== Query Construction =====

/// JSON string escaping doubles as GraphQL string escaping
fn graphql_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn bm25_args(query: &str, fields: &[String], limit: usize) -> String {
    let properties: Vec<String> = fields.iter().map(|f| graphql_string(f)).collect();
    format!(
        "bm25: {{ query: {}, properties: [{}] }}, limit: {}",
        graphql_string(query),
        properties.join(", "),
        limit
    )
}

fn near_text_args(text: &str, limit: usize) -> String {
    format!(
        "nearText: {{ concepts: [{}] }}, limit: {}",
        graphql_string(text),
        limit
    )
}

fn near_vector_args(vector: &[f32], limit: usize) -> GatewayResult<String> {
    let rendered = serde_json::to_string(vector)?;
    Ok(format!(
        "nearVector: {{ vector: {} }}, limit: {}",
        rendered, limit
    ))
}

fn parse_search_results(
    data: &Value,
    collection: &str,
    meta_field: &str,
) -> GatewayResult<Vec<SearchResult>> {
    let hits = data
        .get("Get")
        .and_then(|get| get.get(collection))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GatewayError::Internal(format!(
                "GraphQL response missing Get.{} result list",
                collection
            ))
        })?;

    hits.iter()
        .map(|hit| {
            let object = hit.as_object().ok_or_else(|| {
                GatewayError::Internal("GraphQL hit is not an object".to_string())
            })?;

            let additional = object.get("_additional").and_then(Value::as_object);
            let id = additional
                .and_then(|meta| meta.get("id"))
                .and_then(Value::as_str)
                .ok_or_else(|| GatewayError::Internal("GraphQL hit missing id".to_string()))?;
            let id = Uuid::parse_str(id)
                .map_err(|e| GatewayError::Internal(format!("Invalid object id: {}", e)))?;

            let annotation = additional
                .and_then(|meta| meta.get(meta_field))
                .and_then(Value::as_f64)
                .map(|v| v as f32);

            let properties: Map<String, Value> = object
                .iter()
                .filter(|(key, _)| key.as_str() != "_additional")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            Ok(SearchResult {
                id,
                properties,
                distance: (meta_field == "distance").then_some(annotation).flatten(),
                score: (meta_field == "score").then_some(annotation).flatten(),
            })
        })
        .collect()
}

// ===== Response Mapping =====

async fn schema_response(response: Response, context: &str) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound(context.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Schema(format!("{}: {}", context, body))
        }
        _ => GatewayError::Internal(format!("{} ({}): {}", context, status, body)),
    })
}

async fn object_response(response: Response, context: &str) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound(context.to_string()),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(format!("{}: {}", context, body))
        }
        _ => GatewayError::Internal(format!("{} ({}): {}", context, status, body)),
    })
}

async fn query_response(response: Response, context: &str) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Internal(format!(
        "{} ({}): {}",
        context, status, body
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, PropertySpec};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Engine stub serving readiness, the "Cards" schema, and empty GraphQL
    /// hit lists, logging the request line of everything it receives
    async fn spawn_engine_stub(log: Arc<Mutex<Vec<String>>>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let line = request.lines().next().unwrap_or_default().to_string();

                    let body = if line.contains("/v1/graphql") {
                        r#"{"data":{"Get":{"Cards":[]}}}"#
                    } else if line.contains("/v1/schema/Cards") {
                        r#"{"class":"Cards","properties":[{"name":"title","dataType":["text"]},{"name":"priority","dataType":["int"]}]}"#
                    } else {
                        ""
                    };

                    log.lock().unwrap().push(line);
                    let response = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn test_bm25_default_fields_resolve_schema_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let addr = spawn_engine_stub(Arc::clone(&log)).await;

        let config =
            EngineConfig::new(addr.ip().to_string()).with_ports(addr.port(), addr.port());
        let store = WeaviateStore::new(config);

        let results = store.query_bm25("Cards", "shopping", None, 3).await.unwrap();
        assert!(results.is_empty());

        let schema_fetches = log
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.starts_with("GET /v1/schema/Cards"))
            .count();
        assert_eq!(schema_fetches, 1, "selection list must reuse the one schema fetch");
    }

    fn cards_spec() -> CollectionSpec {
        CollectionSpec::new(
            "Cards",
            vec![
                PropertySpec::text("title")
                    .with_tokenization(Tokenization::Lowercase)
                    .vectorize_name(),
                PropertySpec::new("priority", DataType::Int),
            ],
        )
        .with_generative_module("generative-cohere")
    }

    #[test]
    fn test_class_payload_round_trip() {
        let spec = cards_spec();
        let round_tripped = spec_from_class(class_from_spec(&spec));

        assert_eq!(round_tripped.name, "Cards");
        assert_eq!(round_tripped.properties.len(), 2);
        assert_eq!(round_tripped.properties[0].name, "title");
        assert_eq!(round_tripped.properties[0].tokenization, Tokenization::Lowercase);
        assert!(round_tripped.properties[0].vectorize_property_name);
        assert_eq!(round_tripped.properties[1].data_type, DataType::Int);
        assert_eq!(round_tripped.vector_index.ef_construction, 300);
        assert_eq!(
            round_tripped.generative_module.as_deref(),
            Some("generative-cohere")
        );
    }

    #[test]
    fn test_wire_names_use_camel_case() {
        let rendered = serde_json::to_value(class_from_spec(&cards_spec())).unwrap();

        assert!(rendered.get("vectorIndexConfig").is_some());
        assert_eq!(
            rendered["properties"][0]["dataType"],
            json!(["text"])
        );
        assert_eq!(
            rendered["vectorIndexConfig"]["efConstruction"],
            json!(300)
        );
    }

    #[test]
    fn test_bm25_args_escape_query_text() {
        let args = bm25_args(
            "say \"hello\"",
            &["title".to_string(), "body".to_string()],
            3,
        );

        assert_eq!(
            args,
            "bm25: { query: \"say \\\"hello\\\"\", properties: [\"title\", \"body\"] }, limit: 3"
        );
    }

    #[test]
    fn test_near_vector_args_render_values() {
        let args = near_vector_args(&[0.5, -1.0], 2).unwrap();

        assert_eq!(args, "nearVector: { vector: [0.5,-1.0] }, limit: 2");
    }

    #[test]
    fn test_parse_search_results_extracts_distance() {
        let id = Uuid::new_v4();
        let data = json!({
            "Get": {
                "Cards": [
                    {
                        "title": "Shopping Plus",
                        "_additional": { "id": id.to_string(), "distance": 0.12 }
                    }
                ]
            }
        });

        let results = parse_search_results(&data, "Cards", "distance").unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
        assert_eq!(results[0].properties["title"], json!("Shopping Plus"));
        assert_eq!(results[0].distance, Some(0.12));
        assert_eq!(results[0].score, None);
    }

    #[test]
    fn test_parse_search_results_rejects_missing_id() {
        let data = json!({ "Get": { "Cards": [ { "title": "x" } ] } });

        let err = parse_search_results(&data, "Cards", "distance").unwrap_err();
        assert!(matches!(err, GatewayError::Internal(_)));
    }
}
