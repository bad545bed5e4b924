use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};

/// Declared data type of a collection property (engine wire names)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Text,
    TextArray,
    Int,
    Number,
    Boolean,
    Date,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::TextArray => "text[]",
            DataType::Int => "int",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Text | DataType::TextArray)
    }
}

/// Tokenization policy applied to a text property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tokenization {
    #[default]
    Word,
    Lowercase,
    Whitespace,
    Field,
}

impl Tokenization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tokenization::Word => "word",
            Tokenization::Lowercase => "lowercase",
            Tokenization::Whitespace => "whitespace",
            Tokenization::Field => "field",
        }
    }
}

/// A single property definition within a collection schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySpec {
    pub name: String,
    pub data_type: DataType,
    pub tokenization: Tokenization,
    /// Whether the property name itself contributes to the property's vector
    pub vectorize_property_name: bool,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            tokenization: Tokenization::default(),
            vectorize_property_name: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, DataType::Text)
    }

    pub fn with_tokenization(mut self, tokenization: Tokenization) -> Self {
        self.tokenization = tokenization;
        self
    }

    pub fn vectorize_name(mut self) -> Self {
        self.vectorize_property_name = true;
        self
    }
}

/// Distance metric for similarity calculations; lower values mean closer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    L2Squared,
    Manhattan,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Dot => "dot",
            DistanceMetric::L2Squared => "l2-squared",
            DistanceMetric::Manhattan => "manhattan",
        }
    }
}

/// Vector quantization strategy for the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Quantization {
    /// Binary quantization
    #[default]
    Bq,
    /// Product quantization
    Pq,
    /// Scalar quantization
    Sq,
    None,
}

impl Quantization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quantization::Bq => "bq",
            Quantization::Pq => "pq",
            Quantization::Sq => "sq",
            Quantization::None => "none",
        }
    }
}

/// Strategy used to combine vector search with filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterStrategy {
    #[default]
    Sweeping,
    Acorn,
}

impl FilterStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStrategy::Sweeping => "sweeping",
            FilterStrategy::Acorn => "acorn",
        }
    }
}

/// Vector-index configuration, fixed at collection creation apart from the
/// fields covered by [`CollectionUpdate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    pub distance: DistanceMetric,
    pub quantization: Quantization,
    pub filter_strategy: FilterStrategy,
    pub ef_construction: u32,
    /// Expected dimensionality of supplied vectors; unchecked when absent
    pub dimension: Option<u32>,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            distance: DistanceMetric::Cosine,
            quantization: Quantization::Bq,
            filter_strategy: FilterStrategy::Sweeping,
            ef_construction: 300,
            dimension: None,
        }
    }
}

impl VectorIndexConfig {
    pub fn with_distance(mut self, distance: DistanceMetric) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_quantization(mut self, quantization: Quantization) -> Self {
        self.quantization = quantization;
        self
    }

    pub fn with_dimension(mut self, dimension: u32) -> Self {
        self.dimension = Some(dimension);
        self
    }
}

/// A collection schema: named property list plus vector-index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub properties: Vec<PropertySpec>,
    pub vector_index: VectorIndexConfig,
    /// Companion generative-model module reference, reconfigurable after creation
    pub generative_module: Option<String>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, properties: Vec<PropertySpec>) -> Self {
        Self {
            name: name.into(),
            properties,
            vector_index: VectorIndexConfig::default(),
            generative_module: None,
        }
    }

    pub fn with_vector_index(mut self, vector_index: VectorIndexConfig) -> Self {
        self.vector_index = vector_index;
        self
    }

    pub fn with_generative_module(mut self, module: impl Into<String>) -> Self {
        self.generative_module = Some(module.into());
        self
    }

    /// Names of the text-typed properties, the default search surface for
    /// keyword queries
    pub fn text_properties(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|p| p.data_type.is_text())
            .map(|p| p.name.clone())
            .collect()
    }
}

/// The restricted set of collection fields that may change after creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionUpdate {
    pub generative_module: Option<String>,
    pub description: Option<String>,
}

impl CollectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.generative_module.is_none() && self.description.is_none()
    }
}

/// A stored data object: property mapping plus zero or more named vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataObject {
    pub id: Uuid,
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub vectors: HashMap<String, Vec<f32>>,
}

impl DataObject {
    pub fn new(id: Uuid, properties: Map<String, Value>) -> Self {
        Self {
            id,
            properties,
            vectors: HashMap::new(),
        }
    }

    pub fn with_vectors(mut self, vectors: HashMap<String, Vec<f32>>) -> Self {
        self.vectors = vectors;
        self
    }
}

/// One ranked search hit
///
/// Semantic queries annotate `distance` (lower is closer); keyword queries
/// annotate `score` (higher is more relevant). The two scales are not
/// comparable and a result never carries both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: Uuid,
    pub properties: Map<String, Value>,
    pub distance: Option<f32>,
    pub score: Option<f32>,
}

/// Optional categorical constraints applied as a post-filter pass over
/// retrieval results; absent values constrain nothing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilter {
    pub annual_fee: Option<String>,
    pub card_type: Option<String>,
    pub benefits: Option<String>,
    pub issuer: Option<String>,
}

impl QueryFilter {
    /// The non-null category constraints as (field, value) pairs
    pub fn applied(&self) -> Vec<(&'static str, &str)> {
        [
            ("annual_fee", &self.annual_fee),
            ("card_type", &self.card_type),
            ("benefits", &self.benefits),
            ("issuer", &self.issuer),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }

    /// Case-insensitive containment match of every applied category against
    /// the corresponding property value; a missing property fails the match
    pub fn matches(&self, properties: &Map<String, Value>) -> bool {
        self.applied().iter().all(|(field, want)| {
            properties
                .get(*field)
                .and_then(Value::as_str)
                .is_some_and(|have| have.to_lowercase().contains(&want.to_lowercase()))
        })
    }
}

/// Which fixed collection a multi-modal retrieval runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalTarget {
    Text,
    Image,
}

impl RetrievalTarget {
    /// Parses a target selector; anything outside `text`/`image` is rejected
    pub fn parse(value: &str) -> GatewayResult<Self> {
        match value {
            "text" => Ok(RetrievalTarget::Text),
            "image" => Ok(RetrievalTarget::Image),
            other => Err(GatewayError::Validation(format!(
                "Unknown retrieval target: {}",
                other
            ))),
        }
    }
}

/// Deterministic identifier for a property mapping: UUID v5 over a canonical
/// (recursively key-sorted) JSON rendering of the content
///
/// Equal content always hashes to the same identifier, which is what makes
/// insertion idempotent at the content level.
pub fn content_id(properties: &Map<String, Value>) -> Uuid {
    let mut canonical = String::new();
    write_canonical(&Value::Object(properties.clone()), &mut canonical);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, canonical.as_bytes())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}
