//! Shared test utilities for domain testing
//!
//! Provides `TestDataBuilder` for deterministic test data (names, object
//! identifiers, property mappings, seeded embeddings) and custom assertion
//! helpers. Seeding from the test name keeps data reproducible across runs
//! while distinct between tests.
//!
//! # Usage
//!
//! ```
//! use test_utils::TestDataBuilder;
//!
//! let builder = TestDataBuilder::from_test_name("my_test");
//! let collection = builder.name("collection", "main");
//! let embedding = builder.embedding(8);
//! assert_eq!(embedding, builder.embedding(8));
//! ```

use serde_json::{Map, Value};
use uuid::Uuid;

/// Builder for test data with deterministic randomization
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a deterministic object identifier for this seed
    pub fn object_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let name = builder.name("collection", "main");
    /// // Returns: "test-collection-12345-main"
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Build a string-valued property mapping from (key, value) pairs
    pub fn properties(&self, pairs: &[(&str, &str)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
            .collect()
    }

    /// Generate a deterministic embedding of the given dimension
    ///
    /// Values are in [-1, 1], derived from the seed with a small linear
    /// congruential generator so equal seeds always produce equal vectors.
    pub fn embedding(&self, dimension: usize) -> Vec<f32> {
        let mut state = self.seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        (0..dimension)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

/// Test assertion helpers
pub mod assertions {
    use uuid::Uuid;

    /// Assert that two UUIDs are equal with a nice error message
    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that a slice of annotations is sorted ascending (distances)
    pub fn assert_ascending(values: &[f32], context: &str) {
        assert!(
            values.windows(2).all(|pair| pair[0] <= pair[1]),
            "{}: expected ascending order, got {:?}",
            context,
            values
        );
    }

    /// Assert that a slice of annotations is sorted descending (scores)
    pub fn assert_descending(values: &[f32], context: &str) {
        assert!(
            values.windows(2).all(|pair| pair[0] >= pair[1]),
            "{}: expected descending order, got {:?}",
            context,
            values
        );
    }
}
