use serde_json::{Map, Value};

use crate::model::EntitySchema;

/// The host entity store the adapter was plugged into.
///
/// The adapter only ever reads entity schemas and records from the store and
/// feeds results back through the three mutation primitives; everything else
/// about the store, including its concurrency discipline, is its own
/// business.
pub trait EntityStore: Send + Sync {
    /// The declared entities, collected once when the adapter is built.
    fn schemas(&self) -> Vec<EntitySchema>;

    /// A single record in store shape, if present.
    fn record(&self, model: &str, id: i64) -> Option<Map<String, Value>>;

    fn insert(&self, model: &str, data: Value);

    fn insert_or_update(&self, model: &str, data: Value);

    fn update(&self, model: &str, where_id: i64, data: Value);
}
