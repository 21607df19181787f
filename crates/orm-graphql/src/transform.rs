//! Bidirectional mapping between the wire shape (connection wrappers,
//! `__typename` tags, string-encoded ids) and the store shape (flat relation
//! keys, numeric ids).

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::{
    inflect::Inflect,
    model::{FieldKind, ModelDescriptor},
};

const NODES: &str = "nodes";
const TYPENAME: &str = "__typename";

pub struct Transformer {
    inflect: Arc<dyn Inflect>,
}

impl Transformer {
    pub fn new(inflect: Arc<dyn Inflect>) -> Self {
        Self { inflect }
    }

    /// Produces a store-shaped copy of a wire payload. The input is never
    /// mutated.
    ///
    /// Connection objects are unwrapped and re-keyed under the pluralized
    /// field name, single related records are re-keyed under the singularized
    /// name, `__typename` tags and nulls are dropped, and `id` values are
    /// coerced to integers.
    pub fn to_store_shape(&self, payload: &Value) -> Value {
        tracing::debug!("transforming incoming data:\n{payload}");
        self.store_shape(payload)
    }

    fn store_shape(&self, payload: &Value) -> Value {
        match payload {
            Value::Array(items) => Value::Array(items.iter().map(|item| self.store_shape(item)).collect()),
            Value::Object(map) => Value::Object(self.store_shape_object(map)),
            other => other.clone(),
        }
    }

    fn store_shape_object(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in map {
            if key == TYPENAME || value.is_null() {
                continue;
            }
            match value {
                Value::Object(inner) if inner.contains_key(NODES) => {
                    let nodes = self.store_shape(&inner[NODES]);
                    out.insert(self.inflect.pluralize(key), nodes);
                }
                Value::Object(_) => {
                    out.insert(self.inflect.singularize(key), self.store_shape(value));
                }
                _ if key == "id" => {
                    out.insert(key.clone(), coerce_id(value));
                }
                _ => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// Flat outgoing payload for a record: declared scalar fields only.
    ///
    /// The `id` is carried as a dedicated argument by the builder, and
    /// nested related records are never re-sent.
    pub fn to_wire_shape(&self, model: &ModelDescriptor, record: &Map<String, Value>) -> Map<String, Value> {
        record
            .iter()
            .filter(|(name, _)| name.as_str() != "id")
            .filter(|(name, _)| matches!(model.kind(name.as_str()), Some(FieldKind::Scalar)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Wire ids arrive string-encoded; the store keys records by integer.
fn coerce_id(value: &Value) -> Value {
    match value {
        Value::String(text) => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        inflect::EnglishInflection,
        model::{EntitySchema, ModelRegistry},
    };

    fn transformer() -> Transformer {
        Transformer::new(Arc::new(EnglishInflection))
    }

    #[test]
    fn unwraps_connections_and_coerces_ids() {
        let incoming = json!({
            "id": "1",
            "name": "X",
            "posts": {"nodes": [{"id": "5", "title": "T"}]}
        });
        assert_eq!(
            transformer().to_store_shape(&incoming),
            json!({"id": 1, "name": "X", "posts": [{"id": 5, "title": "T"}]})
        );
    }

    #[test]
    fn rekeys_single_related_records() {
        let incoming = json!({
            "id": 2,
            "profiles": {"id": "7", "email": "a@b"}
        });
        assert_eq!(
            transformer().to_store_shape(&incoming),
            json!({"id": 2, "profile": {"id": 7, "email": "a@b"}})
        );
    }

    #[test]
    fn drops_typename_and_nulls() {
        let incoming = json!({
            "__typename": "User",
            "id": "1",
            "deletedAt": null,
            "posts": {"nodes": [{"__typename": "Post", "id": "5"}]}
        });
        assert_eq!(
            transformer().to_store_shape(&incoming),
            json!({"id": 1, "posts": [{"id": 5}]})
        );
    }

    #[test]
    fn non_numeric_ids_pass_through() {
        let incoming = json!({"id": "not-a-number"});
        assert_eq!(
            transformer().to_store_shape(&incoming),
            json!({"id": "not-a-number"})
        );
    }

    #[test]
    fn input_is_not_mutated() {
        let incoming = json!({"id": "1", "user": {"id": "2"}});
        let before = incoming.clone();
        let _ = transformer().to_store_shape(&incoming);
        assert_eq!(incoming, before);
    }

    #[test]
    fn wire_shape_is_flat_and_keeps_foreign_keys() {
        let registry = ModelRegistry::new(vec![
            EntitySchema::new("Post")
                .scalar("id")
                .scalar("title")
                .scalar("userId")
                .to_one("user", "user"),
            EntitySchema::new("User").scalar("id").scalar("name"),
        ]);
        let post = registry.model("post").unwrap();
        let record = match json!({
            "id": 5,
            "title": "T",
            "userId": 1,
            "user": {"id": 1, "name": "X"},
            "$localFlag": true
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let wire = transformer().to_wire_shape(post, &record);
        assert_eq!(Value::Object(wire), json!({"title": "T", "userId": 1}));
    }
}
