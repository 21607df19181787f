//! The façade the host store talks to: one method per store action, each a
//! single request/response round trip.

use serde_json::{Map, Value};

use crate::{
    arguments::TYPE_TAG,
    error::Error,
    model::ModelRegistry,
    query::{MutationAction, PreparedOperation, QueryBuilder},
    store::EntityStore,
    transform::Transformer,
    transport::{CachePolicy, GraphqlTransport},
};

/// Wires the query builder, the transformer and the collaborators together.
///
/// The registry is built once from the store's entity list and read-only
/// afterwards; every operation is a value-in/value-out round trip, so
/// independent calls may be in flight concurrently.
pub struct GraphqlAdapter<S, T> {
    registry: ModelRegistry,
    transformer: Transformer,
    store: S,
    transport: T,
}

impl<S, T> GraphqlAdapter<S, T>
where
    S: EntityStore,
    T: GraphqlTransport,
{
    pub fn new(store: S, transport: T) -> Self {
        let registry = ModelRegistry::new(store.schemas());
        let transformer = Transformer::new(registry.inflector().clone());
        Self {
            registry,
            transformer,
            store,
            transport,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches records of a model and feeds them into the store.
    ///
    /// A filter carrying an `id` fetches a single record; `bypass_cache` is
    /// forwarded to the transport's cache policy untouched. Returns the
    /// store-shaped payload that was inserted.
    pub async fn fetch(
        &self,
        model_name: &str,
        filter: Option<Map<String, Value>>,
        bypass_cache: bool,
    ) -> Result<Value, Error> {
        let operation = QueryBuilder::new(&self.registry).build_query(model_name, filter.as_ref())?;
        let policy = if bypass_cache {
            CachePolicy::Bypass
        } else {
            CachePolicy::Default
        };

        let data = self.execute(&operation, policy).await?;
        let data = self.transformer.to_store_shape(&data);
        if let Value::Object(map) = &data {
            for (key, records) in map {
                self.store.insert_or_update(key, records.clone());
            }
        }
        Ok(data)
    }

    /// Sends an in-store record to the API as a `create` mutation and merges
    /// the server-assigned fields back under the original id.
    pub async fn persist(&self, model_name: &str, id: i64) -> Result<Value, Error> {
        let model = self.registry.model(model_name)?;
        let record = self
            .store
            .record(model.singular_name(), id)
            .ok_or_else(|| Error::MissingRecord {
                model: model.singular_name().to_owned(),
                id,
            })?;

        let mut args = Map::new();
        args.insert(
            model.singular_name().to_owned(),
            self.input_value(model.singular_name(), &record)?,
        );

        let operation =
            QueryBuilder::new(&self.registry).build_mutation(model_name, MutationAction::Create, &args)?;
        let data = self.execute(&operation, CachePolicy::Default).await?;
        self.reconcile(model.singular_name().to_owned(), id, &data)
    }

    /// Sends a record's current field values as an `update` mutation and
    /// reconciles the result like [`persist`](Self::persist).
    pub async fn push(&self, model_name: &str, record: Map<String, Value>) -> Result<Value, Error> {
        let model = self.registry.model(model_name)?;
        let id = record
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::MissingId {
                model: model.singular_name().to_owned(),
            })?;

        let mut args = Map::new();
        args.insert("id".to_owned(), id.into());
        args.insert(
            model.singular_name().to_owned(),
            self.input_value(model.singular_name(), &record)?,
        );

        let operation =
            QueryBuilder::new(&self.registry).build_mutation(model_name, MutationAction::Update, &args)?;
        let data = self.execute(&operation, CachePolicy::Default).await?;
        self.reconcile(model.singular_name().to_owned(), id, &data)
    }

    /// Sends a `delete` mutation referencing only the id. Removing the local
    /// record afterwards is the caller's business.
    pub async fn destroy(&self, model_name: &str, id: i64) -> Result<(), Error> {
        let mut args = Map::new();
        args.insert("id".to_owned(), id.into());

        let operation =
            QueryBuilder::new(&self.registry).build_mutation(model_name, MutationAction::Delete, &args)?;
        self.execute(&operation, CachePolicy::Default).await?;
        Ok(())
    }

    /// Executes an arbitrary named mutation. The signature and call site are
    /// driven by the argument map; the result is returned in store shape but
    /// not written to the store.
    pub async fn mutate(
        &self,
        model_name: &str,
        mutation_name: &str,
        args: Map<String, Value>,
    ) -> Result<Value, Error> {
        let operation =
            QueryBuilder::new(&self.registry).build_custom_mutation(model_name, mutation_name, &args)?;
        let data = self.execute(&operation, CachePolicy::Default).await?;
        Ok(self.transformer.to_store_shape(&data))
    }

    /// Strips relations and id from a record and tags it with the entity
    /// type so the formatter declares it as `<Entity>Input`.
    fn input_value(&self, model_name: &str, record: &Map<String, Value>) -> Result<Value, Error> {
        let model = self.registry.model(model_name)?;
        let mut input = self.transformer.to_wire_shape(model, record);
        input.insert(TYPE_TAG.to_owned(), model.type_name().into());
        Ok(Value::Object(input))
    }

    /// Mutation responses carry the result under the mutation's root field;
    /// the store is updated keyed by the id the operation started from.
    fn reconcile(&self, model_name: String, original_id: i64, data: &Value) -> Result<Value, Error> {
        let data = self.transformer.to_store_shape(data);
        let record = match &data {
            Value::Object(map) => map.values().next().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        self.store.update(&model_name, original_id, record.clone());
        Ok(record)
    }

    async fn execute(
        &self,
        operation: &PreparedOperation,
        policy: CachePolicy,
    ) -> Result<Value, Error> {
        tracing::debug!(
            operation = %operation.operation_name,
            "sending\n{}\n{}",
            operation.query,
            serde_json::to_string_pretty(&operation.variables).unwrap_or_default()
        );
        Ok(self.transport.execute(operation, policy).await?)
    }
}
