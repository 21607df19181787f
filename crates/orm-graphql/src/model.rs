use std::sync::Arc;

use indexmap::IndexMap;
use inflector::Inflector as _;

use crate::{
    error::Error,
    inflect::{EnglishInflection, Inflect},
};

/// Classification of a declared field, resolved once when the registry is
/// built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    ToOne { related: String },
    ToMany { related: String },
}

impl FieldKind {
    pub fn is_relation(&self) -> bool {
        !matches!(self, Self::Scalar)
    }

    /// The singular name of the related entity, for relation kinds.
    pub fn related(&self) -> Option<&str> {
        match self {
            Self::Scalar => None,
            Self::ToOne { related } | Self::ToMany { related } => Some(related),
        }
    }
}

/// The field schema of one entity as declared by the host store.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub name: String,
    pub fields: Vec<(String, FieldKind)>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn scalar(mut self, name: impl Into<String>) -> Self {
        self.fields.push((name.into(), FieldKind::Scalar));
        self
    }

    pub fn to_one(mut self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.fields.push((
            name.into(),
            FieldKind::ToOne {
                related: related.into(),
            },
        ));
        self
    }

    pub fn to_many(mut self, name: impl Into<String>, related: impl Into<String>) -> Self {
        self.fields.push((
            name.into(),
            FieldKind::ToMany {
                related: related.into(),
            },
        ));
        self
    }
}

/// Immutable description of one entity: inflected names plus its classified
/// fields, in declaration order.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    singular_name: String,
    plural_name: String,
    fields: IndexMap<String, FieldKind>,
}

impl ModelDescriptor {
    fn new(schema: EntitySchema, inflect: &dyn Inflect) -> Self {
        let singular_name = inflect.singularize(&schema.name).to_camel_case();
        let plural_name = inflect.pluralize(&singular_name);
        Self {
            singular_name,
            plural_name,
            fields: schema.fields.into_iter().collect(),
        }
    }

    pub fn singular_name(&self) -> &str {
        &self.singular_name
    }

    pub fn plural_name(&self) -> &str {
        &self.plural_name
    }

    /// The GraphQL type name, e.g. `User` for the `user` model.
    pub fn type_name(&self) -> String {
        self.singular_name.to_pascal_case()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), kind))
    }

    pub(crate) fn kind(&self, name: &str) -> Option<&FieldKind> {
        self.fields.get(name)
    }

    pub fn field_kind(&self, name: &str) -> Result<&FieldKind, Error> {
        self.kind(name).ok_or_else(|| Error::NoSuchField {
            model: self.singular_name.clone(),
            field: name.to_owned(),
        })
    }

    /// Scalar fields that belong in a selection set.
    ///
    /// Foreign-key shadows of relations (`userId` declared next to a `user`
    /// relation) are redundant on the wire and excluded; the plain `id`
    /// field is not a shadow and stays in.
    pub fn queryable_scalar_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(name, kind)| **kind == FieldKind::Scalar && !is_foreign_key_shadow(name.as_str()))
            .map(|(name, _)| name.as_str())
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &FieldKind)> {
        self.fields()
            .filter(|(_, kind)| kind.is_relation())
    }
}

fn is_foreign_key_shadow(name: &str) -> bool {
    name.len() > 2 && name.ends_with("Id")
}

/// Lookup of all registered models, keyed by singular name.
///
/// Built once from the host store's entity list and read-only afterwards, so
/// it is safe to share across concurrent operations without synchronization.
pub struct ModelRegistry {
    models: IndexMap<String, ModelDescriptor>,
    inflect: Arc<dyn Inflect>,
}

impl ModelRegistry {
    pub fn new(schemas: Vec<EntitySchema>) -> Self {
        Self::with_inflector(schemas, Arc::new(EnglishInflection))
    }

    pub fn with_inflector(schemas: Vec<EntitySchema>, inflect: Arc<dyn Inflect>) -> Self {
        let models = schemas
            .into_iter()
            .map(|schema| {
                let model = ModelDescriptor::new(schema, inflect.as_ref());
                (model.singular_name.clone(), model)
            })
            .collect();
        Self { models, inflect }
    }

    /// Looks a model up by singular or plural name.
    pub fn model(&self, name: &str) -> Result<&ModelDescriptor, Error> {
        if let Some(model) = self.models.get(name) {
            return Ok(model);
        }
        let singular = self.inflect.singularize(name).to_camel_case();
        self.models
            .get(&singular)
            .ok_or_else(|| Error::NoSuchModel(name.to_owned()))
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.values()
    }

    pub fn inflector(&self) -> &Arc<dyn Inflect> {
        &self.inflect
    }
}
