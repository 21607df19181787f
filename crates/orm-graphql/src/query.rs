//! Assembly of query and mutation documents from model descriptors.
//!
//! Documents are rendered into an indent-tracking buffer and validated by
//! parsing before they are handed to a transport; a parse failure surfaces
//! as [`Error::MalformedQuery`] with the offending text attached.

use std::fmt::Write as _;

use inflector::Inflector as _;
use serde_json::{Map, Value};

use crate::{
    arguments::{self, ArgumentMode},
    error::Error,
    model::{FieldKind, ModelDescriptor, ModelRegistry},
};

macro_rules! indent_write {
    ($dst:ident, $($arg:tt)*) => {{
        $dst.write_indent();
        write!($dst, $($arg)*)
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

/// The mutation verbs the builder knows field-naming conventions for.
/// Anything else goes through [`QueryBuilder::build_custom_mutation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    Create,
    Update,
    Delete,
}

impl MutationAction {
    fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// A generated unit of work, ready to hand to a transport. Built fresh per
/// invocation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PreparedOperation {
    pub kind: OperationKind,
    pub operation_name: String,
    pub query: String,
    pub variables: Map<String, Value>,
}

pub struct QueryBuilder<'a> {
    registry: &'a ModelRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a ModelRegistry) -> Self {
        Self { registry }
    }

    /// Builds a fetch document for a model.
    ///
    /// A filter carrying an `id` selects the single-record form keyed by id;
    /// any other filter becomes a `filter` input object referencing one
    /// variable per entry; no filter fetches the whole connection.
    pub fn build_query(
        &self,
        model_name: &str,
        filter: Option<&Map<String, Value>>,
    ) -> Result<PreparedOperation, Error> {
        let model = self.registry.model(model_name)?;

        let mut buffer = Buffer::default();
        buffer.indent = 1;
        let mut path = vec![model.singular_name().to_owned()];
        let mut variables = Map::new();

        let (operation_name, signature) = match filter {
            Some(filter) if filter.contains_key("id") => {
                variables.insert("id".to_owned(), arguments::strip_type_tags(&filter["id"]));
                self.write_field(&mut buffer, model, model.singular_name(), None, false, "(id: $id)", &mut path)?;
                (model.type_name(), "($id: ID!)".to_owned())
            }
            Some(filter) => {
                variables = arguments::to_variables(filter);
                let clause = arguments::render_filter(filter);
                self.write_field(&mut buffer, model, model.plural_name(), None, true, &clause, &mut path)?;
                (
                    model.plural_name().to_pascal_case(),
                    arguments::render(filter, ArgumentMode::Signature, true),
                )
            }
            None => {
                self.write_field(&mut buffer, model, model.plural_name(), None, true, "", &mut path)?;
                (model.plural_name().to_pascal_case(), String::new())
            }
        };

        let query = assemble(OperationKind::Query, &operation_name, &signature, &buffer)?;
        validated(PreparedOperation {
            kind: OperationKind::Query,
            operation_name,
            query,
            variables,
        })
    }

    /// Builds a create/update/delete mutation for a model.
    ///
    /// The signature is declared from the argument map, the call site
    /// references the declared variables, and the result selection is
    /// limited to the model's scalar fields.
    pub fn build_mutation(
        &self,
        model_name: &str,
        action: MutationAction,
        args: &Map<String, Value>,
    ) -> Result<PreparedOperation, Error> {
        let model = self.registry.model(model_name)?;
        let field_name = format!("{}{}", action.verb(), model.type_name());
        self.named_mutation(model, &field_name, args)
    }

    /// Builds an arbitrary named mutation. The field signature and call are
    /// driven entirely by the supplied argument map; only scalar result
    /// fields of the target model are requested back.
    pub fn build_custom_mutation(
        &self,
        model_name: &str,
        mutation_name: &str,
        args: &Map<String, Value>,
    ) -> Result<PreparedOperation, Error> {
        let model = self.registry.model(model_name)?;
        self.named_mutation(model, mutation_name, args)
    }

    fn named_mutation(
        &self,
        model: &ModelDescriptor,
        field_name: &str,
        args: &Map<String, Value>,
    ) -> Result<PreparedOperation, Error> {
        let operation_name = field_name.to_pascal_case();
        let signature = arguments::render(args, ArgumentMode::Signature, true);
        let call = arguments::render(args, ArgumentMode::VariableRef, true);

        let mut buffer = Buffer::default();
        buffer.indent = 1;
        indent_write!(buffer, "{field_name}{call} {{\n")?;
        buffer.indent += 1;
        for field in model.queryable_scalar_fields() {
            indent_write!(buffer, "{field}\n")?;
        }
        buffer.indent -= 1;
        indent_write!(buffer, "}}\n")?;

        let query = assemble(OperationKind::Mutation, &operation_name, &signature, &buffer)?;
        validated(PreparedOperation {
            kind: OperationKind::Mutation,
            operation_name,
            query,
            variables: arguments::to_variables(args),
        })
    }

    /// Renders `name(args) { scalars relations }`; connection fields wrap
    /// the body in a `nodes` block.
    ///
    /// `path` holds the models already traversed, root first; relations
    /// targeting any of them are not re-entered.
    #[allow(clippy::too_many_arguments)]
    fn write_field(
        &self,
        buffer: &mut Buffer,
        model: &ModelDescriptor,
        name: &str,
        alias: Option<&str>,
        multiple: bool,
        args_clause: &str,
        path: &mut Vec<String>,
    ) -> Result<(), Error> {
        match alias {
            Some(alias) => indent_write!(buffer, "{alias}: {name}{args_clause} {{\n")?,
            None => indent_write!(buffer, "{name}{args_clause} {{\n")?,
        }
        buffer.indent += 1;
        if multiple {
            indent_write!(buffer, "nodes {{\n")?;
            buffer.indent += 1;
        }

        for field in model.queryable_scalar_fields() {
            indent_write!(buffer, "{field}\n")?;
        }
        self.write_relations(buffer, model, path)?;

        if multiple {
            buffer.indent -= 1;
            indent_write!(buffer, "}}\n")?;
        }
        buffer.indent -= 1;
        indent_write!(buffer, "}}\n")?;
        Ok(())
    }

    /// One nested block per relation of `model`, skipping any relation that
    /// would re-enter a model already on the traversal path.
    fn write_relations(
        &self,
        buffer: &mut Buffer,
        model: &ModelDescriptor,
        path: &mut Vec<String>,
    ) -> Result<(), Error> {
        for (field_name, kind) in model.relations() {
            let (related_name, multiple) = match kind {
                FieldKind::ToOne { related } => (related, false),
                FieldKind::ToMany { related } => (related, true),
                FieldKind::Scalar => continue,
            };
            let related = self.registry.model(related_name)?;
            if path.iter().any(|entry| entry == related.singular_name()) {
                continue;
            }

            path.push(related.singular_name().to_owned());
            self.write_field(buffer, related, field_name, None, multiple, "", path)?;
            path.pop();
        }
        Ok(())
    }
}

fn assemble(
    kind: OperationKind,
    operation_name: &str,
    signature: &str,
    body: &Buffer,
) -> Result<String, Error> {
    let mut query = String::with_capacity(body.len() + 32);
    write!(query, "{} {operation_name}{signature} {{\n", kind.keyword())?;
    query.push_str(body);
    query.push_str("}\n");
    Ok(query)
}

/// Every generated document must parse; anything else is a builder bug that
/// gets surfaced with the text attached rather than sent over the wire.
fn validated(operation: PreparedOperation) -> Result<PreparedOperation, Error> {
    if let Err(err) = cynic_parser::parse_executable_document(&operation.query) {
        return Err(Error::MalformedQuery {
            reason: err.to_string(),
            document: operation.query,
        });
    }
    Ok(operation)
}

#[derive(Default)]
struct Buffer {
    inner: String,
    indent: usize,
}

impl std::ops::Deref for Buffer {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::ops::DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl Buffer {
    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.inner.push(' ');
            self.inner.push(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde_json::json;

    use super::*;
    use crate::model::EntitySchema;

    fn registry() -> ModelRegistry {
        ModelRegistry::new(vec![
            EntitySchema::new("User")
                .scalar("id")
                .scalar("name")
                .to_one("profile", "profile")
                .to_many("posts", "post"),
            EntitySchema::new("Profile")
                .scalar("id")
                .scalar("email")
                .scalar("userId")
                .to_one("user", "user"),
            EntitySchema::new("Post")
                .scalar("id")
                .scalar("title")
                .scalar("userId")
                .to_one("user", "user"),
        ])
    }

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test arguments are objects"),
        }
    }

    #[test]
    fn connection_query_without_filter() {
        let registry = registry();
        let operation = QueryBuilder::new(&registry).build_query("users", None).unwrap();

        assert_eq!(operation.kind, OperationKind::Query);
        assert_eq!(operation.operation_name, "Users");
        assert!(operation.variables.is_empty());
        assert_eq!(
            operation.query,
            indoc! {r#"
                query Users {
                  users {
                    nodes {
                      id
                      name
                      profile {
                        id
                        email
                      }
                      posts {
                        nodes {
                          id
                          title
                        }
                      }
                    }
                  }
                }
            "#}
        );
    }

    #[test]
    fn relations_never_reenter_the_root_model() {
        let registry = registry();
        let operation = QueryBuilder::new(&registry).build_query("posts", None).unwrap();

        // `post.user` is expanded once; the `user.posts` connection inside
        // it would point straight back and is suppressed.
        assert_eq!(
            operation.query,
            indoc! {r#"
                query Posts {
                  posts {
                    nodes {
                      id
                      title
                      user {
                        id
                        name
                        profile {
                          id
                          email
                        }
                      }
                    }
                  }
                }
            "#}
        );
    }

    #[test]
    fn filter_with_id_selects_the_single_record_form() {
        let registry = registry();
        let filter = args(json!({"id": 1}));
        let operation = QueryBuilder::new(&registry)
            .build_query("user", Some(&filter))
            .unwrap();

        assert_eq!(operation.operation_name, "User");
        assert_eq!(Value::Object(operation.variables), json!({"id": 1}));
        assert_eq!(
            operation.query,
            indoc! {r#"
                query User($id: ID!) {
                  user(id: $id) {
                    id
                    name
                    profile {
                      id
                      email
                    }
                    posts {
                      nodes {
                        id
                        title
                      }
                    }
                  }
                }
            "#}
        );
    }

    #[test]
    fn filter_without_id_becomes_a_filter_object() {
        let registry = registry();
        let filter = args(json!({"active": true}));
        let operation = QueryBuilder::new(&registry)
            .build_query("users", Some(&filter))
            .unwrap();

        assert_eq!(Value::Object(operation.variables), json!({"active": true}));
        assert!(operation.query.starts_with("query Users($active: String!) {\n"));
        assert!(operation.query.contains("users(filter: {active: $active}) {\n"));
    }

    #[test]
    fn create_mutation() {
        let registry = registry();
        let arguments = args(json!({"user": {"__type": "User", "name": "Snoopy"}}));
        let operation = QueryBuilder::new(&registry)
            .build_mutation("user", MutationAction::Create, &arguments)
            .unwrap();

        assert_eq!(operation.kind, OperationKind::Mutation);
        assert_eq!(operation.operation_name, "CreateUser");
        assert_eq!(
            Value::Object(operation.variables),
            json!({"user": {"name": "Snoopy"}})
        );
        assert_eq!(
            operation.query,
            indoc! {r#"
                mutation CreateUser($user: UserInput!) {
                  createUser(user: $user) {
                    id
                    name
                  }
                }
            "#}
        );
    }

    #[test]
    fn update_mutation_declares_id_and_input() {
        let registry = registry();
        let arguments = args(json!({
            "id": 1,
            "user": {"__type": "User", "name": "Snoopy"}
        }));
        let operation = QueryBuilder::new(&registry)
            .build_mutation("user", MutationAction::Update, &arguments)
            .unwrap();

        assert_eq!(
            operation.query,
            indoc! {r#"
                mutation UpdateUser($id: ID!, $user: UserInput!) {
                  updateUser(id: $id, user: $user) {
                    id
                    name
                  }
                }
            "#}
        );
    }

    #[test]
    fn delete_mutation_references_only_the_id() {
        let registry = registry();
        let arguments = args(json!({"id": 1}));
        let operation = QueryBuilder::new(&registry)
            .build_mutation("user", MutationAction::Delete, &arguments)
            .unwrap();

        assert_eq!(Value::Object(operation.variables), json!({"id": 1}));
        assert_eq!(
            operation.query,
            indoc! {r#"
                mutation DeleteUser($id: ID!) {
                  deleteUser(id: $id) {
                    id
                    name
                  }
                }
            "#}
        );
    }

    #[test]
    fn custom_mutations_follow_the_argument_map() {
        let registry = registry();
        let arguments = args(json!({"token": "abc"}));
        let operation = QueryBuilder::new(&registry)
            .build_custom_mutation("user", "signupUser", &arguments)
            .unwrap();

        assert_eq!(operation.operation_name, "SignupUser");
        assert_eq!(
            operation.query,
            indoc! {r#"
                mutation SignupUser($token: String!) {
                  signupUser(token: $token) {
                    id
                    name
                  }
                }
            "#}
        );
    }

    #[test]
    fn aliased_fields_render_with_their_alias() {
        let registry = registry();
        let builder = QueryBuilder::new(&registry);
        let profile = registry.model("profile").unwrap();

        let mut buffer = Buffer::default();
        let mut path = vec!["profile".to_owned()];
        builder
            .write_field(&mut buffer, profile, "profile", Some("authorProfile"), false, "", &mut path)
            .unwrap();

        assert!(buffer.starts_with("authorProfile: profile {\n"));
    }

    #[test]
    fn unknown_models_propagate() {
        let registry = registry();
        let err = QueryBuilder::new(&registry).build_query("comments", None).unwrap_err();
        assert!(matches!(err, Error::NoSuchModel(_)));
    }

    #[test]
    fn unparseable_documents_are_rejected() {
        let registry = ModelRegistry::new(vec![EntitySchema::new("User")
            .scalar("id")
            .scalar("bad-name")]);
        let err = QueryBuilder::new(&registry).build_query("user", None).unwrap_err();
        assert!(matches!(err, Error::MalformedQuery { .. }));
    }
}
