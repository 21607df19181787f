//! Rendering of argument maps into the textual forms a document needs:
//! parameter declarations, variable references at the call site, or inline
//! literals.

use itertools::Itertools as _;
use serde_json::{Map, Value};

/// Key marking an object-typed argument with the entity type it represents.
/// Drives the `<Entity>Input` signature type and never reaches the wire.
pub const TYPE_TAG: &str = "__type";

/// How an argument map is rendered at a given position in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentMode {
    /// Parameter declarations, e.g. `($name: String!)`.
    Signature,
    /// Call-site references to declared variables, e.g. `(name: $name)`.
    VariableRef,
    /// Inline literal values, e.g. `(name: "Charlie Brown")`.
    Literal,
}

/// Renders an argument clause, parenthesized only when at least one entry
/// was emitted.
///
/// List-valued arguments are always skipped: relations and connections are
/// never passed as direct arguments. The reserved `id` argument is skipped
/// unless `allow_id` is set; the builder handles `id` specially for inline
/// field arguments.
pub fn render(args: &Map<String, Value>, mode: ArgumentMode, allow_id: bool) -> String {
    let rendered = args
        .iter()
        .filter(|(name, value)| renderable(name, value, allow_id))
        .map(|(name, value)| match mode {
            ArgumentMode::Signature => format!("${name}: {}!", signature_type(name, value)),
            ArgumentMode::VariableRef => format!("{name}: ${name}"),
            ArgumentMode::Literal => format!("{name}: {}", literal(value)),
        })
        .join(", ");

    parenthesize(rendered)
}

/// Renders the argument map as a `filter` input object whose fields
/// reference previously declared variables: `(filter: {active: $active})`.
pub fn render_filter(args: &Map<String, Value>) -> String {
    let rendered = args
        .iter()
        .filter(|(name, value)| renderable(name, value, true))
        .map(|(name, _)| format!("{name}: ${name}"))
        .join(", ");

    if rendered.is_empty() {
        String::new()
    } else {
        format!("(filter: {{{rendered}}})")
    }
}

/// Variables as actually sent alongside the document: list values stay out
/// and type tags are stripped.
pub fn to_variables(args: &Map<String, Value>) -> Map<String, Value> {
    args.iter()
        .filter(|(_, value)| !value.is_array() && !value.is_null())
        .map(|(name, value)| (name.clone(), strip_type_tags(value)))
        .collect()
}

pub(crate) fn strip_type_tags(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != TYPE_TAG)
                .map(|(key, value)| (key.clone(), strip_type_tags(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_type_tags).collect()),
        other => other.clone(),
    }
}

fn renderable(name: &str, value: &Value, allow_id: bool) -> bool {
    !value.is_array() && !value.is_null() && (allow_id || name != "id")
}

/// The declared GraphQL type of one argument: `ID` for ids, `<Entity>Input`
/// for type-tagged objects, `Number` for numeric values, `String` otherwise.
fn signature_type(name: &str, value: &Value) -> String {
    if name == "id" {
        return "ID".to_owned();
    }
    match value {
        Value::Object(map) => match map.get(TYPE_TAG).and_then(Value::as_str) {
            Some(tag) => format!("{tag}Input"),
            None => "String".to_owned(),
        },
        Value::Number(_) => "Number".to_owned(),
        _ => "String".to_owned(),
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Object(_) => {
            serde_json::to_string(&strip_type_tags(value)).unwrap_or_else(|_| "{}".to_owned())
        }
        Value::Number(number) => number.to_string(),
        Value::String(text) => format!("{text:?}"),
        other => format!("\"{other}\""),
    }
}

fn parenthesize(rendered: String) -> String {
    if rendered.is_empty() {
        rendered
    } else {
        format!("({rendered})")
    }
}
