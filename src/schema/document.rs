//! JSON Schema document support.
//!
//! Form definitions are written in the JSON Schema dialect used by
//! schema-driven form renderers (`type`, `properties`, `required`, `items`,
//! `minItems`, `enum`, `pattern`, `minimum`, `maximum`, `format`,
//! `dependencies` + `oneOf`). Documents are translated into builders and built,
//! so a malformed document fails here rather than during live validation.
//!
//! Inside a `dependencies.<trigger>.oneOf` entry, the schema given for the
//! trigger property is the branch predicate (`minimum` → at least, `maximum` →
//! at most, `enum`/`const` → value in); all other properties are the branch's
//! extra schema.

use serde_json::{json, Map, Value};
use tracing::warn;

use super::{
    ArrayBuilder, DependencyBuilder, GroupOptions, Literal, NodeBuilder, ObjectBuilder, ObjectNode,
    Predicate, PrimitiveBuilder, PrimitiveKind, SchemaError, SchemaNode,
};

// ============================================================================
// Parsing
// ============================================================================

/// Parse a document whose root is an object schema.
pub fn parse_object(doc: &Value) -> Result<ObjectNode, SchemaError> {
    parse_object_builder(doc, "")?.build()
}

/// Parse a document describing any node.
pub fn parse_node(doc: &Value) -> Result<SchemaNode, SchemaError> {
    parse_builder(doc, "")?.build()
}

fn location_of(location: &str) -> String {
    if location.is_empty() {
        "<root>".to_string()
    } else {
        location.to_string()
    }
}

fn unsupported(location: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::Unsupported {
        location: location_of(location),
        reason: reason.into(),
    }
}

fn as_map<'a>(value: &'a Value, location: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| unsupported(location, format!("expected a schema object, found {}", value)))
}

fn parse_builder(value: &Value, location: &str) -> Result<NodeBuilder, SchemaError> {
    let map = as_map(value, location)?;

    for keyword in ["$ref", "anyOf", "allOf", "not", "if"] {
        if map.contains_key(keyword) {
            return Err(unsupported(location, format!("keyword '{}'", keyword)));
        }
    }

    let type_str = match map.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(other) => return Err(unsupported(location, format!("type {}", other))),
        None if map.contains_key("properties") => "object",
        None if map.contains_key("items") => "array",
        None => return Err(unsupported(location, "missing 'type'")),
    };

    match type_str {
        "string" => parse_primitive(map, PrimitiveKind::String, location).map(NodeBuilder::from),
        "number" | "integer" => parse_primitive(map, PrimitiveKind::Number, location).map(NodeBuilder::from),
        "object" => parse_object_builder(value, location).map(NodeBuilder::from),
        "array" => parse_array(map, location).map(NodeBuilder::from),
        other => Err(unsupported(location, format!("type '{}'", other))),
    }
}

fn parse_primitive(
    map: &Map<String, Value>,
    kind: PrimitiveKind,
    location: &str,
) -> Result<PrimitiveBuilder, SchemaError> {
    let mut builder = PrimitiveBuilder::new(kind);

    if let Some(title) = map.get("title").and_then(|v| v.as_str()) {
        builder = builder.title(title);
    }
    if let Some(pattern) = map.get("pattern") {
        let pattern = pattern
            .as_str()
            .ok_or_else(|| unsupported(location, "'pattern' must be a string"))?;
        builder = builder.pattern(pattern);
    }
    if let Some(values) = map.get("enum") {
        builder = builder.enum_values(parse_literals(values, location)?);
    }
    if let Some(minimum) = map.get("minimum") {
        builder = builder.minimum(number_of(minimum, "minimum", location)?);
    }
    if let Some(maximum) = map.get("maximum") {
        builder = builder.maximum(number_of(maximum, "maximum", location)?);
    }
    if let Some(format) = map.get("format").and_then(|v| v.as_str()) {
        builder = builder.format(format);
    }
    if map.contains_key("dependencies") {
        warn!(location = %location_of(location), "ignoring 'dependencies' on a non-object schema");
    }

    Ok(builder)
}

fn parse_array(map: &Map<String, Value>, location: &str) -> Result<ArrayBuilder, SchemaError> {
    let items = map
        .get("items")
        .ok_or_else(|| unsupported(location, "array without 'items'"))?;
    let mut builder = ArrayBuilder::new(parse_builder(items, &format!("{}[]", location))?);

    if let Some(title) = map.get("title").and_then(|v| v.as_str()) {
        builder = builder.title(title);
    }
    if let Some(min_items) = map.get("minItems") {
        let n = min_items.as_i64().ok_or_else(|| SchemaError::InvalidMinItems {
            location: location_of(location),
            value: min_items.to_string(),
            max: super::builder::MAX_MIN_ITEMS,
        })?;
        builder = builder.min_items(n);
    }
    if let Some(options) = map.get("ui:options") {
        builder = builder.options(parse_group_options(options, location)?);
    }

    Ok(builder)
}

fn parse_group_options(value: &Value, location: &str) -> Result<GroupOptions, SchemaError> {
    let map = as_map(value, location)?;
    let mut options = GroupOptions::default();
    for (key, slot) in [
        ("addable", &mut options.addable),
        ("removable", &mut options.removable),
        ("orderable", &mut options.orderable),
    ] {
        if let Some(flag) = map.get(key) {
            *slot = flag
                .as_bool()
                .ok_or_else(|| unsupported(location, format!("'ui:options.{}' must be a boolean", key)))?;
        }
    }
    Ok(options)
}

fn parse_object_builder(value: &Value, location: &str) -> Result<ObjectBuilder, SchemaError> {
    let map = as_map(value, location)?;
    let mut builder = ObjectBuilder::new();

    if let Some(title) = map.get("title").and_then(|v| v.as_str()) {
        builder = builder.title(title);
    }

    if let Some(props) = map.get("properties") {
        for (name, prop_schema) in as_map(props, location)? {
            builder = builder.property(name.clone(), parse_builder(prop_schema, &child(location, name))?);
        }
    }

    builder = builder.required(parse_required(map, location)?);

    if let Some(deps) = map.get("dependencies") {
        for (trigger, dep_schema) in as_map(deps, location)? {
            builder = builder.dependency(parse_dependency(trigger, dep_schema, location)?);
        }
    }

    Ok(builder)
}

fn parse_required(map: &Map<String, Value>, location: &str) -> Result<Vec<String>, SchemaError> {
    match map.get("required") {
        None => Ok(Vec::new()),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(String::from)
                    .ok_or_else(|| unsupported(location, format!("required entry {} is not a string", n)))
            })
            .collect(),
        Some(other) => Err(unsupported(location, format!("'required' must be an array, found {}", other))),
    }
}

fn parse_dependency(trigger: &str, value: &Value, location: &str) -> Result<DependencyBuilder, SchemaError> {
    let dep_location = child(location, &format!("dependencies.{}", trigger));
    let map = as_map(value, &dep_location)?;
    let one_of = map
        .get("oneOf")
        .and_then(|v| v.as_array())
        .ok_or_else(|| unsupported(&dep_location, "dependency must be a 'oneOf' list"))?;

    let mut dependency = DependencyBuilder::on(trigger);
    for (idx, entry) in one_of.iter().enumerate() {
        let entry_location = format!("{}.oneOf[{}]", dep_location, idx);
        let entry_map = as_map(entry, &entry_location)?;
        let props = match entry_map.get("properties") {
            Some(props) => as_map(props, &entry_location)?.clone(),
            None => Map::new(),
        };

        let trigger_schema = props.get(trigger).ok_or_else(|| SchemaError::InvalidPredicate {
            location: entry_location.clone(),
            reason: format!("branch does not constrain '{}'", trigger),
        })?;
        let predicate = parse_predicate(trigger_schema, &entry_location)?;

        let mut extra = entry_map.clone();
        let mut extra_props = props;
        extra_props.remove(trigger);
        extra.insert("properties".to_string(), Value::Object(extra_props));
        extra.remove("type");

        dependency = dependency.branch(predicate, parse_object_builder(&Value::Object(extra), &entry_location)?);
    }

    Ok(dependency)
}

fn parse_predicate(value: &Value, location: &str) -> Result<Predicate, SchemaError> {
    let map = as_map(value, location)?;

    if let Some(values) = map.get("enum") {
        return Ok(Predicate::ValueIn(parse_literals(values, location)?));
    }
    if let Some(constant) = map.get("const") {
        return Ok(Predicate::ValueIn(vec![parse_literal(constant, location)?]));
    }

    match (map.get("minimum"), map.get("maximum")) {
        (Some(min), None) => Ok(Predicate::ValueAtLeast(number_of(min, "minimum", location)?)),
        (None, Some(max)) => Ok(Predicate::ValueAtMost(number_of(max, "maximum", location)?)),
        (Some(_), Some(_)) => Err(SchemaError::InvalidPredicate {
            location: location.to_string(),
            reason: "bounded ranges are not supported; split into at-most/at-least branches".to_string(),
        }),
        (None, None) => Err(SchemaError::InvalidPredicate {
            location: location.to_string(),
            reason: "trigger schema needs 'minimum', 'maximum', 'enum' or 'const'".to_string(),
        }),
    }
}

fn parse_literals(value: &Value, location: &str) -> Result<Vec<Literal>, SchemaError> {
    value
        .as_array()
        .ok_or_else(|| unsupported(location, "'enum' must be an array"))?
        .iter()
        .map(|v| parse_literal(v, location))
        .collect()
}

fn parse_literal(value: &Value, location: &str) -> Result<Literal, SchemaError> {
    match value {
        Value::String(s) => Ok(Literal::String(s.clone())),
        Value::Number(n) => n
            .as_f64()
            .map(Literal::Number)
            .ok_or_else(|| unsupported(location, format!("literal {} out of range", n))),
        other => Err(unsupported(location, format!("literal {} must be a string or number", other))),
    }
}

fn number_of(value: &Value, keyword: &str, location: &str) -> Result<f64, SchemaError> {
    value
        .as_f64()
        .ok_or_else(|| unsupported(location, format!("'{}' must be a number", keyword)))
}

fn child(location: &str, name: &str) -> String {
    if location.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", location, name)
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a schema node as a JSON Schema document.
pub fn to_json_schema(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::Primitive(p) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!(p.kind().type_name()));
            if let Some(title) = p.title() {
                obj.insert("title".to_string(), json!(title));
            }
            if let Some(pattern) = p.pattern() {
                obj.insert("pattern".to_string(), json!(pattern.as_str()));
            }
            if let Some(values) = p.enum_values() {
                obj.insert("enum".to_string(), literals_to_json(values));
            }
            if let Some(minimum) = p.minimum() {
                obj.insert("minimum".to_string(), json!(minimum));
            }
            if let Some(maximum) = p.maximum() {
                obj.insert("maximum".to_string(), json!(maximum));
            }
            if let Some(format) = p.format() {
                obj.insert("format".to_string(), json!(format));
            }
            Value::Object(obj)
        }
        SchemaNode::Object(o) => object_to_json(o),
        SchemaNode::Array(a) => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!("array"));
            if let Some(title) = a.title() {
                obj.insert("title".to_string(), json!(title));
            }
            obj.insert("items".to_string(), to_json_schema(a.items()));
            if let Some(min) = a.min_items() {
                obj.insert("minItems".to_string(), json!(min));
            }
            if a.options() != GroupOptions::default() {
                obj.insert("ui:options".to_string(), json!(a.options()));
            }
            Value::Object(obj)
        }
        SchemaNode::Conditional(c) => {
            let mut deps = Map::new();
            deps.insert(c.trigger_field().to_string(), conditional_to_json(c));
            json!({ "dependencies": deps })
        }
    }
}

fn object_to_json(o: &ObjectNode) -> Value {
    let mut obj = Map::new();
    obj.insert("type".to_string(), json!("object"));
    if let Some(title) = o.title() {
        obj.insert("title".to_string(), json!(title));
    }

    let mut props = Map::new();
    for (name, prop) in o.properties() {
        props.insert(name.to_string(), to_json_schema(prop));
    }
    obj.insert("properties".to_string(), Value::Object(props));

    if !o.required().is_empty() {
        obj.insert("required".to_string(), json!(o.required()));
    }

    if !o.dependencies().is_empty() {
        let mut deps = Map::new();
        for c in o.dependencies() {
            deps.insert(c.trigger_field().to_string(), conditional_to_json(c));
        }
        obj.insert("dependencies".to_string(), Value::Object(deps));
    }

    Value::Object(obj)
}

fn conditional_to_json(c: &super::ConditionalNode) -> Value {
    let entries: Vec<Value> = c
        .branches()
        .iter()
        .map(|branch| {
            let mut entry = object_to_json(branch.extra_schema());
            if let Some(entry_map) = entry.as_object_mut() {
                entry_map.remove("type");
                if let Some(Value::Object(props)) = entry_map.get_mut("properties") {
                    props.insert(c.trigger_field().to_string(), predicate_to_json(branch.predicate()));
                }
            }
            entry
        })
        .collect();
    json!({ "oneOf": entries })
}

fn predicate_to_json(predicate: &Predicate) -> Value {
    match predicate {
        Predicate::ValueAtMost(n) => json!({ "maximum": n }),
        Predicate::ValueAtLeast(n) => json!({ "minimum": n }),
        Predicate::ValueIn(values) => json!({ "enum": literals_to_json(values) }),
    }
}

fn literals_to_json(values: &[Literal]) -> Value {
    Value::Array(
        values
            .iter()
            .map(|lit| match lit {
                Literal::Number(n) => json!(n),
                Literal::String(s) => json!(s),
            })
            .collect(),
    )
}
