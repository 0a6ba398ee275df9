//! Form document validation.
//!
//! Validation walks the schema depth-first and collects every violation; it
//! never stops at the first one. Objects are always checked against their
//! effective schema, so required fields contributed by an active branch are
//! enforced and those of inactive branches are not.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::path::{FieldPath, PathSegment};
use crate::resolver;
use crate::schema::{ArrayNode, ObjectNode, PrimitiveKind, PrimitiveNode, SchemaNode};
use crate::value::DataValue;

static EMPTY_OBJECT: DataValue = DataValue::Object(BTreeMap::new());

/// Kind of violation found in a form document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TypeMismatch,
    PatternMismatch,
    EnumMismatch,
    RangeViolation,
    MissingRequired,
    TooFewItems,
}

/// A single field-level violation, rendered inline by the form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{field_path}: {message}")]
pub struct ValidationError {
    pub field_path: FieldPath,
    pub kind: ErrorKind,
    pub message: String,
}

impl ValidationError {
    fn new(field_path: &FieldPath, kind: ErrorKind, message: String) -> Self {
        Self {
            field_path: field_path.clone(),
            kind,
            message,
        }
    }
}

/// Validate `value` against `schema`; the returned errors carry paths
/// relative to `path`.
pub fn validate(schema: &SchemaNode, value: &DataValue, path: &FieldPath) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    check_node(schema, value, path, &mut errors);
    errors
}

/// Validate a whole form document.
pub fn validate_document(schema: &SchemaNode, value: &DataValue) -> Vec<ValidationError> {
    validate(schema, value, &FieldPath::root())
}

fn label(node: Option<&SchemaNode>, path: &FieldPath) -> String {
    if let Some(title) = node.and_then(|n| n.title()) {
        return title.to_string();
    }
    match path.last() {
        Some(PathSegment::Property(name)) => name.clone(),
        Some(PathSegment::Index(idx)) => format!("Entry {}", idx + 1),
        None => "Form".to_string(),
    }
}

fn check_node(schema: &SchemaNode, value: &DataValue, path: &FieldPath, errors: &mut Vec<ValidationError>) {
    match schema {
        SchemaNode::Primitive(p) => check_primitive(schema, p, value, path, errors),
        SchemaNode::Array(a) => check_array(schema, a, value, path, errors),
        SchemaNode::Object(o) => {
            if let Some(value) = object_value(value, path, errors) {
                check_object(&resolver::effective_object(o, value), value, path, errors);
            }
        }
        SchemaNode::Conditional(c) => {
            if let Some(value) = object_value(value, path, errors) {
                check_object(&resolver::resolve(c, value), value, path, errors);
            }
        }
    }
}

/// Objects accept null as "nothing entered yet".
fn object_value<'a>(
    value: &'a DataValue,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a DataValue> {
    match value {
        DataValue::Null => Some(&EMPTY_OBJECT),
        DataValue::Object(_) => Some(value),
        other => {
            errors.push(ValidationError::new(
                path,
                ErrorKind::TypeMismatch,
                format!("expected an object, found {}", other.kind_name()),
            ));
            None
        }
    }
}

fn check_object(object: &ObjectNode, value: &DataValue, path: &FieldPath, errors: &mut Vec<ValidationError>) {
    for (name, prop) in object.properties() {
        let prop_path = path.push_property(name);
        match value.get_present(name) {
            Some(prop_value) => check_node(prop, prop_value, &prop_path, errors),
            None if object.is_required(name) => errors.push(ValidationError::new(
                &prop_path,
                ErrorKind::MissingRequired,
                format!("{} is required", label(Some(prop), &prop_path)),
            )),
            None => {}
        }
    }

    // Requirements on properties declared by an enclosing object
    for name in object.required() {
        if object.property(name).is_none() && value.get_present(name).is_none() {
            let prop_path = path.push_property(name);
            errors.push(ValidationError::new(
                &prop_path,
                ErrorKind::MissingRequired,
                format!("{} is required", name),
            ));
        }
    }
}

fn check_array(
    schema: &SchemaNode,
    array: &ArrayNode,
    value: &DataValue,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    let items = match value {
        DataValue::Null => return,
        DataValue::Array(items) => items,
        other => {
            errors.push(ValidationError::new(
                path,
                ErrorKind::TypeMismatch,
                format!("expected an array, found {}", other.kind_name()),
            ));
            return;
        }
    };

    if let Some(min) = array.min_items() {
        if items.len() < min {
            errors.push(ValidationError::new(
                path,
                ErrorKind::TooFewItems,
                format!(
                    "{} needs at least {} entries, found {}",
                    label(Some(schema), path),
                    min,
                    items.len()
                ),
            ));
        }
    }

    for (idx, item) in items.iter().enumerate() {
        check_node(array.items(), item, &path.push_index(idx), errors);
    }
}

fn check_primitive(
    schema: &SchemaNode,
    primitive: &PrimitiveNode,
    value: &DataValue,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    if value.is_null() {
        return;
    }

    let name = || label(Some(schema), path);

    if !primitive.kind().accepts(value) {
        errors.push(ValidationError::new(
            path,
            ErrorKind::TypeMismatch,
            format!("expected a {}, found {}", primitive.kind().type_name(), value.kind_name()),
        ));
        return;
    }

    if let (Some(pattern), Some(text)) = (primitive.pattern(), value.as_str()) {
        if !pattern.is_match(text) {
            errors.push(ValidationError::new(
                path,
                ErrorKind::PatternMismatch,
                format!("{} does not match the expected format", name()),
            ));
        }
    }

    if let Some(values) = primitive.enum_values() {
        if !values.iter().any(|lit| lit.matches(value)) {
            let allowed: Vec<String> = values
                .iter()
                .map(|lit| match lit {
                    crate::schema::Literal::String(s) => s.clone(),
                    crate::schema::Literal::Number(n) => n.to_string(),
                })
                .collect();
            errors.push(ValidationError::new(
                path,
                ErrorKind::EnumMismatch,
                format!("{} must be one of: {}", name(), allowed.join(", ")),
            ));
        }
    }

    if primitive.kind() == PrimitiveKind::Number {
        if let Some(n) = value.as_f64() {
            if let Some(min) = primitive.minimum() {
                if n < min {
                    errors.push(ValidationError::new(
                        path,
                        ErrorKind::RangeViolation,
                        format!("{} must be at least {}", name(), min),
                    ));
                }
            }
            if let Some(max) = primitive.maximum() {
                if n > max {
                    errors.push(ValidationError::new(
                        path,
                        ErrorKind::RangeViolation,
                        format!("{} must be at most {}", name(), max),
                    ));
                }
            }
        }
    }
}
