//! Conditional branch resolution.
//!
//! Conditionals are resolved against the data object that owns them: the
//! trigger field is looked up by name in that object, the first branch whose
//! predicate matches is selected, and its extra schema is merged into the
//! declared object to form the effective schema.

use tracing::trace;

use crate::path::{FieldPath, PathSegment};
use crate::schema::{Branch, ConditionalNode, ObjectNode, SchemaNode};
use crate::value::DataValue;

static NULL: DataValue = DataValue::Null;

/// Select the active branch of `node` for the enclosing object `data`.
///
/// An absent or null trigger ("not yet answered") and a value matching no
/// predicate both select nothing.
pub fn select_branch<'a>(node: &'a ConditionalNode, data: &DataValue) -> Option<(usize, &'a Branch)> {
    let value = data.get_present(node.trigger_field())?;
    let selected = node
        .branches()
        .iter()
        .enumerate()
        .find(|(_, branch)| branch.predicate().matches(value));

    if let Some((idx, branch)) = selected {
        trace!(trigger = node.trigger_field(), branch = idx, predicate = %branch.predicate(), "branch selected");
    }
    selected
}

/// Extra schema contributed by `node` for `data`; empty when no branch applies.
pub fn resolve(node: &ConditionalNode, data: &DataValue) -> ObjectNode {
    select_branch(node, data)
        .map(|(_, branch)| effective_object(branch.extra_schema(), data))
        .unwrap_or_else(ObjectNode::empty)
}

/// Union `extra` into `base`: same-named properties are replaced in place,
/// new ones appended, required sets unioned.
pub fn merge(base: &mut ObjectNode, extra: ObjectNode) {
    for (name, node) in extra.properties {
        match base.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = node,
            None => base.properties.push((name, node)),
        }
    }
    base.required.extend(extra.required);
}

/// The declared object with every applicable branch merged in.
///
/// The result carries no conditionals of its own; nested objects are left
/// as declared (see [`effective_schema`] for the deep form).
pub fn effective_object(object: &ObjectNode, data: &DataValue) -> ObjectNode {
    let mut merged = ObjectNode {
        title: object.title.clone(),
        properties: object.properties.clone(),
        required: object.required.clone(),
        dependencies: Vec::new(),
    };

    for dependency in object.dependencies() {
        if let Some((_, branch)) = select_branch(dependency, data) {
            merge(&mut merged, effective_object(branch.extra_schema(), data));
        }
    }

    merged
}

fn effective_shallow(node: &SchemaNode, data: &DataValue) -> SchemaNode {
    match node {
        SchemaNode::Object(o) => SchemaNode::Object(effective_object(o, data)),
        SchemaNode::Conditional(c) => SchemaNode::Object(resolve(c, data)),
        other => other.clone(),
    }
}

/// Effective schema of `node` for `data`, resolving nested objects against
/// their sub-objects.
///
/// Repeating groups keep their declared item schema because each entry may
/// resolve differently; use [`effective_at`] for a single entry.
pub fn effective_schema(node: &SchemaNode, data: &DataValue) -> SchemaNode {
    match effective_shallow(node, data) {
        SchemaNode::Object(mut object) => {
            for (name, prop) in object.properties.iter_mut() {
                if matches!(prop, SchemaNode::Object(_)) {
                    let sub = data.get(name).unwrap_or(&NULL);
                    *prop = effective_schema(prop, sub);
                }
            }
            SchemaNode::Object(object)
        }
        other => other,
    }
}

/// Effective schema of the field at `path`, resolving each level against the
/// data found there. `None` when the path leaves the schema.
pub fn effective_at(root: &SchemaNode, data: &DataValue, path: &FieldPath) -> Option<SchemaNode> {
    let mut node = effective_shallow(root, data);
    let mut value = data;

    for segment in path.segments() {
        let (child, child_value) = match (&node, segment) {
            (SchemaNode::Object(o), PathSegment::Property(name)) => {
                (o.property(name)?, value.get(name).unwrap_or(&NULL))
            }
            (SchemaNode::Array(a), PathSegment::Index(idx)) => (
                a.items(),
                value.as_array().and_then(|items| items.get(*idx)).unwrap_or(&NULL),
            ),
            _ => return None,
        };
        let next = effective_shallow(child, child_value);
        node = next;
        value = child_value;
    }

    Some(effective_schema(&node, value))
}
