//! Form schema model.
//!
//! A schema is a tree of [`SchemaNode`]s: primitive fields, objects, repeating
//! groups (arrays) and conditional sections. Trees are assembled through the
//! validating builders in [`builder`] (or parsed from a document by
//! [`document`]) and are immutable afterwards.

pub mod builder;
pub mod document;
mod error;

pub use builder::{ArrayBuilder, DependencyBuilder, NodeBuilder, ObjectBuilder, PrimitiveBuilder};
pub use error::SchemaError;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::path::PathSegment;
use crate::value::DataValue;

// ============================================================================
// Nodes
// ============================================================================

/// A node of a form schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(PrimitiveNode),
    Object(ObjectNode),
    Array(ArrayNode),
    /// Conditional section; only meaningful in the context of an enclosing object.
    Conditional(ConditionalNode),
}

/// Scalar field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
}

impl PrimitiveKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
        }
    }

    pub fn accepts(&self, value: &DataValue) -> bool {
        matches!(
            (self, value),
            (PrimitiveKind::String, DataValue::String(_)) | (PrimitiveKind::Number, DataValue::Number(_))
        )
    }
}

/// Literal value allowed by an `enum` constraint or a `ValueIn` predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    String(String),
}

impl Literal {
    pub fn matches(&self, value: &DataValue) -> bool {
        match (self, value) {
            (Literal::Number(n), DataValue::Number(v)) => n == v,
            (Literal::String(s), DataValue::String(v)) => s == v,
            _ => false,
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Literal::Number(_) => PrimitiveKind::Number,
            Literal::String(_) => PrimitiveKind::String,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::String(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

/// Compiled regular expression, compared by its source text
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub(crate) fn new(source: String, regex: Regex) -> Self {
        Self { source, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Scalar field with its constraints
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveNode {
    pub(crate) kind: PrimitiveKind,
    pub(crate) title: Option<String>,
    pub(crate) pattern: Option<Pattern>,
    pub(crate) enum_values: Option<Vec<Literal>>,
    pub(crate) minimum: Option<f64>,
    pub(crate) maximum: Option<f64>,
    pub(crate) format: Option<String>,
}

impl PrimitiveNode {
    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn pattern(&self) -> Option<&Pattern> {
        self.pattern.as_ref()
    }

    pub fn enum_values(&self) -> Option<&[Literal]> {
        self.enum_values.as_deref()
    }

    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    /// Opaque format tag such as `data-url`; carried for the renderer, never checked.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }
}

/// Object with ordered properties, a required set and conditional sections
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectNode {
    pub(crate) title: Option<String>,
    pub(crate) properties: Vec<(String, SchemaNode)>,
    pub(crate) required: BTreeSet<String>,
    pub(crate) dependencies: Vec<ConditionalNode>,
}

impl ObjectNode {
    /// An object that declares nothing; the result of an unmatched conditional.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Properties in display order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.properties.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.contains(name)
    }

    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    pub fn dependencies(&self) -> &[ConditionalNode] {
        &self.dependencies
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.required.is_empty() && self.dependencies.is_empty()
    }
}

/// Which structural edits a repeating group permits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    pub addable: bool,
    pub removable: bool,
    pub orderable: bool,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            addable: true,
            removable: true,
            orderable: true,
        }
    }
}

/// Repeating group of structurally identical entries
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub(crate) title: Option<String>,
    pub(crate) items: Box<SchemaNode>,
    pub(crate) min_items: Option<usize>,
    pub(crate) options: GroupOptions,
}

impl ArrayNode {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn items(&self) -> &SchemaNode {
        &self.items
    }

    pub fn min_items(&self) -> Option<usize> {
        self.min_items
    }

    pub fn options(&self) -> GroupOptions {
        self.options
    }
}

/// Branch selection condition, evaluated against the trigger field's value
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Number less than or equal to the bound
    ValueAtMost(f64),
    /// Number greater than or equal to the bound
    ValueAtLeast(f64),
    /// Value equal to one of the literals
    ValueIn(Vec<Literal>),
}

impl Predicate {
    pub fn at_most(n: f64) -> Self {
        Predicate::ValueAtMost(n)
    }

    pub fn at_least(n: f64) -> Self {
        Predicate::ValueAtLeast(n)
    }

    pub fn one_of<L: Into<Literal>>(values: impl IntoIterator<Item = L>) -> Self {
        Predicate::ValueIn(values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, value: &DataValue) -> bool {
        match self {
            Predicate::ValueAtMost(bound) => value.as_f64().is_some_and(|v| v <= *bound),
            Predicate::ValueAtLeast(bound) => value.as_f64().is_some_and(|v| v >= *bound),
            Predicate::ValueIn(values) => values.iter().any(|lit| lit.matches(value)),
        }
    }

    /// Whether some value satisfies both predicates.
    pub(crate) fn overlaps(&self, other: &Predicate) -> bool {
        use Predicate::*;
        match (self, other) {
            (ValueAtMost(_), ValueAtMost(_)) | (ValueAtLeast(_), ValueAtLeast(_)) => true,
            (ValueAtMost(hi), ValueAtLeast(lo)) | (ValueAtLeast(lo), ValueAtMost(hi)) => lo <= hi,
            (ValueIn(a), ValueIn(b)) => a.iter().any(|x| b.contains(x)),
            (ValueIn(values), range) | (range, ValueIn(values)) => values
                .iter()
                .any(|lit| range.matches(&DataValue::from(lit.clone()))),
        }
    }
}

impl From<Literal> for DataValue {
    fn from(lit: Literal) -> Self {
        match lit {
            Literal::Number(n) => DataValue::Number(n),
            Literal::String(s) => DataValue::String(s),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::ValueAtMost(n) => write!(f, "<= {}", n),
            Predicate::ValueAtLeast(n) => write!(f, ">= {}", n),
            Predicate::ValueIn(values) => {
                let items: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "in [{}]", items.join(", "))
            }
        }
    }
}

/// One candidate section of a conditional
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub(crate) predicate: Predicate,
    pub(crate) extra: ObjectNode,
}

impl Branch {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Properties and requirements added to the enclosing object when active
    pub fn extra_schema(&self) -> &ObjectNode {
        &self.extra
    }
}

/// Section selected by the value of a sibling trigger field
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalNode {
    pub(crate) trigger: String,
    pub(crate) branches: Vec<Branch>,
}

impl ConditionalNode {
    pub fn trigger_field(&self) -> &str {
        &self.trigger
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}

// ============================================================================
// Structural queries
// ============================================================================

impl SchemaNode {
    /// Start a string field
    pub fn string() -> PrimitiveBuilder {
        PrimitiveBuilder::new(PrimitiveKind::String)
    }

    /// Start a number field
    pub fn number() -> PrimitiveBuilder {
        PrimitiveBuilder::new(PrimitiveKind::Number)
    }

    /// Start an object
    pub fn object() -> ObjectBuilder {
        ObjectBuilder::new()
    }

    /// Start a repeating group of `items`
    pub fn array(items: impl Into<NodeBuilder>) -> ArrayBuilder {
        ArrayBuilder::new(items)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaNode::Primitive(p) => p.kind.type_name(),
            SchemaNode::Object(_) => "object",
            SchemaNode::Array(_) => "array",
            SchemaNode::Conditional(_) => "conditional",
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            SchemaNode::Primitive(p) => p.title(),
            SchemaNode::Object(o) => o.title(),
            SchemaNode::Array(a) => a.title(),
            SchemaNode::Conditional(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            SchemaNode::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            SchemaNode::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Declared schema of a child: an object property or an array element.
    pub fn child_schema(&self, key: &PathSegment) -> Option<&SchemaNode> {
        match (self, key) {
            (SchemaNode::Object(o), PathSegment::Property(name)) => o.property(name),
            (SchemaNode::Array(a), PathSegment::Index(_)) => Some(a.items()),
            _ => None,
        }
    }

    /// Whether `key` is in the declared required set of this object.
    pub fn is_required(&self, key: &str) -> bool {
        self.as_object().is_some_and(|o| o.is_required(key))
    }

    /// Value inserted for a new, unanswered entry of this schema.
    pub fn empty_value(&self) -> DataValue {
        match self {
            SchemaNode::Object(_) | SchemaNode::Conditional(_) => DataValue::empty_object(),
            SchemaNode::Array(_) => DataValue::Array(Vec::new()),
            SchemaNode::Primitive(_) => DataValue::Null,
        }
    }
}

impl From<PrimitiveNode> for SchemaNode {
    fn from(node: PrimitiveNode) -> Self {
        SchemaNode::Primitive(node)
    }
}

impl From<ObjectNode> for SchemaNode {
    fn from(node: ObjectNode) -> Self {
        SchemaNode::Object(node)
    }
}

impl From<ArrayNode> for SchemaNode {
    fn from(node: ArrayNode) -> Self {
        SchemaNode::Array(node)
    }
}

impl From<ConditionalNode> for SchemaNode {
    fn from(node: ConditionalNode) -> Self {
        SchemaNode::Conditional(node)
    }
}
