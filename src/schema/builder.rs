//! Validating schema builders.
//!
//! Builders collect a schema description without checking it; `build()` walks
//! the whole tree once and rejects malformed definitions with a
//! [`SchemaError`] naming the offending location.

use regex::Regex;
use std::collections::BTreeSet;

use super::{
    ArrayNode, Branch, ConditionalNode, GroupOptions, Literal, ObjectNode, Pattern, Predicate,
    PrimitiveKind, PrimitiveNode, SchemaError, SchemaNode,
};

/// Largest `minItems` a repeating group may declare
pub const MAX_MIN_ITEMS: usize = 10_000;

fn child_location(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn display_location(location: &str) -> String {
    if location.is_empty() {
        "<root>".to_string()
    } else {
        location.to_string()
    }
}

// ============================================================================
// Primitive
// ============================================================================

#[derive(Debug, Clone)]
pub struct PrimitiveBuilder {
    kind: PrimitiveKind,
    title: Option<String>,
    pattern: Option<String>,
    enum_values: Option<Vec<Literal>>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    format: Option<String>,
}

impl PrimitiveBuilder {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            title: None,
            pattern: None,
            enum_values: None,
            minimum: None,
            maximum: None,
            format: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn enum_values<L: Into<Literal>>(mut self, values: impl IntoIterator<Item = L>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn range(self, minimum: f64, maximum: f64) -> Self {
        self.minimum(minimum).maximum(maximum)
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn build(self) -> Result<PrimitiveNode, SchemaError> {
        self.build_at("")
    }

    fn build_at(self, location: &str) -> Result<PrimitiveNode, SchemaError> {
        let kind_name = self.kind.type_name();

        let pattern = match self.pattern {
            Some(_) if self.kind != PrimitiveKind::String => {
                return Err(SchemaError::ConstraintKindMismatch {
                    location: display_location(location),
                    constraint: "pattern",
                    kind: kind_name,
                })
            }
            Some(source) => {
                let regex = Regex::new(&source).map_err(|e| SchemaError::InvalidPattern {
                    location: display_location(location),
                    pattern: source.clone(),
                    source: e,
                })?;
                Some(Pattern::new(source, regex))
            }
            None => None,
        };

        if self.kind != PrimitiveKind::Number && (self.minimum.is_some() || self.maximum.is_some()) {
            return Err(SchemaError::ConstraintKindMismatch {
                location: display_location(location),
                constraint: "minimum/maximum",
                kind: kind_name,
            });
        }
        if let (Some(minimum), Some(maximum)) = (self.minimum, self.maximum) {
            if minimum > maximum {
                return Err(SchemaError::InvalidRange {
                    location: display_location(location),
                    minimum,
                    maximum,
                });
            }
        }

        if let Some(values) = &self.enum_values {
            if values.is_empty() {
                return Err(SchemaError::EmptyEnum {
                    location: display_location(location),
                });
            }
            if let Some(odd) = values.iter().find(|lit| lit.kind() != self.kind) {
                return Err(SchemaError::EnumKindMismatch {
                    location: display_location(location),
                    value: odd.to_string(),
                    kind: kind_name,
                });
            }
        }

        Ok(PrimitiveNode {
            kind: self.kind,
            title: self.title,
            pattern,
            enum_values: self.enum_values,
            minimum: self.minimum,
            maximum: self.maximum,
            format: self.format,
        })
    }
}

// ============================================================================
// Array
// ============================================================================

#[derive(Debug, Clone)]
pub struct ArrayBuilder {
    title: Option<String>,
    items: Box<NodeBuilder>,
    min_items: Option<i64>,
    options: GroupOptions,
}

impl ArrayBuilder {
    pub fn new(items: impl Into<NodeBuilder>) -> Self {
        Self {
            title: None,
            items: Box::new(items.into()),
            min_items: None,
            options: GroupOptions::default(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Minimum entry count; negative values are rejected at build time.
    pub fn min_items(mut self, min_items: i64) -> Self {
        self.min_items = Some(min_items);
        self
    }

    pub fn options(mut self, options: GroupOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<ArrayNode, SchemaError> {
        self.build_at("")
    }

    fn build_at(self, location: &str) -> Result<ArrayNode, SchemaError> {
        let min_items = match self.min_items {
            None => None,
            Some(n) if n >= 0 && (n as u64) <= MAX_MIN_ITEMS as u64 => Some(n as usize),
            Some(n) => {
                return Err(SchemaError::InvalidMinItems {
                    location: display_location(location),
                    value: n.to_string(),
                    max: MAX_MIN_ITEMS,
                })
            }
        };

        let items = self.items.build_at(&format!("{}[]", location), &BTreeSet::new())?;

        Ok(ArrayNode {
            title: self.title,
            items: Box::new(items),
            min_items,
            options: self.options,
        })
    }
}

// ============================================================================
// Object
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ObjectBuilder {
    title: Option<String>,
    properties: Vec<(String, NodeBuilder)>,
    required: Vec<String>,
    dependencies: Vec<DependencyBuilder>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append a property; declaration order is display order.
    pub fn property(mut self, name: impl Into<String>, node: impl Into<NodeBuilder>) -> Self {
        self.properties.push((name.into(), node.into()));
        self
    }

    pub fn required<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn dependency(mut self, dependency: DependencyBuilder) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn build(self) -> Result<ObjectNode, SchemaError> {
        self.build_scoped("", &BTreeSet::new())
    }

    /// Build with `inherited` naming the enclosing object's properties, which
    /// branch sections may require or trigger on.
    fn build_scoped(self, location: &str, inherited: &BTreeSet<String>) -> Result<ObjectNode, SchemaError> {
        let mut scope = inherited.clone();
        let mut properties = Vec::with_capacity(self.properties.len());

        for (name, node) in self.properties {
            if properties.iter().any(|(n, _): &(String, SchemaNode)| n == &name) {
                return Err(SchemaError::DuplicateProperty {
                    location: display_location(location),
                    name,
                });
            }
            let built = node.build_at(&child_location(location, &name), &BTreeSet::new())?;
            scope.insert(name.clone());
            properties.push((name, built));
        }

        let mut required = BTreeSet::new();
        for name in self.required {
            if !scope.contains(&name) {
                return Err(SchemaError::UnknownRequired {
                    location: display_location(location),
                    name,
                });
            }
            required.insert(name);
        }

        let dependencies = self
            .dependencies
            .into_iter()
            .map(|dep| dep.build_scoped(location, &scope))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ObjectNode {
            title: self.title,
            properties,
            required,
            dependencies,
        })
    }
}

// ============================================================================
// Conditional
// ============================================================================

/// Conditional section keyed by a sibling trigger field
#[derive(Debug, Clone)]
pub struct DependencyBuilder {
    trigger: String,
    branches: Vec<(Predicate, ObjectBuilder)>,
}

impl DependencyBuilder {
    pub fn on(trigger: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            branches: Vec::new(),
        }
    }

    /// Add a branch; earlier branches win when several match.
    pub fn branch(mut self, predicate: Predicate, extra: ObjectBuilder) -> Self {
        self.branches.push((predicate, extra));
        self
    }

    /// Build a conditional that stands alone, with `siblings` naming the
    /// properties of the object it will be evaluated against.
    pub fn build_for<S: Into<String>>(
        self,
        siblings: impl IntoIterator<Item = S>,
    ) -> Result<ConditionalNode, SchemaError> {
        let scope: BTreeSet<String> = siblings.into_iter().map(Into::into).collect();
        self.build_scoped("", &scope)
    }

    fn build_scoped(self, location: &str, scope: &BTreeSet<String>) -> Result<ConditionalNode, SchemaError> {
        let dep_location = display_location(location);

        if !scope.contains(&self.trigger) {
            return Err(SchemaError::UnknownTrigger {
                location: dep_location,
                trigger: self.trigger,
            });
        }
        if self.branches.is_empty() {
            return Err(SchemaError::EmptyConditional {
                location: dep_location,
                trigger: self.trigger,
            });
        }

        for (predicate, _) in &self.branches {
            check_predicate(predicate, &dep_location)?;
        }
        let predicates: Vec<&Predicate> = self.branches.iter().map(|(p, _)| p).collect();
        check_exclusive(&predicates, &self.trigger, &dep_location)?;

        let branch_location = child_location(location, &format!("dependencies.{}", self.trigger));
        let branches = self
            .branches
            .into_iter()
            .map(|(predicate, extra)| {
                Ok(Branch {
                    predicate,
                    extra: extra.build_scoped(&branch_location, scope)?,
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;

        Ok(ConditionalNode {
            trigger: self.trigger,
            branches,
        })
    }
}

fn check_predicate(predicate: &Predicate, location: &str) -> Result<(), SchemaError> {
    match predicate {
        Predicate::ValueAtMost(n) | Predicate::ValueAtLeast(n) if !n.is_finite() => {
            Err(SchemaError::InvalidPredicate {
                location: location.to_string(),
                reason: format!("bound {} is not a finite number", n),
            })
        }
        Predicate::ValueIn(values) if values.is_empty() => Err(SchemaError::InvalidPredicate {
            location: location.to_string(),
            reason: "value set is empty".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Branches must be pairwise disjoint, and numeric ranges must leave no gap
/// in the integer domain.
fn check_exclusive(predicates: &[&Predicate], trigger: &str, location: &str) -> Result<(), SchemaError> {
    for (i, a) in predicates.iter().enumerate() {
        for (j, b) in predicates.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                return Err(SchemaError::OverlappingBranches {
                    location: location.to_string(),
                    trigger: trigger.to_string(),
                    first: i,
                    second: j,
                });
            }
        }
    }

    let upper = predicates.iter().find_map(|p| match p {
        Predicate::ValueAtMost(n) => Some(*n),
        _ => None,
    });
    let lower = predicates.iter().find_map(|p| match p {
        Predicate::ValueAtLeast(n) => Some(*n),
        _ => None,
    });

    let gap = |detail: String| SchemaError::PredicateGap {
        location: location.to_string(),
        trigger: trigger.to_string(),
        detail,
    };

    match (upper, lower) {
        (None, None) => Ok(()),
        (Some(hi), None) => Err(gap(format!("nothing covers values above {}", hi))),
        (None, Some(lo)) => Err(gap(format!("nothing covers values below {}", lo))),
        // First integer above the at-most bound must reach the at-least bound
        (Some(hi), Some(lo)) if lo > hi.floor() + 1.0 => {
            Err(gap(format!("values between {} and {} match no branch", hi, lo)))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// Any node
// ============================================================================

/// Builder for any property schema
#[derive(Debug, Clone)]
pub enum NodeBuilder {
    Primitive(PrimitiveBuilder),
    Object(ObjectBuilder),
    Array(ArrayBuilder),
}

impl NodeBuilder {
    pub fn build(self) -> Result<SchemaNode, SchemaError> {
        self.build_at("", &BTreeSet::new())
    }

    fn build_at(self, location: &str, inherited: &BTreeSet<String>) -> Result<SchemaNode, SchemaError> {
        Ok(match self {
            NodeBuilder::Primitive(p) => SchemaNode::Primitive(p.build_at(location)?),
            NodeBuilder::Object(o) => SchemaNode::Object(o.build_scoped(location, inherited)?),
            NodeBuilder::Array(a) => SchemaNode::Array(a.build_at(location)?),
        })
    }
}

impl From<PrimitiveBuilder> for NodeBuilder {
    fn from(builder: PrimitiveBuilder) -> Self {
        NodeBuilder::Primitive(builder)
    }
}

impl From<ObjectBuilder> for NodeBuilder {
    fn from(builder: ObjectBuilder) -> Self {
        NodeBuilder::Object(builder)
    }
}

impl From<ArrayBuilder> for NodeBuilder {
    fn from(builder: ArrayBuilder) -> Self {
        NodeBuilder::Array(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credit_split(low: f64, high: f64) -> DependencyBuilder {
        DependencyBuilder::on("creditScore")
            .branch(Predicate::at_least(high), ObjectBuilder::new())
            .branch(
                Predicate::at_most(low),
                ObjectBuilder::new()
                    .property("guarantors", SchemaNode::array(SchemaNode::string()).min_items(2))
                    .required(["guarantors"]),
            )
    }

    #[test]
    fn test_build_loan_like_object() {
        let node = ObjectBuilder::new()
            .property("creditScore", SchemaNode::number().range(300.0, 900.0))
            .required(["creditScore"])
            .dependency(credit_split(699.0, 700.0))
            .build()
            .unwrap();

        assert_eq!(node.dependencies().len(), 1);
        assert_eq!(node.dependencies()[0].branches().len(), 2);
        assert!(node.dependencies()[0].branches()[1].extra_schema().is_required("guarantors"));
    }

    #[test]
    fn test_trigger_must_be_sibling() {
        let err = ObjectBuilder::new()
            .property("loanAmount", SchemaNode::number())
            .dependency(credit_split(699.0, 700.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTrigger { ref trigger, .. } if trigger == "creditScore"));
    }

    #[test]
    fn test_overlapping_boundaries_rejected() {
        let err = ObjectBuilder::new()
            .property("creditScore", SchemaNode::number())
            .dependency(credit_split(700.0, 700.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::OverlappingBranches { first: 0, second: 1, .. }));
    }

    #[test]
    fn test_gap_between_ranges_rejected() {
        let err = ObjectBuilder::new()
            .property("creditScore", SchemaNode::number())
            .dependency(credit_split(650.0, 700.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::PredicateGap { .. }));
    }

    #[test]
    fn test_fractional_bounds_must_cover_integers() {
        let err = ObjectBuilder::new()
            .property("creditScore", SchemaNode::number())
            .dependency(credit_split(699.2, 700.1))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::PredicateGap { .. }));

        assert!(ObjectBuilder::new()
            .property("creditScore", SchemaNode::number())
            .dependency(credit_split(699.5, 700.0))
            .build()
            .is_ok());
    }

    #[test]
    fn test_one_sided_range_rejected() {
        let err = ObjectBuilder::new()
            .property("creditScore", SchemaNode::number())
            .dependency(DependencyBuilder::on("creditScore").branch(Predicate::at_least(700.0), ObjectBuilder::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::PredicateGap { .. }));
    }

    #[test]
    fn test_value_in_branches_may_be_partial() {
        let node = ObjectBuilder::new()
            .property("relationship", SchemaNode::string())
            .property("relation", SchemaNode::string())
            .dependency(
                DependencyBuilder::on("relationship")
                    .branch(Predicate::one_of(["Other"]), ObjectBuilder::new().required(["relation"])),
            )
            .build()
            .unwrap();
        assert_eq!(node.dependencies()[0].trigger_field(), "relationship");
    }

    #[test]
    fn test_branch_may_require_base_property() {
        let result = ObjectBuilder::new()
            .property("kind", SchemaNode::string())
            .property("detail", SchemaNode::string())
            .dependency(
                DependencyBuilder::on("kind").branch(Predicate::one_of(["x"]), ObjectBuilder::new().required(["detail"])),
            )
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_required_rejected() {
        let err = ObjectBuilder::new()
            .property("name", SchemaNode::string())
            .required(["nmae"])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRequired { ref name, .. } if name == "nmae"));
    }

    #[test]
    fn test_negative_min_items_rejected() {
        let err = ArrayBuilder::new(SchemaNode::string()).min_items(-1).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMinItems { .. }));

        let err = ArrayBuilder::new(SchemaNode::string())
            .min_items(MAX_MIN_ITEMS as i64 + 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMinItems { .. }));
    }

    #[test]
    fn test_primitive_constraint_checks() {
        assert!(matches!(
            SchemaNode::string().pattern("([a-z").build().unwrap_err(),
            SchemaError::InvalidPattern { .. }
        ));
        assert!(matches!(
            SchemaNode::number().range(900.0, 300.0).build().unwrap_err(),
            SchemaError::InvalidRange { .. }
        ));
        assert!(matches!(
            SchemaNode::string().minimum(1.0).build().unwrap_err(),
            SchemaError::ConstraintKindMismatch { .. }
        ));
        assert!(matches!(
            SchemaNode::string().enum_values(Vec::<&str>::new()).build().unwrap_err(),
            SchemaError::EmptyEnum { .. }
        ));
        assert!(matches!(
            SchemaNode::string().enum_values([1.0]).build().unwrap_err(),
            SchemaError::EnumKindMismatch { .. }
        ));
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let err = ObjectBuilder::new()
            .property("name", SchemaNode::string())
            .property("name", SchemaNode::number())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateProperty { .. }));
    }

    #[test]
    fn test_error_location_names_nested_field() {
        let err = ObjectBuilder::new()
            .property(
                "directors",
                SchemaNode::array(SchemaNode::object().property("pan", SchemaNode::string().pattern("("))),
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().starts_with("directors[].pan:"));
    }
}
