//! Schema construction errors

use thiserror::Error;

/// A malformed schema definition.
///
/// Raised while building a schema tree or parsing a schema document; a form
/// session is never created from a schema that failed to build.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{location}: property '{name}' is declared twice")]
    DuplicateProperty { location: String, name: String },

    #[error("{location}: required property '{name}' is not declared")]
    UnknownRequired { location: String, name: String },

    #[error("{location}: conditional trigger '{trigger}' is not a sibling property")]
    UnknownTrigger { location: String, trigger: String },

    #[error("{location}: conditional on '{trigger}' has no branches")]
    EmptyConditional { location: String, trigger: String },

    #[error("{location}: branches {first} and {second} on '{trigger}' overlap")]
    OverlappingBranches {
        location: String,
        trigger: String,
        first: usize,
        second: usize,
    },

    #[error("{location}: numeric branches on '{trigger}' leave a gap: {detail}")]
    PredicateGap {
        location: String,
        trigger: String,
        detail: String,
    },

    #[error("{location}: invalid branch predicate: {reason}")]
    InvalidPredicate { location: String, reason: String },

    #[error("{location}: invalid pattern '{pattern}'")]
    InvalidPattern {
        location: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{location}: minimum {minimum} exceeds maximum {maximum}")]
    InvalidRange {
        location: String,
        minimum: f64,
        maximum: f64,
    },

    #[error("{location}: '{constraint}' does not apply to {kind} fields")]
    ConstraintKindMismatch {
        location: String,
        constraint: &'static str,
        kind: &'static str,
    },

    #[error("{location}: enum must list at least one value")]
    EmptyEnum { location: String },

    #[error("{location}: enum value {value} is not a {kind}")]
    EnumKindMismatch {
        location: String,
        value: String,
        kind: &'static str,
    },

    #[error("{location}: minItems must be an integer between 0 and {max}, got {value}")]
    InvalidMinItems {
        location: String,
        value: String,
        max: usize,
    },

    #[error("{location}: unsupported schema: {reason}")]
    Unsupported { location: String, reason: String },
}
