//! Field paths addressing values inside a form document.
//!
//! A path is an ordered list of segments, each either an object property or an
//! array index. Paths serialize as JSON arrays (`["guarantors", 0, "name"]`) and
//! display in dot/bracket notation (`guarantors[0].name`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::value::PathError;

/// Segment of a field path
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Array index access: [0], [1], etc.
    Index(usize),
    /// Object property access: .fieldName
    Property(String),
}

impl From<&str> for PathSegment {
    fn from(name: &str) -> Self {
        PathSegment::Property(name.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(name: String) -> Self {
        PathSegment::Property(name)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        PathSegment::Index(idx)
    }
}

/// Path to a field, e.g. "loanAmount" or "guarantors[1].relationship"
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Create a root path (empty)
    pub fn root() -> Self {
        Self { segments: vec![] }
    }

    /// Check if this is the root path
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Return a new path with a property segment appended
    pub fn push_property(&self, name: &str) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Property(name.to_string()));
        new
    }

    /// Return a new path with an index segment appended
    pub fn push_index(&self, idx: usize) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Index(idx));
        new
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Path without its last segment
    pub fn parent(&self) -> Self {
        let mut new = self.clone();
        new.segments.pop();
        new
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Parse dot/bracket notation: "directors[0].tags[2]"
    ///
    /// The empty string is the root. Empty property names, stray brackets and
    /// bracket contents that are not array indices are rejected.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let malformed = |reason: String| PathError::Malformed {
            input: s.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        if s.is_empty() {
            return Ok(Self { segments });
        }

        let mut chars = s.chars().peekable();
        let mut expect_property = !s.starts_with('[');

        loop {
            if expect_property {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if matches!(c, '.' | '[' | ']') {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if name.is_empty() {
                    return Err(malformed("empty property name".to_string()));
                }
                segments.push(PathSegment::Property(name));
            }

            match chars.next() {
                None => break,
                Some('.') => expect_property = true,
                Some('[') => {
                    let mut index = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) => index.push(c),
                            None => return Err(malformed("unterminated '['".to_string())),
                        }
                    }
                    let idx = index
                        .parse::<usize>()
                        .map_err(|_| malformed(format!("'{}' is not an array index", index)))?;
                    segments.push(PathSegment::Index(idx));

                    if !matches!(chars.peek(), None | Some('.') | Some('[')) {
                        return Err(malformed("expected '.' or '[' after ']'".to_string()));
                    }
                    expect_property = false;
                }
                Some(c) => return Err(malformed(format!("unexpected '{}'", c))),
            }
        }

        Ok(Self { segments })
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for FieldPath {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<PathSegment>> for FieldPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Property(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Property(name) => write!(f, ".{}", name)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_building() {
        let path = FieldPath::root()
            .push_property("guarantors")
            .push_index(1)
            .push_property("relationship");
        assert_eq!(path.to_string(), "guarantors[1].relationship");
        assert_eq!(path.depth(), 3);
        assert_eq!(path.parent().to_string(), "guarantors[1]");
    }

    #[test]
    fn test_path_parse() {
        let path = FieldPath::parse("directors[0].tags[2]").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Property("directors".into()),
                PathSegment::Index(0),
                PathSegment::Property("tags".into()),
                PathSegment::Index(2),
            ]
        );
        assert!(FieldPath::parse("").unwrap().is_root());
        assert_eq!("[1].name".parse::<FieldPath>().unwrap().to_string(), "[1].name");
        assert_eq!(FieldPath::try_from("a[0][1]").unwrap().depth(), 3);
    }

    #[test]
    fn test_path_serializes_as_mixed_array() {
        let path: FieldPath = vec![PathSegment::from("guarantors"), PathSegment::from(0)].into();
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json, serde_json::json!(["guarantors", 0]));

        let back: FieldPath = serde_json::from_value(json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_path_parse_rejects_malformed() {
        for input in ["directors[-1]", "directors[x]", "directors[0", "a..b", "a.", ".a", "a]", "a[0]b"] {
            assert!(
                matches!(FieldPath::parse(input), Err(PathError::Malformed { .. })),
                "{} should not parse",
                input
            );
        }
        let err = FieldPath::parse("directors[-1]").unwrap_err();
        assert_eq!(err.to_string(), "malformed path 'directors[-1]': '-1' is not an array index");
    }

    #[test]
    fn test_root_display() {
        assert_eq!(FieldPath::root().to_string(), "<root>");
    }
}
