//! Form data values.
//!
//! [`DataValue`] is the document the rendering layer produces from user input.
//! Updates never mutate a value in place: every write returns a new document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::path::{FieldPath, PathSegment};

/// A form document node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    /// Unanswered field
    #[default]
    Null,
    Number(f64),
    String(String),
    Array(Vec<DataValue>),
    Object(BTreeMap<String, DataValue>),
}

/// Errors raised when a path does not fit the shape of a document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("{path}: expected an object, found {found}")]
    NotAnObject { path: FieldPath, found: &'static str },

    #[error("{path}: expected an array, found {found}")]
    NotAnArray { path: FieldPath, found: &'static str },

    #[error("{path}: index {index} out of range (length {len})")]
    IndexOutOfRange {
        path: FieldPath,
        index: usize,
        len: usize,
    },

    #[error("malformed path '{input}': {reason}")]
    Malformed { input: String, reason: String },
}

impl DataValue {
    /// An object with no properties; the state of a freshly opened form.
    pub fn empty_object() -> Self {
        DataValue::Object(BTreeMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, DataValue>> {
        match self {
            DataValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Property lookup; `None` for non-objects and missing keys.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Property lookup that treats an explicit null as absent.
    pub fn get_present(&self, key: &str) -> Option<&DataValue> {
        self.get(key).filter(|v| !v.is_null())
    }

    /// Short type label used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::Number(_) => "number",
            DataValue::String(_) => "string",
            DataValue::Array(_) => "array",
            DataValue::Object(_) => "object",
        }
    }

    /// Look up the value at `path`.
    pub fn get_path(&self, path: &FieldPath) -> Option<&DataValue> {
        path.segments()
            .iter()
            .try_fold(self, |current, seg| match seg {
                PathSegment::Property(name) => current.get(name),
                PathSegment::Index(idx) => current.as_array().and_then(|a| a.get(*idx)),
            })
    }

    /// Return a copy of this document with the value at `path` replaced.
    ///
    /// Missing or null objects along the way are created; array indices must
    /// already exist.
    pub fn with_value_at(&self, path: &FieldPath, value: DataValue) -> Result<DataValue, PathError> {
        set_in(Some(self), path.segments(), value, &FieldPath::root())
    }

    /// Return a copy of this document with the array at `path` rewritten by `f`.
    ///
    /// A missing or null array is handed to `f` as empty.
    pub fn with_array_at<F>(&self, path: &FieldPath, f: F) -> Result<DataValue, PathError>
    where
        F: FnOnce(&mut Vec<DataValue>) -> Result<(), PathError>,
    {
        let mut items = match self.get_path(path) {
            None | Some(DataValue::Null) => Vec::new(),
            Some(DataValue::Array(items)) => items.clone(),
            Some(other) => {
                return Err(PathError::NotAnArray {
                    path: path.clone(),
                    found: other.kind_name(),
                })
            }
        };
        f(&mut items)?;
        self.with_value_at(path, DataValue::Array(items))
    }
}

fn set_in(
    current: Option<&DataValue>,
    segments: &[PathSegment],
    value: DataValue,
    walked: &FieldPath,
) -> Result<DataValue, PathError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(value);
    };

    match head {
        PathSegment::Property(name) => {
            let mut map = match current {
                None | Some(DataValue::Null) => BTreeMap::new(),
                Some(DataValue::Object(map)) => map.clone(),
                Some(other) => {
                    return Err(PathError::NotAnObject {
                        path: walked.clone(),
                        found: other.kind_name(),
                    })
                }
            };
            let child = set_in(map.get(name), rest, value, &walked.push_property(name))?;
            map.insert(name.clone(), child);
            Ok(DataValue::Object(map))
        }
        PathSegment::Index(idx) => {
            let mut items = match current {
                Some(DataValue::Array(items)) => items.clone(),
                Some(other) => {
                    return Err(PathError::NotAnArray {
                        path: walked.clone(),
                        found: other.kind_name(),
                    })
                }
                None => {
                    return Err(PathError::NotAnArray {
                        path: walked.clone(),
                        found: "nothing",
                    })
                }
            };
            if *idx >= items.len() {
                return Err(PathError::IndexOutOfRange {
                    path: walked.clone(),
                    index: *idx,
                    len: items.len(),
                });
            }
            let child = set_in(Some(&items[*idx]), rest, value, &walked.push_index(*idx))?;
            items[*idx] = child;
            Ok(DataValue::Array(items))
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => f.write_str(self.kind_name()),
        }
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<f64> for DataValue {
    fn from(n: f64) -> Self {
        DataValue::Number(n)
    }
}

impl From<i64> for DataValue {
    fn from(n: i64) -> Self {
        DataValue::Number(n as f64)
    }
}

impl From<Vec<DataValue>> for DataValue {
    fn from(items: Vec<DataValue>) -> Self {
        DataValue::Array(items)
    }
}

impl From<BTreeMap<String, DataValue>> for DataValue {
    fn from(map: BTreeMap<String, DataValue>) -> Self {
        DataValue::Object(map)
    }
}

impl TryFrom<serde_json::Value> for DataValue {
    type Error = serde_json::Error;

    /// Booleans have no form representation and are rejected.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> DataValue {
        DataValue::try_from(value).unwrap()
    }

    #[test]
    fn test_deserialize_from_json() {
        let value = doc(json!({"name": "Acme", "score": 700, "tags": ["a", null]}));
        assert_eq!(value.get("name"), Some(&DataValue::from("Acme")));
        assert_eq!(value.get("score").and_then(DataValue::as_f64), Some(700.0));
        assert_eq!(value.get("tags").and_then(|t| t.as_array()).map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_booleans_are_rejected() {
        assert!(DataValue::try_from(json!({"flag": true})).is_err());
    }

    #[test]
    fn test_with_value_at_creates_objects() {
        let original = DataValue::empty_object();
        let path = FieldPath::parse("applicant.address.city").unwrap();
        let updated = original.with_value_at(&path, "Pune".into()).unwrap();

        assert_eq!(updated.get_path(&path), Some(&DataValue::from("Pune")));
        assert_eq!(original, DataValue::empty_object());
    }

    #[test]
    fn test_with_value_at_into_array_element() {
        let original = doc(json!({"guarantors": [{"name": "A"}, {"name": "B"}]}));
        let path = FieldPath::parse("guarantors[1].name").unwrap();
        let updated = original.with_value_at(&path, "C".into()).unwrap();

        assert_eq!(updated.get_path(&path), Some(&DataValue::from("C")));
        assert_eq!(
            updated.get_path(&FieldPath::parse("guarantors[0].name").unwrap()),
            Some(&DataValue::from("A"))
        );
    }

    #[test]
    fn test_with_value_at_rejects_bad_index() {
        let original = doc(json!({"guarantors": []}));
        let err = original
            .with_value_at(&FieldPath::parse("guarantors[0].name").unwrap(), "x".into())
            .unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfRange { index: 0, len: 0, .. }));
    }

    #[test]
    fn test_with_value_at_rejects_primitive_parent() {
        let original = doc(json!({"gstin": "22AAAAA0000A1Z5"}));
        let err = original
            .with_value_at(&FieldPath::parse("gstin.code").unwrap(), "x".into())
            .unwrap_err();
        assert!(matches!(err, PathError::NotAnObject { found: "string", .. }));
    }

    #[test]
    fn test_with_array_at_treats_missing_as_empty() {
        let original = DataValue::empty_object();
        let updated = original
            .with_array_at(&FieldPath::parse("directors").unwrap(), |items| {
                items.push(DataValue::empty_object());
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.get("directors").and_then(|d| d.as_array()).map(|a| a.len()), Some(1));
    }
}
