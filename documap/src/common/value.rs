use crate::common::Document;
use crate::oid::ObjectId;
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display, Formatter};

/// Represents a [Document] field value.
///
/// # Purpose
/// Provides a unified representation for everything that can be stored in a
/// document: primitive values, datetimes, identifiers, arrays, and nested
/// documents. Models serialize their fields into `Value`s and reconstruct
/// themselves from them.
///
/// # Usage
/// Create values with the `From` conversions or the `doc!` macro:
/// ```text
/// let v1: Value = 42.into();
/// let v2 = Value::from("hello");
/// let doc = doc! { "age": 42, "name": "Alice" };
/// ```
/// Read values back with the `as_*` accessors, which return `None` on a type
/// mismatch instead of panicking.
#[derive(Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Represents a null value.
    #[default]
    Null,
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 32-bit integer value.
    I32(i32),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a text value.
    String(String),
    /// Represents a native store identifier.
    ObjectId(ObjectId),
    /// Represents a UTC timestamp value.
    DateTime(DateTime<Utc>),
    /// Represents an ordered collection of values.
    Array(Vec<Value>),
    /// Represents a nested document.
    Document(Document),
    /// Represents binary data (not queryable).
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Value::Document(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an `i64`, widening `I32` transparently.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I32(i) => Some(*i as i64),
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            Value::I32(i) => Some(*i as f64),
            Value::I64(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object_id(&self) -> Option<&ObjectId> {
        match self {
            Value::ObjectId(oid) => Some(oid),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::ObjectId(oid) => write!(f, "{}", oid),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Document(doc) => write!(f, "{}", doc),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::String(s) => write!(f, "String({:?})", s),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::I64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::String(v.clone())
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::ObjectId(v)
    }
}

impl From<&ObjectId> for Value {
    fn from(v: &ObjectId) -> Self {
        Value::ObjectId(*v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    #[test]
    fn test_value_defaults_to_null() {
        let value = Value::default();
        assert!(value.is_null());
    }

    #[test]
    fn test_as_i64_widens_i32() {
        assert_eq!(Value::I32(7).as_i64(), Some(7));
        assert_eq!(Value::I64(7).as_i64(), Some(7));
        assert_eq!(Value::String("7".to_string()).as_i64(), None);
    }

    #[test]
    fn test_as_str() {
        let value = Value::from("hello");
        assert_eq!(value.as_str(), Some("hello"));
        assert_eq!(Value::I32(1).as_str(), None);
    }

    #[test]
    fn test_option_conversion() {
        let some: Value = Some(42).into();
        assert_eq!(some, Value::I32(42));
        let none: Value = Option::<i32>::None.into();
        assert!(none.is_null());
    }

    #[test]
    fn test_object_id_round_trip_through_value() {
        let oid = ObjectId::new();
        let value = Value::from(oid);
        assert_eq!(value.as_object_id(), Some(&oid));
    }

    #[test]
    fn test_nested_document_value() {
        let doc = doc! { "city": "New York", "zip": 10001 };
        let value = Value::from(doc);
        assert!(value.is_document());
        let inner = value.as_document().unwrap();
        assert_eq!(inner.get("city").and_then(|v| v.as_str()), Some("New York"));
    }

    #[test]
    fn test_display_array() {
        let value = Value::Array(vec![Value::I32(1), Value::from("two")]);
        assert_eq!(format!("{}", value), "[1, two]");
    }
}
