use crate::common::Value;
use indexmap::IndexMap;
use std::fmt::{Debug, Display, Formatter};

/// A flat, insertion-ordered field-name-to-value mapping.
///
/// # Purpose
/// `Document` is the persisted representation of a model: every declared
/// domain field serialized under its on-wire name, plus the reserved `_id`
/// field owned by the store. It is also the filter representation handed to
/// repository queries.
///
/// # Characteristics
/// - Keys are strings, values are [Value]s
/// - Preserves insertion order, which matters for compound-index field order
///   and aggregation stage documents
/// - No nesting-aware path access; nested documents are plain values
///
/// # Usage
/// ```text
/// let mut doc = Document::new();
/// doc.put("name", "Alice");
/// doc.put("age", 30i64);
///
/// // or with the macro
/// let doc = doc! { "name": "Alice", "age": 30 };
/// ```
#[derive(Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    fields: IndexMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Document {
            fields: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Sets a field, replacing any previous value under the same key.
    pub fn put<V: Into<Value>>(&mut self, key: &str, value: V) -> &mut Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Removes and returns a field value.
    ///
    /// Uses a shifting removal so the relative order of the remaining fields
    /// is preserved.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Strips the surrounding quotes that `stringify!` leaves on string-literal
/// keys in the `doc!` macro.
pub fn normalize(key: &str) -> &str {
    key.trim_matches('"')
}

/// Creates a [Document] from key-value pairs.
///
/// Keys may be bare identifiers or string literals; values accept literals,
/// parenthesized expressions, arrays, and nested `{ .. }` documents.
///
/// ```text
/// let doc = doc! {
///     "name": "Alice",
///     "age": 30,
///     "address": { "city": "New York" },
/// };
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::common::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::common::Document::new();
            $(
                doc.put($crate::common::normalize(stringify!($key)), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Helper macro converting values for the `doc!` macro.
/// Handles nested documents, arrays, and expressions.
#[macro_export]
macro_rules! doc_value {
    // match a nested document
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    // match an array of values
    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    // match an expression (variable, parenthesized call, literal, etc.)
    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
