use crate::errors::{DocumapError, DocumapResult, ErrorKind};

/// Ordering or kind of a single key in a native index spec.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum IndexDirection {
    Ascending,
    Descending,
    /// Full-text index component.
    Text,
}

/// A declarative description of a secondary index.
///
/// # Purpose
/// Declared statically per repository and materialized against the store once
/// per binding, on first collection access. The declaration is pure data; the
/// store receives its translation via [Index::to_native].
///
/// # Field specifiers
/// Each entry in `fields` may carry a one-character prefix:
/// - `-` marks descending order
/// - `+` marks ascending order (also the default with no prefix)
/// - `$` marks a full-text component
///
/// Specifier order is preserved exactly in the native spec, which is what
/// gives a compound index its matching semantics.
///
/// # Usage
/// ```text
/// let by_email = Index::on(vec!["email"]).unique();
/// let recent = Index::on(vec!["-created_at", "name"]).sparse();
/// let expiring = Index::on(vec!["created_at"]).expire_after_seconds(3600);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Index {
    name: Option<String>,
    fields: Vec<String>,
    unique: bool,
    sparse: bool,
    background: bool,
    expire_after_seconds: Option<i64>,
}

impl Index {
    /// Creates an index declaration over the given field specifiers.
    pub fn on(fields: Vec<&str>) -> Self {
        Index {
            name: None,
            fields: fields.iter().map(|field| field.to_string()).collect(),
            unique: false,
            sparse: false,
            background: false,
            expire_after_seconds: None,
        }
    }

    /// Sets a custom index name; the store generates one if absent.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Adds a uniqueness constraint on the indexed fields.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Omits documents lacking the indexed fields from the index.
    pub fn sparse(mut self) -> Self {
        self.sparse = true;
        self
    }

    /// Requests a background build at the store.
    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Turns the index into a TTL index: indexed documents are expired by the
    /// store after the given number of seconds. The indexed field must hold a
    /// UTC timestamp or documents will never expire.
    pub fn expire_after_seconds(mut self, seconds: i64) -> Self {
        self.expire_after_seconds = Some(seconds);
        self
    }

    pub fn field_specifiers(&self) -> &[String] {
        &self.fields
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Translates this declaration into the store's native index spec.
    ///
    /// Pure transform: parses the field-specifier prefixes, preserves field
    /// order, and maps the unique/sparse/background/TTL flags through
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Fails with [ErrorKind::InvalidIndexSpec] when the declaration has no
    /// field specifiers.
    pub fn to_native(&self) -> DocumapResult<NativeIndexSpec> {
        if self.fields.is_empty() {
            return Err(DocumapError::new(
                "Index declaration requires at least one field specifier",
                ErrorKind::InvalidIndexSpec,
            ));
        }

        let mut keys = Vec::with_capacity(self.fields.len());
        for specifier in &self.fields {
            let (field, direction) = match specifier.strip_prefix('-') {
                Some(rest) => (rest, IndexDirection::Descending),
                None => match specifier.strip_prefix('+') {
                    Some(rest) => (rest, IndexDirection::Ascending),
                    None => match specifier.strip_prefix('$') {
                        Some(rest) => (rest, IndexDirection::Text),
                        None => (specifier.as_str(), IndexDirection::Ascending),
                    },
                },
            };

            if field.is_empty() {
                return Err(DocumapError::new(
                    &format!("Index field specifier '{}' has no field name", specifier),
                    ErrorKind::InvalidIndexSpec,
                ));
            }

            keys.push((field.to_string(), direction));
        }

        Ok(NativeIndexSpec {
            name: self.name.clone(),
            keys,
            unique: self.unique,
            sparse: self.sparse,
            background: self.background,
            expire_after_seconds: self.expire_after_seconds,
        })
    }
}

/// The store-native index-creation request produced by [Index::to_native].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NativeIndexSpec {
    pub name: Option<String>,
    /// Ordered key list; order carries compound-index matching semantics.
    pub keys: Vec<(String, IndexDirection)>,
    pub unique: bool,
    pub sparse: bool,
    pub background: bool,
    pub expire_after_seconds: Option<i64>,
}

impl NativeIndexSpec {
    /// The indexed field names, in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.keys.iter().map(|(field, _)| field.as_str()).collect()
    }

    /// A human-readable identifier for diagnostics: the declared name if one
    /// exists, otherwise the joined field names.
    pub fn describe(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.field_names().join("_"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_direction_is_ascending() {
        let spec = Index::on(vec!["email"]).to_native().unwrap();
        assert_eq!(spec.keys, vec![("email".to_string(), IndexDirection::Ascending)]);
    }

    #[test]
    fn test_prefixes_are_stripped() {
        let spec = Index::on(vec!["-created_at", "+name", "$bio"]).to_native().unwrap();
        assert_eq!(
            spec.keys,
            vec![
                ("created_at".to_string(), IndexDirection::Descending),
                ("name".to_string(), IndexDirection::Ascending),
                ("bio".to_string(), IndexDirection::Text),
            ]
        );
    }

    #[test]
    fn test_compound_order_is_preserved() {
        let spec = Index::on(vec!["last_name", "first_name", "-age"]).to_native().unwrap();
        assert_eq!(spec.field_names(), vec!["last_name", "first_name", "age"]);
    }

    #[test]
    fn test_flags_map_straight_through() {
        let spec = Index::on(vec!["created_at"])
            .unique()
            .sparse()
            .background()
            .expire_after_seconds(3600)
            .to_native()
            .unwrap();
        assert!(spec.unique);
        assert!(spec.sparse);
        assert!(spec.background);
        assert_eq!(spec.expire_after_seconds, Some(3600));
    }

    #[test]
    fn test_custom_name_is_carried() {
        let spec = Index::on(vec!["email"]).name("by_email").to_native().unwrap();
        assert_eq!(spec.name.as_deref(), Some("by_email"));
        assert_eq!(spec.describe(), "by_email");
    }

    #[test]
    fn test_describe_without_name_joins_fields() {
        let spec = Index::on(vec!["last_name", "first_name"]).to_native().unwrap();
        assert_eq!(spec.describe(), "last_name_first_name");
    }

    #[test]
    fn test_empty_field_list_is_rejected() {
        let result = Index::on(vec![]).to_native();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidIndexSpec);
    }

    #[test]
    fn test_bare_prefix_is_rejected() {
        let result = Index::on(vec!["-"]).to_native();
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::InvalidIndexSpec);
    }
}
