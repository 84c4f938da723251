use crate::common::{Document, Value, DOC_ID};
use crate::errors::{DocumapError, DocumapResult, ErrorKind};
use crate::oid::ObjectId;

/// Capability required of any storable entity.
///
/// # Purpose
/// Defines the bidirectional mapping between an in-memory typed record and its
/// flat document representation, plus the static field-name set the repository
/// consults when validating filters.
///
/// # Contract
/// - The identifier lives on the record as `Option<ObjectId>` and is never one
///   of the declared domain fields; it is synthesized by the store on first
///   successful save.
/// - [Model::to_document] serializes every declared domain field under its
///   on-wire name, including fields still at their default value, and never
///   includes the identifier. Persistence is complete, not sparse, so partial
///   documents never appear in storage.
/// - [Model::from_document] on an empty document returns `Ok(None)`: nothing
///   to construct, not an error.
///
/// # Usage
/// ```text
/// struct User {
///     id: Option<ObjectId>,
///     name: String,
///     email: String,
///     age: i64,
/// }
///
/// impl Model for User {
///     const FIELD_NAMES: &'static [&'static str] = &["name", "email", "age"];
///     // ...
/// }
/// ```
pub trait Model: Sized {
    /// Declared domain field names, by on-wire name, enumerable without an
    /// instance. Never contains the identifier field.
    const FIELD_NAMES: &'static [&'static str];

    /// The model's name for diagnostics.
    fn model_name() -> &'static str;

    /// Constructs a typed record from a flat document.
    ///
    /// Extracts the native identifier from the reserved `_id` key (removing
    /// it from the field set) and maps it to the record's identifier field.
    /// An empty document yields `Ok(None)`.
    fn from_document(doc: Document) -> DocumapResult<Option<Self>>;

    /// Produces the flat document for persistence.
    fn to_document(&self) -> DocumapResult<Document>;

    /// The record's identifier, if it has been persisted.
    fn id(&self) -> Option<&ObjectId>;
}

/// Removes the reserved `_id` field from a document and returns it as a typed
/// identifier, for use at the top of [Model::from_document] implementations.
///
/// A missing or null `_id` yields `Ok(None)`; a present value of any other
/// type than an object id is a mapping error.
pub fn take_id(doc: &mut Document) -> DocumapResult<Option<ObjectId>> {
    match doc.remove(DOC_ID) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::ObjectId(oid)) => Ok(Some(oid)),
        Some(other) => Err(DocumapError::new(
            &format!("Reserved field '{}' must be an object id, got {:?}", DOC_ID, other),
            ErrorKind::ModelMapping,
        )),
    }
}

/// Builds the standard mapping error for a field that is missing or carries
/// the wrong value type.
pub fn field_mapping_error(model: &str, field: &str, value: Option<&Value>) -> DocumapError {
    let message = match value {
        Some(value) => format!(
            "Model '{}' field '{}' has unexpected value {:?}",
            model, field, value
        ),
        None => format!("Model '{}' is missing field '{}'", model, field),
    };
    DocumapError::new(&message, ErrorKind::ModelMapping)
}
