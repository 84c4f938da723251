//! Typed repositories over store collections.
//!
//! A [Repository] binds one [Model](crate::model::Model) type to one named
//! collection and exposes the four mapping-layer operations: `save`, `get`,
//! `find`, and `aggregate`. It owns the translation from human-facing filters
//! to store-native queries, the lazy one-shot collection handle with index
//! bootstrap, and the single-result-or-error `get` contract.
//!
//! # Creating repositories
//!
//! ```rust,ignore
//! use documap::repository::Repository;
//! use documap::index::Index;
//!
//! let repo: Repository<User> = Repository::builder(client)
//!     .collection("users")
//!     .index(Index::on(vec!["email"]).unique())
//!     .build()?;
//!
//! let saved = repo.save(&user)?;
//! let found = repo.get(doc! { "email": "x@example.com" })?;
//! ```
//!
//! # Filters
//!
//! A filter is a [Document](crate::common::Document) mapping field names to
//! expected values, plus three reserved control keys: `id` (human identifier,
//! translated to the native `_id`), `projection`, and `skip`/`limit`. Every
//! non-reserved key must name a declared model field; unknown keys are
//! rejected before the query reaches the store.

mod cursor;
mod safe;

pub use cursor::*;
pub use safe::*;

use crate::common::{Document, Value, DOC_ID, LIMIT_KEY, MODEL_ID_FIELD, PROJECTION_KEY, SKIP_KEY};
use crate::errors::{DocumapError, DocumapResult, ErrorKind};
use crate::index::Index;
use crate::model::Model;
use crate::oid::ObjectId;
use crate::store::{FindOptions, StoreClient, StoreCollectionRef};
use once_cell::sync::OnceCell;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// A typed repository bound to one collection.
///
/// The binding (model type, collection name) is immutable; the collection
/// handle is materialized lazily on first access and cached for the lifetime
/// of the binding. When index declarations are present and auto-creation is
/// enabled, the first materialization submits them all in one index-creation
/// call; a bootstrap failure surfaces as [ErrorKind::IndexCreation] and the
/// handle is not cached, so the next access retries instead of letting later
/// saves run without the uniqueness guarantee.
///
/// All operations are synchronous, blocking calls into the store driver; no
/// operation spawns background work. Reads never mutate a model in place;
/// every read produces a fresh instance.
pub struct Repository<M: Model> {
    client: Arc<dyn StoreClient>,
    collection_name: String,
    indexes: Vec<Index>,
    auto_create_index: bool,
    collection: OnceCell<StoreCollectionRef>,
    _phantom: PhantomData<M>,
}

impl<M: Model> Repository<M> {
    /// Starts building a repository binding on the given store client.
    pub fn builder(client: Arc<dyn StoreClient>) -> RepositoryBuilder<M> {
        RepositoryBuilder {
            client,
            collection_name: None,
            indexes: Vec::new(),
            auto_create_index: true,
            _phantom: PhantomData,
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Returns the cached collection handle, materializing it and running the
    /// one-time index bootstrap on first access.
    fn collection(&self) -> DocumapResult<StoreCollectionRef> {
        if let Some(collection) = self.collection.get() {
            return Ok(collection.clone());
        }

        let collection = self.client.collection(&self.collection_name)?;
        if self.auto_create_index && !self.indexes.is_empty() {
            let mut specs = Vec::with_capacity(self.indexes.len());
            for index in &self.indexes {
                specs.push(index.to_native().map_err(|e| {
                    DocumapError::new_with_cause(
                        &format!(
                            "Failed to create indexes on collection '{}'",
                            self.collection_name
                        ),
                        ErrorKind::IndexCreation,
                        e,
                    )
                })?);
            }
            collection.create_indexes(specs).map_err(|e| {
                DocumapError::new_with_cause(
                    &format!(
                        "Failed to create indexes on collection '{}'",
                        self.collection_name
                    ),
                    ErrorKind::IndexCreation,
                    e,
                )
            })?;
            log::debug!(
                "Initialized {} index(es) on collection '{}'",
                self.indexes.len(),
                self.collection_name
            );
        }

        // a lost race just drops the duplicate handle; the bootstrap is
        // idempotent at the store
        Ok(self.collection.get_or_init(|| collection).clone())
    }

    /// Translates a human-facing filter into its store-native form.
    ///
    /// Rewrites the reserved `id` key to the native `_id`, extracts the
    /// projection/skip/limit control keys, and validates every remaining key
    /// against the model's declared field names. The mutated document is the
    /// filter handed to the store.
    fn process_filter(&self, filter: &mut Document) -> DocumapResult<FindOptions> {
        if let Some(raw) = filter.remove(MODEL_ID_FIELD) {
            let oid = match raw {
                Value::ObjectId(oid) => oid,
                Value::String(s) => ObjectId::parse_str(&s)?,
                other => {
                    return Err(DocumapError::new(
                        &format!(
                            "Filter key '{}' must be an object id or its hex string, got {:?}",
                            MODEL_ID_FIELD, other
                        ),
                        ErrorKind::InvalidQuery,
                    ))
                }
            };
            filter.put(DOC_ID, oid);
        }

        let projection = match filter.remove(PROJECTION_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::Document(doc)) => Some(doc),
            Some(other) => {
                return Err(DocumapError::new(
                    &format!(
                        "Filter control '{}' must be a document, got {:?}",
                        PROJECTION_KEY, other
                    ),
                    ErrorKind::InvalidQuery,
                ))
            }
        };
        let skip = extract_control_integer(filter, SKIP_KEY)?;
        let limit = extract_control_integer(filter, LIMIT_KEY)?;

        for key in filter.keys() {
            if key != DOC_ID && !M::FIELD_NAMES.contains(&key.as_str()) {
                return Err(DocumapError::new(
                    &format!(
                        "Field '{}' does not exist for model '{}'",
                        key,
                        M::model_name()
                    ),
                    ErrorKind::FieldDoesNotExist,
                ));
            }
        }

        Ok(FindOptions {
            projection,
            skip,
            limit,
        })
    }

    /// Persists a model and returns the stored copy.
    ///
    /// Serializes via the model contract and submits a single-document
    /// insert. Any store-level failure, duplicate-key violations from unique
    /// indexes included, is raised as [ErrorKind::Write] wrapping the
    /// underlying cause. On success the store-assigned identifier is placed
    /// into the document and a fresh model is reconstructed from it; the
    /// input instance is never mutated.
    pub fn save(&self, model: &M) -> DocumapResult<M> {
        let mut document = model.to_document()?;
        let collection = self.collection()?;

        let id = collection.insert_one(document.clone()).map_err(|e| {
            DocumapError::new_with_cause(
                &format!(
                    "Error inserting document into collection '{}'",
                    self.collection_name
                ),
                ErrorKind::Write,
                e,
            )
        })?;

        document.put(DOC_ID, id);
        match M::from_document(document)? {
            Some(saved) => Ok(saved),
            None => Err(DocumapError::new(
                "Saved document reconstructed to nothing",
                ErrorKind::Internal,
            )),
        }
    }

    /// Fetches the unique model matching a filter.
    ///
    /// Issues a find capped at 2 results: the cheapest way to tell "exactly
    /// one" from "more than one" without a separate count query. Zero matches
    /// raise [ErrorKind::DoesNotExist]; two or more raise
    /// [ErrorKind::MultipleObjectsReturned] rather than silently returning an
    /// arbitrary pick. Projection/skip/limit controls in the filter are
    /// extracted and ignored.
    pub fn get(&self, mut filter: Document) -> DocumapResult<M> {
        self.process_filter(&mut filter)?;
        let collection = self.collection()?;

        let mut cursor = collection
            .find(filter, FindOptions::new().limit(2))
            .map_err(wrap_cursor_error)?;

        let first = match cursor.next() {
            Some(Ok(doc)) => doc,
            Some(Err(e)) => return Err(wrap_cursor_error(e)),
            None => {
                return Err(DocumapError::new(
                    "Document not found",
                    ErrorKind::DoesNotExist,
                ))
            }
        };

        match cursor.next() {
            None => {}
            Some(Ok(_)) => {
                return Err(DocumapError::new(
                    "2 or more documents returned, instead of 1",
                    ErrorKind::MultipleObjectsReturned,
                ))
            }
            Some(Err(e)) => return Err(wrap_cursor_error(e)),
        }

        match M::from_document(first)? {
            Some(model) => Ok(model),
            None => Err(DocumapError::new(
                "Document not found",
                ErrorKind::DoesNotExist,
            )),
        }
    }

    /// Queries the collection and lazily maps matching documents to models.
    ///
    /// The filter is processed eagerly, so an unknown field name or malformed
    /// `id` surfaces here, before any store round trip. The store may defer
    /// query evaluation to the first pull of the returned cursor, so a
    /// malformed predicate value can surface as [ErrorKind::InvalidQuery]
    /// during iteration instead.
    pub fn find(&self, mut filter: Document) -> DocumapResult<ModelCursor<M>> {
        let options = self.process_filter(&mut filter)?;
        let collection = self.collection()?;
        let cursor = collection.find(filter, options).map_err(wrap_cursor_error)?;
        Ok(ModelCursor::new(cursor))
    }

    /// Submits an aggregation pipeline verbatim and lazily maps each output
    /// document to a model.
    ///
    /// Each stage is an opaque document describing one native aggregation
    /// stage. A store-level pipeline error, such as an unknown stage
    /// operator, surfaces as [ErrorKind::InvalidQuery] at iteration time.
    pub fn aggregate(&self, pipeline: Vec<Document>) -> DocumapResult<ModelCursor<M>> {
        let collection = self.collection()?;
        let cursor = collection.aggregate(pipeline).map_err(wrap_cursor_error)?;
        Ok(ModelCursor::new(cursor))
    }
}

impl<M: Model> Debug for Repository<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("model", &M::model_name())
            .field("collection_name", &self.collection_name)
            .field("indexes", &self.indexes)
            .field("auto_create_index", &self.auto_create_index)
            .finish_non_exhaustive()
    }
}

fn extract_control_integer(filter: &mut Document, key: &str) -> DocumapResult<u64> {
    match filter.remove(key) {
        None => Ok(0),
        Some(value) => match value.as_i64() {
            Some(n) if n >= 0 => Ok(n as u64),
            _ => Err(DocumapError::new(
                &format!(
                    "Filter control '{}' must be a non-negative integer, got {:?}",
                    key, value
                ),
                ErrorKind::InvalidQuery,
            )),
        },
    }
}

/// Builder validating a repository binding before any usable handle exists.
///
/// The model type is carried in the type parameter; the collection name must
/// be supplied explicitly. [RepositoryBuilder::build] rejects an incomplete
/// binding with [ErrorKind::IncompleteBinding] at construction time rather
/// than deferring the failure to the first operation.
pub struct RepositoryBuilder<M: Model> {
    client: Arc<dyn StoreClient>,
    collection_name: Option<String>,
    indexes: Vec<Index>,
    auto_create_index: bool,
    _phantom: PhantomData<M>,
}

impl<M: Model> RepositoryBuilder<M> {
    /// Names the collection this repository binds to.
    pub fn collection(mut self, name: &str) -> Self {
        self.collection_name = Some(name.to_string());
        self
    }

    /// Adds one index declaration.
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds several index declarations.
    pub fn indexes(mut self, indexes: Vec<Index>) -> Self {
        self.indexes.extend(indexes);
        self
    }

    /// Controls whether declared indexes are created on first collection
    /// access. Enabled by default.
    pub fn auto_create_index(mut self, enabled: bool) -> Self {
        self.auto_create_index = enabled;
        self
    }

    /// Validates the binding and returns the repository handle.
    pub fn build(self) -> DocumapResult<Repository<M>> {
        let collection_name = match self.collection_name {
            Some(name) if !name.is_empty() => name,
            _ => {
                log::error!(
                    "Repository binding for model '{}' is missing its collection name",
                    M::model_name()
                );
                return Err(DocumapError::new(
                    &format!(
                        "Repository binding for model '{}' requires a collection name",
                        M::model_name()
                    ),
                    ErrorKind::IncompleteBinding,
                ));
            }
        };

        Ok(Repository {
            client: self.client,
            collection_name,
            indexes: self.indexes,
            auto_create_index: self.auto_create_index,
            collection: OnceCell::new(),
            _phantom: PhantomData,
        })
    }
}
