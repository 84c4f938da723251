use crate::common::Document;
use crate::errors::DocumapResult;
use crate::model::Model;
use crate::repository::{ModelCursor, Repository};
use std::ops::Deref;

/// A repository decorator that logs errors instead of propagating them.
///
/// # Purpose
/// Wraps every repository operation, catches the declared runtime error
/// kinds, logs them, and substitutes a null or empty result: `save` and `get`
/// return `Ok(None)`, `find` and `aggregate` return an empty sequence that
/// terminates normally. See [ErrorKind::recoverable](crate::errors::ErrorKind::recoverable)
/// for the exact set of swallowed kinds.
///
/// Errors outside that set are programming errors and are NOT caught: a
/// broken model mapping still comes back as `Err`. Definition-time errors
/// happen before a `SafeRepository` can exist.
///
/// # Composition
/// The decorator derefs to the wrapped [Repository], so the raising contract
/// stays reachable through the same handle:
///
/// ```rust,ignore
/// let safe = Repository::builder(client)
///     .collection("users")
///     .build()?
///     .into_safe();
///
/// if let Some(user) = safe.get(doc! { "email": "x@example.com" })? {
///     // found exactly one
/// }
/// ```
pub struct SafeRepository<M: Model> {
    inner: Repository<M>,
}

impl<M: Model> SafeRepository<M> {
    pub fn new(inner: Repository<M>) -> Self {
        SafeRepository { inner }
    }

    /// Unwraps the decorator, returning the raising repository.
    pub fn into_inner(self) -> Repository<M> {
        self.inner
    }

    /// Saves a model, substituting `Ok(None)` for any declared runtime
    /// failure (write errors, uniqueness conflicts, index bootstrap
    /// failures), always after logging it.
    pub fn save(&self, model: &M) -> DocumapResult<Option<M>> {
        match self.inner.save(model) {
            Ok(saved) => Ok(Some(saved)),
            Err(e) if e.kind().recoverable() => {
                log::error!(
                    "save on collection '{}' failed: {}",
                    self.inner.collection_name(),
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches a unique model, substituting `Ok(None)` for "not found",
    /// "more than one", and query-translation failures.
    pub fn get(&self, filter: Document) -> DocumapResult<Option<M>> {
        match self.inner.get(filter) {
            Ok(model) => Ok(Some(model)),
            Err(e) if e.kind().recoverable() => {
                log::error!(
                    "get on collection '{}' failed: {}",
                    self.inner.collection_name(),
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Queries the collection; any call-time failure yields an empty cursor.
    ///
    /// Every call-time error kind of `find` is in the declared taxonomy, so
    /// this operation is infallible. Iteration-time errors are logged by the
    /// returned [SafeCursor] and terminate the sequence.
    pub fn find(&self, filter: Document) -> SafeCursor<M> {
        match self.inner.find(filter) {
            Ok(cursor) => SafeCursor::new(cursor, self.inner.collection_name()),
            Err(e) => {
                log::error!(
                    "find on collection '{}' failed: {}",
                    self.inner.collection_name(),
                    e
                );
                SafeCursor::exhausted()
            }
        }
    }

    /// Runs an aggregation pipeline; any call-time failure yields an empty
    /// cursor, and iteration-time failures are logged and terminal.
    pub fn aggregate(&self, pipeline: Vec<Document>) -> SafeCursor<M> {
        match self.inner.aggregate(pipeline) {
            Ok(cursor) => SafeCursor::new(cursor, self.inner.collection_name()),
            Err(e) => {
                log::error!(
                    "aggregate on collection '{}' failed: {}",
                    self.inner.collection_name(),
                    e
                );
                SafeCursor::exhausted()
            }
        }
    }
}

impl<M: Model> Deref for SafeRepository<M> {
    type Target = Repository<M>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M: Model> Repository<M> {
    /// Wraps this repository in the log-and-substitute decorator.
    pub fn into_safe(self) -> SafeRepository<M> {
        SafeRepository::new(self)
    }
}

/// A model sequence that never yields errors.
///
/// Consuming a cursor whose underlying query failed yields zero items and
/// terminates normally. The first iteration-time error is logged with its
/// kind and ends the sequence, so a failed sequence is never silently
/// identical to a merely empty one in the logs.
pub struct SafeCursor<M> {
    cursor: Option<ModelCursor<M>>,
    collection: String,
}

impl<M: Model> SafeCursor<M> {
    fn new(cursor: ModelCursor<M>, collection: &str) -> Self {
        SafeCursor {
            cursor: Some(cursor),
            collection: collection.to_string(),
        }
    }

    fn exhausted() -> Self {
        SafeCursor {
            cursor: None,
            collection: String::new(),
        }
    }
}

impl<M: Model> Iterator for SafeCursor<M> {
    type Item = M;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.next() {
            Some(Ok(model)) => Some(model),
            Some(Err(e)) => {
                log::error!(
                    "cursor on collection '{}' failed ({}): {}",
                    self.collection,
                    e.kind(),
                    e
                );
                self.cursor = None;
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Value, DOC_ID};
    use crate::doc;
    use crate::errors::{DocumapError, DocumapResult, ErrorKind};
    use crate::index::Index;
    use crate::model::{field_mapping_error, take_id};
    use crate::oid::ObjectId;
    use crate::store::MemoryClient;
    use std::sync::Arc;

    #[derive(Debug)]
    struct User {
        id: Option<ObjectId>,
        name: String,
        email: String,
    }

    impl User {
        fn new(name: &str, email: &str) -> Self {
            User {
                id: None,
                name: name.to_string(),
                email: email.to_string(),
            }
        }
    }

    impl Model for User {
        const FIELD_NAMES: &'static [&'static str] = &["name", "email"];

        fn model_name() -> &'static str {
            "User"
        }

        fn from_document(mut doc: Document) -> DocumapResult<Option<Self>> {
            if doc.is_empty() {
                return Ok(None);
            }
            let id = take_id(&mut doc)?;
            let name = match doc.remove("name") {
                Some(Value::String(s)) => s,
                other => return Err(field_mapping_error("User", "name", other.as_ref())),
            };
            let email = match doc.remove("email") {
                Some(Value::String(s)) => s,
                other => return Err(field_mapping_error("User", "email", other.as_ref())),
            };
            Ok(Some(User { id, name, email }))
        }

        fn to_document(&self) -> DocumapResult<Document> {
            Ok(doc! {
                "name": (self.name.clone()),
                "email": (self.email.clone()),
            })
        }

        fn id(&self) -> Option<&ObjectId> {
            self.id.as_ref()
        }
    }

    fn safe_repository() -> SafeRepository<User> {
        Repository::builder(Arc::new(MemoryClient::new()))
            .collection("users")
            .index(Index::on(vec!["email"]).unique())
            .build()
            .unwrap()
            .into_safe()
    }

    #[test]
    fn test_get_not_found_substitutes_none() {
        let repo = safe_repository();
        let result = repo.get(doc! { "name": "Nobody" }).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_get_multiple_matches_substitutes_none() {
        let repo = safe_repository();
        repo.save(&User::new("Alice", "a@example.com")).unwrap();
        repo.save(&User::new("Alice", "b@example.com")).unwrap();
        let result = repo.get(doc! { "name": "Alice" }).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_duplicate_save_substitutes_none() {
        let repo = safe_repository();
        let first = repo.save(&User::new("Alice", "x@example.com")).unwrap();
        assert!(first.is_some());

        let second = repo.save(&User::new("Bob", "x@example.com")).unwrap();
        assert!(second.is_none());

        // a non-colliding save still goes through after the conflict
        let third = repo.save(&User::new("Carol", "y@example.com")).unwrap();
        assert!(third.is_some());
    }

    #[test]
    fn test_find_with_unknown_field_yields_empty_sequence() {
        let repo = safe_repository();
        repo.save(&User::new("Alice", "a@example.com")).unwrap();
        let found: Vec<User> = repo.find(doc! { "nickname": "Al" }).collect();
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_passes_matches_through() {
        let repo = safe_repository();
        repo.save(&User::new("Alice", "a@example.com")).unwrap();
        repo.save(&User::new("Bob", "b@example.com")).unwrap();

        let found: Vec<User> = repo.find(doc! { "name": "Alice" }).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Alice");
    }

    #[test]
    fn test_aggregate_with_unknown_stage_yields_empty_sequence() {
        let repo = safe_repository();
        repo.save(&User::new("Alice", "a@example.com")).unwrap();
        let found: Vec<User> = repo.aggregate(vec![doc! { "$explode": 1 }]).collect();
        assert!(found.is_empty());
    }

    #[test]
    fn test_mapping_errors_are_not_swallowed() {
        use crate::store::StoreClient;

        let client = Arc::new(MemoryClient::new());
        // bypass the model contract to store a document get cannot map
        let raw = client.collection("users").unwrap();
        raw.insert_one(doc! { "name": 42, "email": "a@example.com" }).unwrap();

        let repo = Repository::<User>::builder(client)
            .collection("users")
            .build()
            .unwrap()
            .into_safe();

        let result = repo.get(doc! { "email": "a@example.com" });
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::ModelMapping);
    }

    #[test]
    fn test_deref_exposes_raising_contract() {
        let repo = safe_repository();
        let result = repo.deref().get(doc! { "name": "Nobody" });
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::DoesNotExist);
    }

    #[test]
    fn test_into_inner_round_trip() {
        let repo = safe_repository();
        let inner = repo.into_inner();
        assert_eq!(inner.collection_name(), "users");
    }

    #[test]
    fn test_errors_are_logged_not_raised_for_malformed_id() {
        let repo = safe_repository();
        let result = repo.get(doc! { "id": "definitely-not-hex" }).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_safe_cursor_terminates_after_iteration_error() {
        let docs = vec![
            Ok({
                let mut d = doc! { "name": "Alice", "email": "a@example.com" };
                d.put(DOC_ID, ObjectId::new());
                d
            }),
            Err(DocumapError::new("cursor torn down", ErrorKind::InvalidQuery)),
            Ok({
                let mut d = doc! { "name": "Bob", "email": "b@example.com" };
                d.put(DOC_ID, ObjectId::new());
                d
            }),
        ];
        let cursor: ModelCursor<User> =
            ModelCursor::new(crate::store::DocumentCursor::new(Box::new(docs.into_iter())));
        let mut safe = SafeCursor::new(cursor, "users");

        assert_eq!(safe.next().unwrap().name, "Alice");
        // the error is logged and terminal; Bob is never reached
        assert!(safe.next().is_none());
        assert!(safe.next().is_none());
    }
}
