//! Store-driver boundary.
//!
//! The mapping layer treats the underlying document store as a black box
//! reached through the [StoreClient] and [StoreCollection] traits: keyed
//! collection access, filtered find, single-document insert, aggregation, and
//! index creation. A driver adapter implements these traits; the crate ships
//! [memory::MemoryClient] as the in-process reference implementation.

mod memory;

pub use memory::*;

use crate::common::Document;
use crate::errors::DocumapResult;
use crate::index::NativeIndexSpec;
use crate::oid::ObjectId;
use std::sync::Arc;

/// Shared handle to a driver-side collection.
pub type StoreCollectionRef = Arc<dyn StoreCollection>;

/// Keyed collection access on a store connection.
///
/// One logical client handle is shared process-wide; repositories clone the
/// `Arc` they are built with and never manage the connection lifecycle.
pub trait StoreClient: Send + Sync {
    /// Returns a handle to the named collection, creating it if the store
    /// materializes collections on first access.
    fn collection(&self, name: &str) -> DocumapResult<StoreCollectionRef>;
}

/// Driver operations consumed by the repository.
///
/// All calls are synchronous and blocking. `find` and `aggregate` return a
/// [DocumentCursor]; the driver may defer query evaluation until the cursor
/// is first pulled, which is why a malformed predicate can surface at
/// iteration time rather than at call time.
pub trait StoreCollection: Send + Sync {
    /// Issues a filtered find with the given control parameters.
    fn find(&self, filter: Document, options: FindOptions) -> DocumapResult<DocumentCursor>;

    /// Inserts a single document and returns the store-assigned identifier.
    fn insert_one(&self, document: Document) -> DocumapResult<ObjectId>;

    /// Submits an aggregation pipeline verbatim, one opaque stage document
    /// per native stage.
    fn aggregate(&self, pipeline: Vec<Document>) -> DocumapResult<DocumentCursor>;

    /// Creates all given indexes in one request. Idempotent at the store.
    fn create_indexes(&self, specs: Vec<NativeIndexSpec>) -> DocumapResult<()>;
}

/// Control parameters for a find, extracted from the reserved filter keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Inclusion/exclusion projection spec, if any.
    pub projection: Option<Document>,
    /// Number of matching documents to omit from the front of the result.
    pub skip: u64,
    /// Maximum number of results; 0 means unbounded.
    pub limit: u64,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }
}

/// A store-side handle over a result set, consumed incrementally.
///
/// Single-pass and forward-only. An unconsumed cursor holds whatever
/// store-side resource the driver ties to it until dropped; consumers stop
/// early by simply ceasing iteration, and the driver's own cursor-timeout
/// behavior bounds the resource lifetime.
pub struct DocumentCursor {
    iter: Box<dyn Iterator<Item = DocumapResult<Document>> + Send>,
}

impl DocumentCursor {
    pub fn new(iter: Box<dyn Iterator<Item = DocumapResult<Document>> + Send>) -> Self {
        DocumentCursor { iter }
    }

    /// A cursor over no documents.
    pub fn empty() -> Self {
        DocumentCursor {
            iter: Box::new(std::iter::empty()),
        }
    }
}

impl Iterator for DocumentCursor {
    type Item = DocumapResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::errors::{DocumapError, ErrorKind};

    #[test]
    fn test_empty_cursor_yields_nothing() {
        let mut cursor = DocumentCursor::empty();
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_cursor_is_single_pass() {
        let docs = vec![Ok(doc! { "a": 1 }), Ok(doc! { "a": 2 })];
        let mut cursor = DocumentCursor::new(Box::new(docs.into_iter()));
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_some());
        assert!(cursor.next().is_none());
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_cursor_carries_errors() {
        let docs = vec![
            Ok(doc! { "a": 1 }),
            Err(DocumapError::new("cursor torn down", ErrorKind::InvalidQuery)),
        ];
        let mut cursor = DocumentCursor::new(Box::new(docs.into_iter()));
        assert!(cursor.next().unwrap().is_ok());
        assert!(cursor.next().unwrap().is_err());
    }

    #[test]
    fn test_find_options_builder() {
        let options = FindOptions::new().skip(5).limit(10).projection(doc! { "name": true });
        assert_eq!(options.skip, 5);
        assert_eq!(options.limit, 10);
        assert!(options.projection.is_some());
    }

    #[test]
    fn test_find_options_defaults() {
        let options = FindOptions::default();
        assert_eq!(options.skip, 0);
        assert_eq!(options.limit, 0);
        assert!(options.projection.is_none());
    }
}
