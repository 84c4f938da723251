use crate::common::{Document, Value, DOC_ID};
use crate::errors::{DocumapError, DocumapResult, ErrorKind};
use crate::index::NativeIndexSpec;
use crate::oid::ObjectId;
use crate::store::{DocumentCursor, FindOptions, StoreClient, StoreCollection, StoreCollectionRef};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// In-process store client backing collections with plain memory.
///
/// # Purpose
/// The reference implementation of the driver boundary, used by the test
/// suites and by embeddable deployments that do not need durability. Supports
/// equality-match find with projection/skip/limit, identifier assignment on
/// insert, unique-index enforcement, and a small aggregation interpreter.
///
/// # Characteristics
/// - Thread-safe: collections are shared behind `Arc` and locked per call
/// - Collections materialize on first access and live for the client lifetime
/// - Not a storage engine: no durability, no query optimization
pub struct MemoryClient {
    collections: DashMap<String, StoreCollectionRef>,
}

impl MemoryClient {
    pub fn new() -> Self {
        MemoryClient {
            collections: DashMap::new(),
        }
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        MemoryClient::new()
    }
}

impl StoreClient for MemoryClient {
    fn collection(&self, name: &str) -> DocumapResult<StoreCollectionRef> {
        let entry = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)) as StoreCollectionRef);
        Ok(entry.value().clone())
    }
}

struct CollectionState {
    documents: Vec<Document>,
    indexes: Vec<NativeIndexSpec>,
}

/// A single in-memory collection.
///
/// Unique indexes are enforced on insert; sparse indexes skip documents whose
/// indexed fields are all absent. Text, background, and TTL index attributes
/// are recorded but inert in memory.
pub struct MemoryCollection {
    name: String,
    state: RwLock<CollectionState>,
}

impl MemoryCollection {
    pub fn new(name: &str) -> Self {
        MemoryCollection {
            name: name.to_string(),
            state: RwLock::new(CollectionState {
                documents: Vec::new(),
                indexes: Vec::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored documents.
    pub fn size(&self) -> usize {
        self.state.read().documents.len()
    }

    fn check_unique_indexes(
        &self,
        state: &CollectionState,
        candidate: &Document,
    ) -> DocumapResult<()> {
        for spec in state.indexes.iter().filter(|spec| spec.unique) {
            let candidate_key = index_key(spec, candidate);
            if spec.sparse && candidate_key.iter().all(Value::is_null) {
                continue;
            }

            for existing in &state.documents {
                let existing_key = index_key(spec, existing);
                if spec.sparse && existing_key.iter().all(Value::is_null) {
                    continue;
                }
                if existing_key == candidate_key {
                    return Err(DocumapError::new(
                        &format!(
                            "Duplicate value for unique index '{}' on collection '{}'",
                            spec.describe(),
                            self.name
                        ),
                        ErrorKind::UniqueViolation,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl StoreCollection for MemoryCollection {
    fn find(&self, filter: Document, options: FindOptions) -> DocumapResult<DocumentCursor> {
        let state = self.state.read();
        let mut results = Vec::new();
        let mut skipped = 0u64;
        for document in &state.documents {
            if !matches_filter(document, &filter) {
                continue;
            }
            if skipped < options.skip {
                skipped += 1;
                continue;
            }
            let projected = match &options.projection {
                Some(projection) => apply_projection(document, projection),
                None => document.clone(),
            };
            results.push(Ok(projected));
            if options.limit > 0 && results.len() as u64 >= options.limit {
                break;
            }
        }
        Ok(DocumentCursor::new(Box::new(results.into_iter())))
    }

    fn insert_one(&self, document: Document) -> DocumapResult<ObjectId> {
        let mut state = self.state.write();
        self.check_unique_indexes(&state, &document)?;

        let mut document = document;
        let id = match document.get(DOC_ID).and_then(Value::as_object_id) {
            Some(existing) => *existing,
            None => {
                let id = ObjectId::new();
                document.put(DOC_ID, id);
                id
            }
        };
        state.documents.push(document);
        Ok(id)
    }

    fn aggregate(&self, pipeline: Vec<Document>) -> DocumapResult<DocumentCursor> {
        // Evaluation is deferred to the first cursor pull, the way a remote
        // driver defers the round trip. A malformed stage therefore surfaces
        // at iteration time, not here.
        let snapshot = self.state.read().documents.clone();
        let cursor = PipelineCursor {
            pending: Some((snapshot, pipeline)),
            results: Vec::new().into_iter(),
            failed: false,
        };
        Ok(DocumentCursor::new(Box::new(cursor)))
    }

    fn create_indexes(&self, specs: Vec<NativeIndexSpec>) -> DocumapResult<()> {
        let mut state = self.state.write();
        for spec in specs {
            if state.indexes.contains(&spec) {
                continue;
            }
            if spec.unique {
                verify_existing_documents(&state.documents, &spec, &self.name)?;
            }
            log::debug!(
                "Created index '{}' on collection '{}'",
                spec.describe(),
                self.name
            );
            state.indexes.push(spec);
        }
        Ok(())
    }
}

/// Rejects a new unique index when stored documents already collide on it.
fn verify_existing_documents(
    documents: &[Document],
    spec: &NativeIndexSpec,
    collection: &str,
) -> DocumapResult<()> {
    let mut seen: Vec<Vec<Value>> = Vec::with_capacity(documents.len());
    for document in documents {
        let key = index_key(spec, document);
        if spec.sparse && key.iter().all(Value::is_null) {
            continue;
        }
        if seen.contains(&key) {
            return Err(DocumapError::new(
                &format!(
                    "Cannot create unique index '{}' on collection '{}': existing documents collide",
                    spec.describe(),
                    collection
                ),
                ErrorKind::UniqueViolation,
            ));
        }
        seen.push(key);
    }
    Ok(())
}

fn index_key(spec: &NativeIndexSpec, document: &Document) -> Vec<Value> {
    spec.keys
        .iter()
        .map(|(field, _)| document.get(field).cloned().unwrap_or(Value::Null))
        .collect()
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| {
        document
            .get(key)
            .map(|actual| values_equal(actual, expected))
            .unwrap_or(false)
    })
}

// Numeric values compare across integer widths and floats, the way a
// document store treats 30, 30i64 and 30.0 as the same value.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        other => other.as_i64().map(|n| n != 0).unwrap_or(false),
    }
}

fn apply_projection(document: &Document, projection: &Document) -> Document {
    let inclusion = projection
        .iter()
        .any(|(key, value)| key != DOC_ID && is_truthy(value));

    if inclusion {
        let mut projected = Document::new();
        // _id is carried through inclusion projections unless excluded by name
        let keep_id = projection
            .get(DOC_ID)
            .map(is_truthy)
            .unwrap_or(true);
        if keep_id {
            if let Some(id) = document.get(DOC_ID) {
                projected.put(DOC_ID, id.clone());
            }
        }
        for (key, value) in document.iter() {
            if key == DOC_ID {
                continue;
            }
            if projection.get(key).map(is_truthy).unwrap_or(false) {
                projected.put(key, value.clone());
            }
        }
        projected
    } else {
        let mut projected = document.clone();
        for (key, _) in projection.iter() {
            projected.remove(key);
        }
        projected
    }
}

struct PipelineCursor {
    pending: Option<(Vec<Document>, Vec<Document>)>,
    results: std::vec::IntoIter<Document>,
    failed: bool,
}

impl Iterator for PipelineCursor {
    type Item = DocumapResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((documents, pipeline)) = self.pending.take() {
            match run_pipeline(documents, &pipeline) {
                Ok(results) => self.results = results.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        if self.failed {
            return None;
        }
        self.results.next().map(Ok)
    }
}

/// The small stage interpreter: `$match`, `$skip`, `$limit`, `$count`.
fn run_pipeline(mut documents: Vec<Document>, pipeline: &[Document]) -> DocumapResult<Vec<Document>> {
    for stage in pipeline {
        if stage.len() != 1 {
            return Err(DocumapError::new(
                &format!("Pipeline stage must have exactly one operator, got {}", stage),
                ErrorKind::InvalidQuery,
            ));
        }
        let Some((operator, argument)) = stage.iter().next() else {
            continue;
        };

        match operator.as_str() {
            "$match" => {
                let predicate = argument.as_document().ok_or_else(|| {
                    DocumapError::new(
                        "$match stage requires a document argument",
                        ErrorKind::InvalidQuery,
                    )
                })?;
                documents.retain(|doc| matches_filter(doc, predicate));
            }
            "$skip" => {
                let n = stage_integer(operator, argument)?;
                documents = documents.into_iter().skip(n as usize).collect();
            }
            "$limit" => {
                let n = stage_integer(operator, argument)?;
                documents.truncate(n as usize);
            }
            "$count" => {
                let field = argument.as_str().ok_or_else(|| {
                    DocumapError::new(
                        "$count stage requires a string field name",
                        ErrorKind::InvalidQuery,
                    )
                })?;
                let mut counted = Document::new();
                counted.put(field, documents.len() as i64);
                documents = vec![counted];
            }
            unknown => {
                return Err(DocumapError::new(
                    &format!("Unrecognized pipeline stage '{}'", unknown),
                    ErrorKind::InvalidQuery,
                ));
            }
        }
    }
    Ok(documents)
}

fn stage_integer(operator: &str, argument: &Value) -> DocumapResult<i64> {
    match argument.as_i64() {
        Some(n) if n >= 0 => Ok(n),
        _ => Err(DocumapError::new(
            &format!("{} stage requires a non-negative integer, got {:?}", operator, argument),
            ErrorKind::InvalidQuery,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    fn collection() -> MemoryCollection {
        MemoryCollection::new("people")
    }

    fn unique_email_index() -> NativeIndexSpec {
        crate::index::Index::on(vec!["email"]).unique().to_native().unwrap()
    }

    #[test]
    fn test_insert_assigns_id() {
        let coll = collection();
        let id = coll.insert_one(doc! { "name": "Alice" }).unwrap();
        let mut cursor = coll.find(doc! {}, FindOptions::default()).unwrap();
        let stored = cursor.next().unwrap().unwrap();
        assert_eq!(stored.get(DOC_ID).and_then(Value::as_object_id), Some(&id));
    }

    #[test]
    fn test_find_equality_match() {
        let coll = collection();
        coll.insert_one(doc! { "name": "Alice", "age": 30 }).unwrap();
        coll.insert_one(doc! { "name": "Bob", "age": 30 }).unwrap();
        coll.insert_one(doc! { "name": "Carol", "age": 41 }).unwrap();

        let cursor = coll.find(doc! { "age": 30 }, FindOptions::default()).unwrap();
        assert_eq!(cursor.count(), 2);

        let cursor = coll.find(doc! { "name": "Dave" }, FindOptions::default()).unwrap();
        assert_eq!(cursor.count(), 0);
    }

    #[test]
    fn test_find_matches_across_numeric_widths() {
        let coll = collection();
        coll.insert_one(doc! { "name": "Alice", "age": 30_i64 }).unwrap();

        let cursor = coll.find(doc! { "age": 30 }, FindOptions::default()).unwrap();
        assert_eq!(cursor.count(), 1);

        let cursor = coll.find(doc! { "age": 30.0 }, FindOptions::default()).unwrap();
        assert_eq!(cursor.count(), 1);
    }

    #[test]
    fn test_find_skip_and_limit() {
        let coll = collection();
        for i in 0..5 {
            coll.insert_one(doc! { "n": i }).unwrap();
        }
        let cursor = coll
            .find(doc! {}, FindOptions::new().skip(1).limit(2))
            .unwrap();
        let values: Vec<i64> = cursor
            .map(|doc| doc.unwrap().get("n").and_then(Value::as_i64).unwrap())
            .collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_inclusion_projection_keeps_id() {
        let coll = collection();
        coll.insert_one(doc! { "name": "Alice", "age": 30 }).unwrap();
        let mut cursor = coll
            .find(doc! {}, FindOptions::new().projection(doc! { "name": true }))
            .unwrap();
        let projected = cursor.next().unwrap().unwrap();
        assert!(projected.contains_key(DOC_ID));
        assert!(projected.contains_key("name"));
        assert!(!projected.contains_key("age"));
    }

    #[test]
    fn test_exclusion_projection_drops_listed_keys() {
        let coll = collection();
        coll.insert_one(doc! { "name": "Alice", "age": 30 }).unwrap();
        let mut cursor = coll
            .find(doc! {}, FindOptions::new().projection(doc! { "age": false }))
            .unwrap();
        let projected = cursor.next().unwrap().unwrap();
        assert!(projected.contains_key("name"));
        assert!(!projected.contains_key("age"));
    }

    #[test]
    fn test_unique_index_rejects_duplicate() {
        let coll = collection();
        coll.create_indexes(vec![unique_email_index()]).unwrap();
        coll.insert_one(doc! { "email": "x@example.com" }).unwrap();

        let result = coll.insert_one(doc! { "email": "x@example.com" });
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::UniqueViolation);

        // a non-colliding document still goes through
        coll.insert_one(doc! { "email": "y@example.com" }).unwrap();
        assert_eq!(coll.size(), 2);
    }

    #[test]
    fn test_sparse_unique_index_skips_absent_fields() {
        let coll = collection();
        let spec = crate::index::Index::on(vec!["email"])
            .unique()
            .sparse()
            .to_native()
            .unwrap();
        coll.create_indexes(vec![spec]).unwrap();

        coll.insert_one(doc! { "name": "Alice" }).unwrap();
        coll.insert_one(doc! { "name": "Bob" }).unwrap();
        assert_eq!(coll.size(), 2);
    }

    #[test]
    fn test_create_unique_index_fails_on_existing_collisions() {
        let coll = collection();
        coll.insert_one(doc! { "email": "x@example.com" }).unwrap();
        coll.insert_one(doc! { "email": "x@example.com" }).unwrap();

        let result = coll.create_indexes(vec![unique_email_index()]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), &ErrorKind::UniqueViolation);
    }

    #[test]
    fn test_create_indexes_is_idempotent() {
        let coll = collection();
        coll.create_indexes(vec![unique_email_index()]).unwrap();
        coll.create_indexes(vec![unique_email_index()]).unwrap();
        assert_eq!(coll.state.read().indexes.len(), 1);
    }

    #[test]
    fn test_aggregate_match_and_limit() {
        let coll = collection();
        coll.insert_one(doc! { "name": "Alice", "age": 30 }).unwrap();
        coll.insert_one(doc! { "name": "Bob", "age": 30 }).unwrap();
        coll.insert_one(doc! { "name": "Carol", "age": 41 }).unwrap();

        let pipeline = vec![doc! { "$match": { "age": 30 } }, doc! { "$limit": 1 }];
        let cursor = coll.aggregate(pipeline).unwrap();
        assert_eq!(cursor.count(), 1);
    }

    #[test]
    fn test_aggregate_count_stage() {
        let coll = collection();
        coll.insert_one(doc! { "age": 30 }).unwrap();
        coll.insert_one(doc! { "age": 30 }).unwrap();
        let pipeline = vec![doc! { "$match": { "age": 30 } }, doc! { "$count": "total" }];
        let mut cursor = coll.aggregate(pipeline).unwrap();
        let counted = cursor.next().unwrap().unwrap();
        assert_eq!(counted.get("total").and_then(Value::as_i64), Some(2));
    }

    #[test]
    fn test_aggregate_unknown_stage_fails_at_first_pull() {
        let coll = collection();
        coll.insert_one(doc! { "age": 30 }).unwrap();

        // submission succeeds; the error surfaces on iteration
        let mut cursor = coll.aggregate(vec![doc! { "$explode": 1 }]).unwrap();
        let first = cursor.next().unwrap();
        assert!(first.is_err());
        assert_eq!(first.unwrap_err().kind(), &ErrorKind::InvalidQuery);
        // the cursor is exhausted after the failure
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_aggregate_malformed_skip_argument() {
        let coll = collection();
        coll.insert_one(doc! { "age": 30 }).unwrap();
        let mut cursor = coll.aggregate(vec![doc! { "$skip": "three" }]).unwrap();
        assert!(cursor.next().unwrap().is_err());
    }

    #[test]
    fn test_client_returns_same_collection_handle() {
        let client = MemoryClient::new();
        let first = client.collection("users").unwrap();
        first.insert_one(doc! { "name": "Alice" }).unwrap();

        let second = client.collection("users").unwrap();
        let cursor = second.find(doc! {}, FindOptions::default()).unwrap();
        assert_eq!(cursor.count(), 1);
    }
}
