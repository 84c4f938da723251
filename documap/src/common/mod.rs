//! Common value and document types shared across the crate.
//!
//! A [Document] is a flat key-value map where keys are strings and values are
//! [Value] objects. Documents are both the persisted shape of a model and the
//! filter shape handed to repository queries.
//!
//! # Reserved fields
//!
//! - `_id` - the store-assigned identifier on persisted documents
//! - `id` - the human-facing identifier on model records and in filters
//! - `projection`, `skip`, `limit` - query control keys, extracted from
//!   filters before they reach the store

mod constants;
mod document;
mod value;

pub use constants::*;
pub use document::*;
pub use value::*;
