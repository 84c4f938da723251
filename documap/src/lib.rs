//! # documap - Typed Object-Document Mapping
//!
//! documap is a thin object-document mapping layer over a document store.
//! It maps typed model records to flat documents, routes filtered queries
//! through a repository abstraction, and manages declarative secondary
//! indexes. The store driver itself is a black box behind the
//! [store::StoreClient] boundary; documap is a translation and orchestration
//! layer in front of it, not a query planner or storage engine.
//!
//! ## Key pieces
//!
//! - **Models**: any type implementing [model::Model] maps bidirectionally
//!   between its in-memory record and a flat [common::Document], with the
//!   store-owned identifier synthesized on first save
//! - **Repositories**: a [repository::Repository] binds one model type to one
//!   named collection and exposes `save`/`get`/`find`/`aggregate`, including
//!   the kwarg-style filter translation and the one-result-or-error `get`
//! - **Indexes**: [index::Index] declarations are materialized against the
//!   store once per binding, lazily, on first collection access
//! - **Safe decorator**: [repository::SafeRepository] converts every declared
//!   runtime failure into a logged null or empty result
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use documap::doc;
//! use documap::index::Index;
//! use documap::repository::Repository;
//! use documap::store::MemoryClient;
//! use std::sync::Arc;
//!
//! # fn main() -> documap::errors::DocumapResult<()> {
//! let client = Arc::new(MemoryClient::new());
//!
//! let users: Repository<User> = Repository::builder(client)
//!     .collection("users")
//!     .index(Index::on(vec!["email"]).unique())
//!     .build()?;
//!
//! let alice = users.save(&User::new("Alice", "alice@example.com", 30))?;
//! let found = users.get(doc! { "email": "alice@example.com" })?;
//!
//! for user in users.find(doc! { "age": 30 })? {
//!     println!("{}", user?.name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module organization
//!
//! - [`common`] - value and document types, reserved keys, the `doc!` macro
//! - [`errors`] - error type and result definitions
//! - [`index`] - index declarations and their native translation
//! - [`model`] - the storable-type contract
//! - [`oid`] - the native identifier and its string codec
//! - [`repository`] - typed repositories, cursors, and the safe decorator
//! - [`store`] - the store-driver boundary and the in-memory reference store

pub mod common;
pub mod errors;
pub mod index;
pub mod model;
pub mod oid;
pub mod repository;
pub mod store;
