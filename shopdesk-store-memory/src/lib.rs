//! In-memory document storage backend for shopdesk.
//!
//! A thread-safe implementation of [`StoreBackend`](shopdesk_store::backend::StoreBackend)
//! that keeps every collection in process memory. The service selects it with
//! `STORE_BACKEND=memory`; the integration tests run the whole HTTP surface on it.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Same matching rules as MongoDB** - Case-insensitive text search, dotted paths
//! - **Unique indexes** - Enforced on insert, update and patch
//! - **Revision tracking** - Records the migration revision like any other backend
//!
//! # Quick Start
//!
//! ```ignore
//! use shopdesk_store::{backend::StoreBackendBuilder, store::{DocumentStore, IntoDynDocumentStore}};
//! use shopdesk_store_memory::InMemoryStore;
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let store = DocumentStore::new(backend).into_dyn();
//! let categories = store.collection("categories");
//! ```

#[allow(unused_extern_crates)]
extern crate self as shopdesk_store_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
