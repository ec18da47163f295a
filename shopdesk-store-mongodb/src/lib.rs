//! MongoDB backend for shopdesk.
//!
//! Implements [`StoreBackend`](shopdesk_store::backend::StoreBackend) on top of the
//! official async driver. This is the production backend; select it with
//! `STORE_BACKEND=mongodb` and point `MONGODB_URI` at the server.
//!
//! # Features
//!
//! - **Native queries** - Filter expressions are translated to MongoDB query documents
//! - **Literal text search** - `contains` filters escape regex metacharacters
//! - **Indexing** - Single-field ascending indexes, optionally unique
//! - **Duplicate detection** - Unique index violations surface as `DocumentAlreadyExists`
//!
//! # Example
//!
//! ```ignore
//! use shopdesk_store::backend::StoreBackendBuilder;
//! use shopdesk_store_mongodb::MongoDbStore;
//!
//! let backend = MongoDbStore::builder("mongodb://localhost:27017", "ecommerce")
//!     .build()
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as shopdesk_store_mongodb;

pub mod query;
pub mod sanitizer;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
