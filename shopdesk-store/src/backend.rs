//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that abstract over storage implementations so the
//! service can run against MongoDB in production and an in-process store in tests.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: Object-safe mirror of [`StoreBackend`] for runtime backend selection
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use shopdesk_store::backend::StoreBackend;
//! use bson::{Uuid, Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = Uuid::new();
//! let doc = Bson::Document(doc! { "id": id, "name": "Chairs" });
//! backend.insert_documents(vec![(id, doc)], "categories").await?;
//!
//! let matched = backend
//!     .patch_document(id, doc! { "name": "Office chairs" }, "categories")
//!     .await?;
//! assert!(matched);
//! ```

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// Abstract interface for document storage backends.
///
/// Every method is scoped to a collection name. Documents are BSON documents keyed
/// by a UUID; the key is also expected to be present in the body as `id`.
///
/// # Thread Safety
///
/// Implementations must be safe to share between concurrent request handlers.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Driver-specific failures are reported as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend); a
/// duplicate key on insert is
/// [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// The collection is created on first use. Inserting an id that already exists
    /// fails with `DocumentAlreadyExists`.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents entirely.
    ///
    /// Fails with `DocumentNotFound` when an id does not exist.
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Merges `fields` into the top level of one document, leaving other fields untouched.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when a document with `id` existed, `Ok(false)` otherwise.
    async fn patch_document(
        &self,
        id: Uuid,
        fields: BsonDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;

    /// Appends `value` to the array stored under `field`, creating the array if needed.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when a document with `id` existed, `Ok(false)` otherwise.
    async fn append_to_array(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        collection: &str,
    ) -> DocumentStoreResult<bool>;

    /// Deletes documents by id.
    ///
    /// Missing ids are skipped.
    ///
    /// # Returns
    ///
    /// The number of documents that were removed.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<u64>;

    /// Retrieves documents by id.
    ///
    /// Missing ids are omitted; result order is not guaranteed to match `ids`.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents using a structured query.
    ///
    /// # See Also
    ///
    /// - [`Query`] for constructing queries
    /// - [`crate::query::Filter`] for building filter expressions
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts the documents matching `filter` (all documents when `None`).
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;

    /// Retrieves the revision id last recorded by the migration runner.
    async fn current_revision_id(&self) -> DocumentStoreResult<Option<String>>;

    /// Records the revision id of the last applied migration.
    async fn set_revision_id(&self, revision_id: &str) -> DocumentStoreResult<()>;

    /// Creates a collection. Creating a collection that already exists is a no-op.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Sets `field` to `default` on every document that does not have it yet.
    async fn add_field(
        &self,
        collection: &str,
        field: &str,
        default: Bson,
    ) -> DocumentStoreResult<()>;

    /// Removes a field from all documents in a collection.
    async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;

    /// Gives every document without an `id` field a new id, re-keying it under that
    /// id. Returns how many documents were re-keyed.
    ///
    /// Documents written by other tools are keyed by whatever the database chose;
    /// until they are re-keyed they cannot be read or changed by id.
    async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64>;

    /// Renames a field in all documents of a collection that have it.
    async fn rename_field(
        &self,
        collection: &str,
        field: &str,
        new: &str,
    ) -> DocumentStoreResult<()>;

    /// Creates an ascending single-field index, optionally unique.
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;

    /// Removes the index created by [`StoreBackend::add_index`] for `field`.
    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;

    /// Cleanly shuts down the backend, releasing all resources.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe counterpart of [`StoreBackend`], implemented for every backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn patch_document(
        &self,
        id: Uuid,
        fields: BsonDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool>;
    async fn append_to_array(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        collection: &str,
    ) -> DocumentStoreResult<bool>;
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<u64>;
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
    async fn current_revision_id(&self) -> DocumentStoreResult<Option<String>>;
    async fn set_revision_id(&self, revision_id: &str) -> DocumentStoreResult<()>;
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn add_field(
        &self,
        collection: &str,
        field: &str,
        default: Bson,
    ) -> DocumentStoreResult<()>;
    async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;
    async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64>;
    async fn rename_field(
        &self,
        collection: &str,
        field: &str,
        new: &str,
    ) -> DocumentStoreResult<()>;
    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()>;
    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_documents(self, documents, collection).await
    }

    async fn patch_document(
        &self,
        id: Uuid,
        fields: BsonDocument,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        StoreBackend::patch_document(self, id, fields, collection).await
    }

    async fn append_to_array(
        &self,
        id: Uuid,
        field: &str,
        value: Bson,
        collection: &str,
    ) -> DocumentStoreResult<bool> {
        StoreBackend::append_to_array(self, id, field, value, collection).await
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::delete_documents(self, ids, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::get_documents(self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }

    async fn current_revision_id(&self) -> DocumentStoreResult<Option<String>> {
        StoreBackend::current_revision_id(self).await
    }

    async fn set_revision_id(&self, revision_id: &str) -> DocumentStoreResult<()> {
        StoreBackend::set_revision_id(self, revision_id).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn add_field(
        &self,
        collection: &str,
        field: &str,
        default: Bson,
    ) -> DocumentStoreResult<()> {
        StoreBackend::add_field(self, collection, field, default).await
    }

    async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_field(self, collection, field).await
    }

    async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::assign_ids(self, collection).await
    }

    async fn rename_field(
        &self,
        collection: &str,
        field: &str,
        new: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::rename_field(self, collection, field, new).await
    }

    async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        StoreBackend::add_index(self, collection, field, unique).await
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_index(self, collection, field).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

/// Factory for a backend, so the service can pick one from configuration.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
