//! Document store handles.
//!
//! - [`DocumentStore`] - owns a concrete backend; built once at startup
//! - [`DynDocumentStore`] - owns a boxed backend; shared by request handlers
//! - [`DynDocumentStoreRef`] - borrowed view used by the migration runner
//!
//! # Example
//!
//! ```ignore
//! use shopdesk_store::store::{DocumentStore, IntoDynDocumentStore};
//!
//! let store = DocumentStore::new(backend).into_dyn();
//! let products = store.collection("products");
//! ```

use bson::Bson;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{DynCollection, DynTypedCollection},
    document::Document,
    error::DocumentStoreResult,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

/// A document store over a boxed backend, chosen at runtime.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    /// Creates a new dynamic document store with the given backend trait object.
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// Gets a typed collection for the specified document type.
    pub fn typed_collection<'a, D: Document>(&'a self) -> DynTypedCollection<'a, D> {
        DynTypedCollection::new(D::collection_name().to_string(), &*self.backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> DynCollection<'a> {
        DynCollection::new(name.to_string(), &*self.backend)
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

/// A borrowed dynamic store with the schema operations migrations need.
#[derive(Debug)]
pub struct DynDocumentStoreRef<'a> {
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynDocumentStoreRef<'a> {
    pub fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self { backend }
    }

    /// Gets an untyped collection with the given name.
    pub fn collection(&self, name: &str) -> DynCollection<'a> {
        DynCollection::new(name.to_string(), self.backend)
    }

    /// Gets the current revision ID of the store.
    pub async fn current_revision_id(&self) -> DocumentStoreResult<Option<String>> {
        self.backend.current_revision_id().await
    }

    /// Sets the revision ID for the store.
    pub async fn set_revision_id(&self, revision_id: &str) -> DocumentStoreResult<()> {
        self.backend
            .set_revision_id(revision_id)
            .await
    }

    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    pub async fn add_field(
        &self,
        collection: &str,
        field: &str,
        default: impl Into<Bson>,
    ) -> DocumentStoreResult<()> {
        self.backend
            .add_field(collection, field, default.into())
            .await
    }

    pub async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_field(collection, field)
            .await
    }

    pub async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64> {
        self.backend.assign_ids(collection).await
    }

    pub async fn rename_field(
        &self,
        collection: &str,
        field: &str,
        new: &str,
    ) -> DocumentStoreResult<()> {
        self.backend
            .rename_field(collection, field, new)
            .await
    }

    pub async fn add_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> DocumentStoreResult<()> {
        self.backend
            .add_index(collection, field, unique)
            .await
    }

    pub async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.backend
            .drop_index(collection, field)
            .await
    }
}

/// Borrows any store as a [`DynDocumentStoreRef`].
pub trait AsDynDocumentStore {
    fn as_dyn<'a>(&'a self) -> DynDocumentStoreRef<'a>;
}

/// Converts a store into an owned [`DynDocumentStore`].
pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> AsDynDocumentStore for DocumentStore<B> {
    fn as_dyn<'a>(&'a self) -> DynDocumentStoreRef<'a> {
        DynDocumentStoreRef::new(&self.backend)
    }
}

impl AsDynDocumentStore for DynDocumentStore {
    fn as_dyn<'a>(&'a self) -> DynDocumentStoreRef<'a> {
        DynDocumentStoreRef::new(&*self.backend)
    }
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}
