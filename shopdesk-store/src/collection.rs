//! Collection handles over a dynamically dispatched backend.
//!
//! - [`DynCollection`] works with raw BSON documents; the resource dispatcher uses it
//!   because most resources are described by a field schema rather than a Rust type.
//! - [`DynTypedCollection`] (de)serializes a [`Document`] type on the way in and out;
//!   accounts (users, admins) use it.
//!
//! # Example
//!
//! ```ignore
//! use shopdesk_store::query::{Filter, Query};
//!
//! let admins = store.typed_collection::<Admin>();
//! let found = admins.find_one(Filter::eq("name", "root")).await?;
//!
//! let banners = store.collection("banners");
//! let total = banners.count(None).await?;
//! ```

use bson::{Bson, Document as BsonDocument, Uuid};
use std::marker::PhantomData;

use crate::{
    backend::DynStoreBackend,
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    query::{Expr, Query},
};

/// An untyped collection bound to a backend trait object.
#[derive(Debug)]
pub struct DynCollection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynCollection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts new documents. A duplicate id fails with `DocumentAlreadyExists`.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, self.name())
            .await
    }

    /// Replaces existing documents entirely.
    pub async fn update(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .update_documents(documents, self.name())
            .await
    }

    /// Merges top-level fields into one document. Returns whether the document exists.
    pub async fn patch(&self, id: Uuid, fields: BsonDocument) -> DocumentStoreResult<bool> {
        self.backend
            .patch_document(id, fields, self.name())
            .await
    }

    /// Pushes `value` onto the array `field` of one document. Returns whether the document exists.
    pub async fn append(
        &self,
        id: Uuid,
        field: &str,
        value: impl Into<Bson>,
    ) -> DocumentStoreResult<bool> {
        self.backend
            .append_to_array(id, field, value.into(), self.name())
            .await
    }

    /// Deletes documents by id and returns how many were removed.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<u64>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .delete_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                self.name(),
            )
            .await
    }

    /// Retrieves documents by id; missing ids are omitted.
    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<Bson>>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.backend
            .get_documents(
                ids.into_iter()
                    .map(Into::into)
                    .collect(),
                self.name(),
            )
            .await
    }

    /// Retrieves a single document as a BSON document.
    pub async fn get_one(&self, id: Uuid) -> DocumentStoreResult<Option<BsonDocument>> {
        Ok(self
            .get(vec![id])
            .await?
            .into_iter()
            .find_map(|doc| match doc {
                Bson::Document(doc) => Some(doc),
                _ => None,
            }))
    }

    /// Queries documents using a structured query.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        self.backend
            .query_documents(query, self.name())
            .await
    }

    /// Counts documents matching `filter`.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(filter, self.name())
            .await
    }
}

/// A collection that converts to and from the document type `D`.
#[derive(Debug)]
pub struct DynTypedCollection<'a, D: Document> {
    inner: DynCollection<'a>,
    _marker: PhantomData<D>,
}

impl<'a, D: Document> DynTypedCollection<'a, D> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self {
            inner: DynCollection::new(name, backend),
            _marker: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Inserts new documents.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.inner
            .insert(
                documents
                    .iter()
                    .map(|doc| Ok((*doc.id(), doc.to_bson()?)))
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )
            .await
    }

    /// Replaces existing documents entirely.
    pub async fn update(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.inner
            .update(
                documents
                    .iter()
                    .map(|doc| Ok((*doc.id(), doc.to_bson()?)))
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )
            .await
    }

    /// Merges top-level fields into one document. Returns whether the document exists.
    pub async fn patch(&self, id: Uuid, fields: BsonDocument) -> DocumentStoreResult<bool> {
        self.inner.patch(id, fields).await
    }

    /// Deletes documents by id and returns how many were removed.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<u64>
    where
        U: Into<Uuid> + Send + Sync + 'static,
    {
        self.inner.delete(ids).await
    }

    /// Retrieves a single document.
    pub async fn get_one(&self, id: Uuid) -> DocumentStoreResult<Option<D>> {
        self.inner
            .get(vec![id])
            .await?
            .into_iter()
            .next()
            .map(D::from_bson)
            .transpose()
    }

    /// Queries documents using a structured query.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        self.inner
            .query(query)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Returns the first document matching `filter`.
    pub async fn find_one(&self, filter: Expr) -> DocumentStoreResult<Option<D>> {
        Ok(self
            .query(Query::builder().filter(filter).limit(1).build())
            .await?
            .into_iter()
            .next())
    }

    /// Counts documents matching `filter`.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.inner.count(filter).await
    }
}
