//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON values in hash maps behind async-aware read-write locks.
//! The service uses this backend for tests and for local runs without a database.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use mea::rwlock::RwLock;
use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use shopdesk_store::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{ID_FIELD, new_document_id},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
};

use crate::evaluator::{Comparable, DocumentEvaluator, lookup};

type CollectionMap = HashMap<String, Bson>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and every clone shares the same underlying data.
/// Queries scan the whole collection; indexes are accepted and ignored, except that
/// unique indexes are recorded and enforced on insert and update.
///
/// # Example
///
/// ```ignore
/// use shopdesk_store_memory::InMemoryStore;
/// use shopdesk_store::backend::StoreBackend;
/// use bson::{Uuid, Bson, doc};
///
/// let store = InMemoryStore::new();
///
/// let id = Uuid::new();
/// let doc = Bson::Document(doc! { "id": id, "name": "Alice" });
/// store.insert_documents(vec![(id, doc)], "users").await?;
///
/// let docs = store.get_documents(vec![id], "users").await?;
/// assert_eq!(docs.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (document id -> document)
    store: Arc<RwLock<StoreMap>>,
    current_revision: Arc<RwLock<Option<String>>>,
    /// collection name -> fields with a unique index
    unique_fields: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    fn document_mut<'a>(
        collection_map: &'a mut CollectionMap,
        id: &Uuid,
    ) -> Option<&'a mut BsonDocument> {
        collection_map
            .get_mut(&id.to_string())
            .and_then(Bson::as_document_mut)
    }

    async fn unique_fields(&self, collection: &str) -> Vec<String> {
        self.unique_fields
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check_unique(
        unique_fields: &[String],
        collection_map: &CollectionMap,
        key: &str,
        document: &Bson,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        let Some(document) = document.as_document() else {
            return Ok(());
        };

        for field in unique_fields {
            let Some(value) = lookup(document, field).filter(|value| !matches!(value, Bson::Null))
            else {
                continue;
            };

            let taken = collection_map
                .iter()
                .filter(|(other_key, _)| other_key.as_str() != key)
                .filter_map(|(_, other)| other.as_document())
                .any(|other| {
                    lookup(other, field)
                        .is_some_and(|existing| Comparable::from(existing) == Comparable::from(value))
                });

            if taken {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    format!("{field}={value}"),
                    collection.to_string(),
                ));
            }
        }

        Ok(())
    }

    fn collection_mut<'a>(
        store: &'a mut StoreMap,
        collection: &str,
    ) -> DocumentStoreResult<&'a mut CollectionMap> {
        store
            .get_mut(collection)
            .ok_or_else(|| DocumentStoreError::CollectionNotFound(collection.to_string()))
    }
}

fn sort_key<'a>(document: &'a Bson, field: &str) -> Comparable<'a> {
    document
        .as_document()
        .and_then(|doc| lookup(doc, field))
        .map(Comparable::from)
        .unwrap_or(Comparable::Null)
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let unique_fields = self.unique_fields(collection).await;
        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            let key = id.to_string();

            if collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentAlreadyExists(key, collection.to_string()));
            }

            Self::check_unique(&unique_fields, collection_map, &key, &doc, collection)?;
            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let unique_fields = self.unique_fields(collection).await;
        let mut store = self.store.write().await;
        let collection_map = Self::collection_mut(&mut store, collection)?;

        for (id, doc) in documents {
            let key = id.to_string();

            if !collection_map.contains_key(&key) {
                return Err(DocumentStoreError::DocumentNotFound(key, collection.to_string()));
            }

            Self::check_unique(&unique_fields, collection_map, &key, &doc, collection)?;
            collection_map.insert(key, doc);
        }

        Ok(())
    }

    async fn patch_document(&self, id: Uuid, fields: BsonDocument, collection: &str) -> DocumentStoreResult<bool> {
        let unique_fields = self.unique_fields(collection).await;
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(false);
        };

        let Some(current) = collection_map.get(&id.to_string()) else {
            return Ok(false);
        };

        let mut patched = current.clone();
        if let Some(doc) = patched.as_document_mut() {
            doc.extend(fields);
        }

        Self::check_unique(&unique_fields, collection_map, &id.to_string(), &patched, collection)?;
        collection_map.insert(id.to_string(), patched);

        Ok(true)
    }

    async fn append_to_array(&self, id: Uuid, field: &str, value: Bson, collection: &str) -> DocumentStoreResult<bool> {
        let mut store = self.store.write().await;
        let Some(doc) = store
            .get_mut(collection)
            .and_then(|collection_map| Self::document_mut(collection_map, &id))
        else {
            return Ok(false);
        };

        match doc.get_mut(field) {
            Some(Bson::Array(array)) => array.push(value),
            Some(_) => {
                return Err(DocumentStoreError::InvalidDocument(format!(
                    "Field {field} of document {id} is not an array"
                )));
            }
            None => {
                doc.insert(field, vec![value]);
            }
        }

        Ok(true)
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Ok(0);
        };

        Ok(ids
            .iter()
            .filter(|id| collection_map.remove(&id.to_string()).is_some())
            .count() as u64)
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection_map.get(&id.to_string()))
            .cloned()
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.values(), filter)?,
            None => collection_map
                .values()
                .cloned()
                .collect::<Vec<_>>(),
        };

        if !query.sort.is_empty() {
            documents.sort_by(|a, b| {
                query
                    .sort
                    .iter()
                    .map(|sort| {
                        let (left, right) = (sort_key(a, &sort.field), sort_key(b, &sort.field));

                        match sort.direction {
                            SortDirection::Asc => left.sort_cmp(&right),
                            SortDirection::Desc => right.sort_cmp(&left),
                        }
                    })
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        Ok(documents
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(0);
        };

        let Some(filter) = filter else {
            return Ok(collection_map.len() as u64);
        };

        let mut count = 0;
        for doc in collection_map.values() {
            if DocumentEvaluator::matches(doc, &filter)? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn current_revision_id(&self) -> DocumentStoreResult<Option<String>> {
        Ok(self.current_revision.read().await.clone())
    }

    async fn set_revision_id(&self, revision_id: &str) -> DocumentStoreResult<()> {
        *self.current_revision.write().await = Some(revision_id.to_string());

        Ok(())
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        if self.store.write().await.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        self.unique_fields.write().await.remove(name);

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect())
    }

    async fn add_field(&self, collection: &str, field: &str, default: Bson) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        for doc in Self::collection_mut(&mut store, collection)?.values_mut() {
            if let Some(doc_map) = doc.as_document_mut() {
                if !doc_map.contains_key(field) {
                    doc_map.insert(field.to_string(), default.clone());
                }
            }
        }

        Ok(())
    }

    async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        for doc in Self::collection_mut(&mut store, collection)?.values_mut() {
            if let Some(doc_map) = doc.as_document_mut() {
                doc_map.remove(field);
            }
        }

        Ok(())
    }

    async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64> {
        let mut store = self.store.write().await;
        let collection_map = Self::collection_mut(&mut store, collection)?;

        let unkeyed = collection_map
            .iter()
            .filter(|(_, doc)| {
                doc.as_document()
                    .is_some_and(|doc_map| !doc_map.contains_key(ID_FIELD))
            })
            .map(|(key, _)| key.clone())
            .collect::<Vec<_>>();

        for key in &unkeyed {
            let Some(Bson::Document(mut doc_map)) = collection_map.remove(key) else {
                continue;
            };

            let id = new_document_id();
            doc_map.insert(ID_FIELD, id);
            collection_map.insert(id.to_string(), Bson::Document(doc_map));
        }

        Ok(unkeyed.len() as u64)
    }

    async fn rename_field(&self, collection: &str, field: &str, new: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        for doc in Self::collection_mut(&mut store, collection)?.values_mut() {
            if let Some(doc_map) = doc.as_document_mut() {
                if let Some(value) = doc_map.remove(field) {
                    doc_map.insert(new.to_string(), value);
                }
            }
        }

        Ok(())
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        if unique {
            let mut unique_fields = self.unique_fields.write().await;
            let fields = unique_fields
                .entry(collection.to_string())
                .or_default();

            if !fields.iter().any(|existing| existing == field) {
                fields.push(field.to_string());
            }
        }

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        if let Some(fields) = self.unique_fields.write().await.get_mut(collection) {
            fields.retain(|existing| existing != field);
        }

        Ok(())
    }
}

/// Builder for [`InMemoryStore`]; always succeeds.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use shopdesk_store::{document::uuid_from_bson, query::Filter};

    use super::*;

    fn entry(name: &str, rank: i32) -> (Uuid, Bson) {
        let id = Uuid::new();
        (id, Bson::Document(doc! { "id": id, "name": name, "rank": rank }))
    }

    #[tokio::test]
    async fn rejects_duplicate_ids() {
        let store = InMemoryStore::new();
        let (id, doc) = entry("a", 1);

        store.insert_documents(vec![(id, doc.clone())], "items").await.unwrap();
        let err = store.insert_documents(vec![(id, doc)], "items").await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(..)));
    }

    #[tokio::test]
    async fn unique_index_rejects_taken_values() {
        let store = InMemoryStore::new();
        store.add_index("users", "phone", true).await.unwrap();

        let first = Uuid::new();
        store
            .insert_documents(vec![(first, Bson::Document(doc! { "phone": "+998901234567" }))], "users")
            .await
            .unwrap();

        let second = Uuid::new();
        let err = store
            .insert_documents(vec![(second, Bson::Document(doc! { "phone": "+998901234567" }))], "users")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(..)));

        // Re-saving the owner of the value is fine.
        assert!(store.patch_document(first, doc! { "phone": "+998901234567" }, "users").await.unwrap());
    }

    #[tokio::test]
    async fn patch_merges_top_level_fields() {
        let store = InMemoryStore::new();
        let (id, doc) = entry("a", 1);
        store.insert_documents(vec![(id, doc)], "items").await.unwrap();

        assert!(store.patch_document(id, doc! { "rank": 5 }, "items").await.unwrap());
        assert!(!store.patch_document(Uuid::new(), doc! { "rank": 5 }, "items").await.unwrap());

        let stored = store.get_documents(vec![id], "items").await.unwrap();
        let stored = stored[0].as_document().unwrap();
        assert_eq!(stored.get_str("name").unwrap(), "a");
        assert_eq!(stored.get_i32("rank").unwrap(), 5);
    }

    #[tokio::test]
    async fn append_creates_then_extends_array() {
        let store = InMemoryStore::new();
        let (id, doc) = entry("a", 1);
        store.insert_documents(vec![(id, doc)], "items").await.unwrap();

        store.append_to_array(id, "history", Bson::Int32(1), "items").await.unwrap();
        store.append_to_array(id, "history", Bson::Int32(2), "items").await.unwrap();

        let stored = store.get_documents(vec![id], "items").await.unwrap();
        assert_eq!(
            stored[0].as_document().unwrap().get_array("history").unwrap(),
            &vec![Bson::Int32(1), Bson::Int32(2)]
        );
        assert!(!store.append_to_array(Uuid::new(), "history", Bson::Null, "items").await.unwrap());
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let store = InMemoryStore::new();
        let (id, doc) = entry("a", 1);
        store.insert_documents(vec![(id, doc)], "items").await.unwrap();

        assert_eq!(store.delete_documents(vec![id, Uuid::new()], "items").await.unwrap(), 1);
        assert_eq!(store.delete_documents(vec![id], "items").await.unwrap(), 0);
        assert_eq!(store.delete_documents(vec![id], "missing").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn assigns_ids_to_unkeyed_documents() {
        let store = InMemoryStore::new();
        let (keyed, doc) = entry("kept", 1);
        store
            .insert_documents(
                vec![(keyed, doc), (Uuid::new(), Bson::Document(doc! { "name": "legacy" }))],
                "items",
            )
            .await
            .unwrap();

        assert_eq!(store.assign_ids("items").await.unwrap(), 1);
        assert_eq!(store.assign_ids("items").await.unwrap(), 0);

        let all = store.query_documents(Query::new(), "items").await.unwrap();
        let legacy = all
            .iter()
            .filter_map(Bson::as_document)
            .find(|doc| doc.get_str("name").is_ok_and(|name| name == "legacy"))
            .unwrap();
        let id = uuid_from_bson(legacy.get(ID_FIELD).unwrap()).unwrap();

        assert_eq!(store.get_documents(vec![id], "items").await.unwrap().len(), 1);
        assert_eq!(store.get_documents(vec![keyed], "items").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn later_sort_keys_break_ties() {
        let store = InMemoryStore::new();
        let documents = (0..6)
            .map(|n| {
                let id = new_document_id();
                (id, Bson::Document(doc! { "id": id, "name": format!("n{n}"), "rank": 1 }))
            })
            .collect::<Vec<_>>();
        store.insert_documents(documents, "items").await.unwrap();

        let page = store
            .query_documents(
                Query::builder()
                    .sort("rank", SortDirection::Desc)
                    .sort("id", SortDirection::Desc)
                    .offset(1)
                    .limit(3)
                    .build(),
                "items",
            )
            .await
            .unwrap();
        let names = page
            .iter()
            .map(|doc| doc.as_document().unwrap().get_str("name").unwrap())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["n4", "n3", "n2"]);
    }

    #[tokio::test]
    async fn query_sorts_pages_and_counts() {
        let store = InMemoryStore::new();
        store
            .insert_documents(
                vec![entry("a", 3), entry("b", 1), entry("c", 2), entry("d", 4)],
                "items",
            )
            .await
            .unwrap();

        let page = store
            .query_documents(
                Query::builder()
                    .sort("rank", SortDirection::Desc)
                    .offset(1)
                    .limit(2)
                    .build(),
                "items",
            )
            .await
            .unwrap();
        let names = page
            .iter()
            .map(|doc| doc.as_document().unwrap().get_str("name").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a", "c"]);

        assert_eq!(store.count_documents(None, "items").await.unwrap(), 4);
        assert_eq!(
            store.count_documents(Some(Filter::gte("rank", 3)), "items").await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn add_field_keeps_existing_values() {
        let store = InMemoryStore::new();
        let with = Uuid::new();
        let without = Uuid::new();
        store
            .insert_documents(
                vec![
                    (with, Bson::Document(doc! { "count": 7 })),
                    (without, Bson::Document(doc! {})),
                ],
                "products",
            )
            .await
            .unwrap();

        store.add_field("products", "count", Bson::Int32(0)).await.unwrap();

        let docs = store.get_documents(vec![with, without], "products").await.unwrap();
        assert_eq!(docs[0].as_document().unwrap().get_i32("count").unwrap(), 7);
        assert_eq!(docs[1].as_document().unwrap().get_i32("count").unwrap(), 0);
    }

    #[tokio::test]
    async fn create_collection_is_idempotent() {
        let store = InMemoryStore::new();
        let (id, doc) = entry("a", 1);
        store.insert_documents(vec![(id, doc)], "items").await.unwrap();

        store.create_collection("items").await.unwrap();

        assert_eq!(store.count_documents(None, "items").await.unwrap(), 1);
    }
}
