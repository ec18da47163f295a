use async_trait::async_trait;
use bson::{Bson, Document, Uuid, doc};
use futures::{StreamExt, TryStreamExt, stream::iter};
use mongodb::{
    Client, Collection as MongoCollection, Database, IndexModel,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions},
};
use shopdesk_store::{
    backend::{StoreBackend, StoreBackendBuilder},
    document::{ID_FIELD, new_document_id},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query, SortDirection},
};

use crate::{query::MongoQueryTranslator, sanitizer::ValueSanitizer};

const REVISIONS: &str = "_revisions";
const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.code == DUPLICATE_KEY)),
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn backend_error(collection: &str) -> impl Fn(MongoError) -> DocumentStoreError + '_ {
    move |err| {
        if is_duplicate_key(&err) {
            DocumentStoreError::DocumentAlreadyExists(err.to_string(), collection.to_string())
        } else {
            DocumentStoreError::Backend(err.to_string())
        }
    }
}

/// MongoDB-backed document store.
///
/// Documents are stored with their UUID as `_id`. `_id` is stripped again on read, so
/// callers only ever see the `id` field they wrote. The applied migration revision lives
/// in a private `_revisions` collection.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database()
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        Ok(Document::from_iter(
            ValueSanitizer::sanitize_value(document)
                .as_document()
                .cloned()
                .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?
                .into_iter()
                .filter(|(k, _)| k != "_id")
                .chain([("_id".to_string(), Bson::from(*id))]),
        ))
    }

    fn restore_document(&self, document: Document) -> Bson {
        ValueSanitizer::restore_value(&Bson::Document(Document::from_iter(
            document
                .into_iter()
                .filter(|(k, _)| k != "_id"),
        )))
    }

    async fn find(&self, collection: &str, filter: Document, options: FindOptions) -> DocumentStoreResult<Vec<Bson>> {
        Ok(self
            .get_collection(collection)
            .find(filter)
            .with_options(options)
            .await
            .map_err(backend_error(collection))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error(collection))?
            .into_iter()
            .map(|doc| self.restore_document(doc))
            .collect())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.get_collection(collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(backend_error(collection))?;

        Ok(())
    }

    async fn update_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        iter(documents)
            .then(async |(id, doc)| {
                let result = self
                    .get_collection(collection)
                    .replace_one(doc! { "_id": id }, self.prepare_document(&id, &doc)?)
                    .await
                    .map_err(backend_error(collection))?;

                if result.matched_count == 0 {
                    return Err(DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string()));
                }

                Ok(())
            })
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    async fn patch_document(&self, id: Uuid, fields: Document, collection: &str) -> DocumentStoreResult<bool> {
        let fields = match ValueSanitizer::sanitize_value(&Bson::Document(fields)) {
            Bson::Document(fields) if !fields.is_empty() => fields,
            _ => return Ok(!self.get_documents(vec![id], collection).await?.is_empty()),
        };

        let result = self
            .get_collection(collection)
            .update_one(doc! { "_id": id }, doc! { "$set": fields })
            .await
            .map_err(backend_error(collection))?;

        Ok(result.matched_count > 0)
    }

    async fn append_to_array(&self, id: Uuid, field: &str, value: Bson, collection: &str) -> DocumentStoreResult<bool> {
        let result = self
            .get_collection(collection)
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { field: ValueSanitizer::sanitize_value(&value) } },
            )
            .await
            .map_err(backend_error(collection))?;

        Ok(result.matched_count > 0)
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<u64> {
        Ok(self
            .get_collection(collection)
            .delete_many(doc! { "_id": { "$in": ids } })
            .await
            .map_err(backend_error(collection))?
            .deleted_count)
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        self.find(collection, doc! { "_id": { "$in": ids } }, FindOptions::default())
            .await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if !query.sort.is_empty() {
            options.sort = Some(Document::from_iter(query.sort.iter().map(|sort| {
                let direction = match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };
                (sort.field.clone(), Bson::Int32(direction))
            })));
        }

        self.find(
            collection,
            MongoQueryTranslator::translate(query.filter.as_ref())?,
            options,
        )
        .await
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(backend_error(collection))
    }

    async fn current_revision_id(&self) -> DocumentStoreResult<Option<String>> {
        let result = self
            .get_collection(REVISIONS)
            .find_one(doc! { "_id": 0 })
            .await
            .map_err(backend_error(REVISIONS))?;

        Ok(result.and_then(|doc| {
            doc.get_str("revision_id")
                .ok()
                .map(str::to_string)
        }))
    }

    async fn set_revision_id(&self, revision_id: &str) -> DocumentStoreResult<()> {
        self.get_collection(REVISIONS)
            .update_one(
                doc! { "_id": 0 },
                doc! { "$set": { "revision_id": revision_id } },
            )
            .upsert(true)
            .await
            .map_err(backend_error(REVISIONS))?;

        Ok(())
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let name = ValueSanitizer::sanitize_string(name);
        let database = self.database();

        let existing = database
            .list_collection_names()
            .await
            .map_err(backend_error(&name))?;

        if !existing.contains(&name) {
            database
                .create_collection(&name)
                .await
                .map_err(backend_error(&name))?;
        }

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error(name))?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(self
            .database()
            .list_collection_names()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.to_string()))?
            .into_iter()
            .filter(|name| name != REVISIONS)
            .map(|name| ValueSanitizer::restore_string(&name))
            .collect())
    }

    async fn add_field(&self, collection: &str, field: &str, default: Bson) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .update_many(
                doc! { field: { "$exists": false } },
                doc! { "$set": { field: ValueSanitizer::sanitize_value(&default) } },
            )
            .await
            .map_err(backend_error(collection))?;

        Ok(())
    }

    async fn drop_field(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .update_many(doc! {}, doc! { "$unset": { field: "" } })
            .await
            .map_err(backend_error(collection))?;

        Ok(())
    }

    async fn assign_ids(&self, collection: &str) -> DocumentStoreResult<u64> {
        let handle = self.get_collection(collection);
        let unkeyed = handle
            .find(doc! { ID_FIELD: { "$exists": false } })
            .await
            .map_err(backend_error(collection))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error(collection))?;

        let mut assigned = 0;
        for mut document in unkeyed {
            // `_id` is immutable, so the document is copied under the new key.
            let Some(old_key) = document.remove("_id") else {
                continue;
            };

            let id = new_document_id();
            document.insert(ID_FIELD, id);
            document.insert("_id", id);

            handle
                .insert_one(document)
                .await
                .map_err(backend_error(collection))?;
            handle
                .delete_one(doc! { "_id": old_key })
                .await
                .map_err(backend_error(collection))?;

            assigned += 1;
        }

        Ok(assigned)
    }

    async fn rename_field(&self, collection: &str, field: &str, new: &str) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .update_many(
                doc! { field: { "$exists": true } },
                doc! { "$rename": { field: new } },
            )
            .await
            .map_err(backend_error(collection))?;

        Ok(())
    }

    async fn add_index(&self, collection: &str, field: &str, unique: bool) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { field: 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(unique)
                            .build(),
                    )
                    .build(),
            )
            .await
            .map_err(backend_error(collection))?;

        Ok(())
    }

    async fn drop_index(&self, collection: &str, field: &str) -> DocumentStoreResult<()> {
        // Name MongoDB assigns to the ascending single-field index built by `add_index`.
        self.get_collection(collection)
            .drop_index(format!("{field}_1"))
            .await
            .map_err(backend_error(collection))?;

        Ok(())
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Connects a [`MongoDbStore`] from a connection string and database name.
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
