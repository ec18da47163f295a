//! List/get/create/update/delete over any [`Resource`].

use std::collections::HashMap;

use bson::{Bson, DateTime, Document as BsonDocument, Uuid};
use serde_json::Value;
use shopdesk_store::{
    document::{ID_FIELD, new_document_id},
    page::{Page, PaginationParams},
    query::Expr,
    store::DynDocumentStore,
};

use crate::{
    error::AppError,
    model::api::MessageDto,
    resource::{
        catalogue::{ORDER_HISTORY, Resource},
        schema::Mode,
    },
    service::auth::password::hash_password,
    state::AppState,
};

/// Sort key for list endpoints: newest first.
const CREATED_AT: &str = "created_at";

/// Parses a client-supplied document id.
pub fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id.trim()).map_err(|_| AppError::validation("Invalid ID"))
}

/// A timestamp strictly later than `previous`, normally the current time.
pub fn next_timestamp(previous: Option<&Bson>) -> DateTime {
    let now = DateTime::now();

    match previous {
        Some(Bson::DateTime(previous)) if now.timestamp_millis() <= previous.timestamp_millis() => {
            DateTime::from_millis(previous.timestamp_millis() + 1)
        }
        _ => now,
    }
}

pub struct ResourceService<'a> {
    store: &'a DynDocumentStore,
    resource: &'a Resource,
    bcrypt_cost: u32,
}

impl<'a> ResourceService<'a> {
    pub fn new(state: &'a AppState, resource: &'a Resource) -> Self {
        Self {
            store: &state.store,
            resource,
            bcrypt_cost: state.config.bcrypt_cost,
        }
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.resource.spec.label))
    }

    async fn render(&self, document: &BsonDocument) -> Result<Value, AppError> {
        let mut item = self.resource.spec.present(document)?;
        self.resource
            .hooks
            .decorate(self.store, &mut item)
            .await?;

        Ok(Value::Object(item))
    }

    async fn hash_secrets(&self, document: &mut BsonDocument) -> Result<(), AppError> {
        for field in self.resource.spec.secret_fields() {
            if let Ok(plain) = document.get_str(field).map(str::to_string) {
                document.insert(field, hash_password(&plain, self.bcrypt_cost).await?);
            }
        }

        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<BsonDocument, AppError> {
        self.store
            .collection(self.resource.spec.collection)
            .get_one(id)
            .await?
            .ok_or_else(|| self.not_found())
    }

    /// Lists documents newest first, filtered by the resource's query parameters.
    ///
    /// # Arguments
    /// - `params` - Page selection, already normalized
    /// - `query` - The full query string, for resource-specific filters
    ///
    /// # Returns
    /// - `Ok(Page<Value>)` - One page plus the total number of matches
    /// - `Err(AppError::Validation)` - A filter value is malformed
    pub async fn list(&self, params: PaginationParams, query: &HashMap<String, String>) -> Result<Page<Value>, AppError> {
        let filter = self.resource.hooks.list_filter(query)?;

        self.list_filtered(filter, params).await
    }

    /// Lists documents matching `filter`, newest first.
    pub async fn list_filtered(&self, filter: Option<Expr>, params: PaginationParams) -> Result<Page<Value>, AppError> {
        let collection = self.store.collection(self.resource.spec.collection);

        let total = collection.count(filter.clone()).await?;
        let documents = collection
            .query(
                params
                    .newest_first(CREATED_AT)
                    .maybe_filter(filter)
                    .build(),
            )
            .await?;

        let mut data = Vec::with_capacity(documents.len());
        for document in documents {
            if let Bson::Document(document) = document {
                data.push(self.render(&document).await?);
            }
        }

        Ok(Page::new(data, total, &params))
    }

    /// Fetches one document.
    ///
    /// # Returns
    /// - `Ok(Value)` - The presented document
    /// - `Err(AppError::Validation)` - `id` is not a valid ID
    /// - `Err(AppError::NotFound)` - No such document
    pub async fn get(&self, id: &str) -> Result<Value, AppError> {
        let document = self.fetch(parse_id(id)?).await?;

        self.render(&document).await
    }

    /// Coerces `body`, stamps id and timestamps, stores it and returns the stored form.
    pub async fn create(&self, body: &Value) -> Result<Value, AppError> {
        let spec = self.resource.spec;

        let mut fields = spec.coerce(body, Mode::Create)?;
        self.resource
            .hooks
            .before_create(self.store, &mut fields)
            .await?;
        self.hash_secrets(&mut fields).await?;

        let id = new_document_id();
        let now = DateTime::now();

        let mut document = BsonDocument::new();
        document.insert(ID_FIELD, id);
        document.extend(fields);
        document.insert("created_at", now);
        document.insert("updated_at", now);

        self.store
            .collection(spec.collection)
            .insert(vec![(id, Bson::Document(document))])
            .await?;

        tracing::debug!("Created {} {}", spec.label, id);

        let stored = self.fetch(id).await?;
        self.render(&stored).await
    }

    /// Applies the named fields of `body` and refreshes `updated_at`.
    ///
    /// Fields not named in `body` are left untouched.
    ///
    /// # Returns
    /// - `Ok(Value)` - The document after the update
    /// - `Err(AppError::Validation)` - Bad id or a field fails coercion
    /// - `Err(AppError::NotFound)` - No such document
    pub async fn update(&self, id: &str, body: &Value) -> Result<Value, AppError> {
        let id = parse_id(id)?;
        let spec = self.resource.spec;

        let mut patch = spec.coerce(body, Mode::Update)?;
        self.resource
            .hooks
            .before_update(self.store, id, &mut patch)
            .await?;
        self.hash_secrets(&mut patch).await?;

        let current = self.fetch(id).await?;
        patch.insert("updated_at", next_timestamp(current.get("updated_at")));

        let matched = self
            .store
            .collection(spec.collection)
            .patch(id, patch)
            .await?;

        if !matched {
            return Err(self.not_found());
        }

        let stored = self.fetch(id).await?;
        self.render(&stored).await
    }

    /// Hard-deletes one document.
    pub async fn delete(&self, id: &str) -> Result<MessageDto, AppError> {
        let id = parse_id(id)?;
        let spec = self.resource.spec;

        let removed = self
            .store
            .collection(spec.collection)
            .delete(vec![id])
            .await?;

        if removed == 0 {
            return Err(self.not_found());
        }

        tracing::debug!("Deleted {} {}", spec.label, id);

        Ok(MessageDto::new(format!("{} deleted successfully", spec.label)))
    }

    /// Appends one entry to the document's `order_history`.
    ///
    /// # Returns
    /// - `Ok(Value)` - The document including the new entry
    /// - `Err(AppError::NotFound)` - No such document, or the resource keeps no history
    pub async fn append_history(&self, id: &str, body: &Value) -> Result<Value, AppError> {
        let id = parse_id(id)?;
        let spec = self.resource.spec;

        let field = spec
            .field(ORDER_HISTORY)
            .ok_or_else(|| AppError::NotFound(format!("{} has no order history", spec.label)))?;
        let entry = spec.coerce_line(field, body)?;

        let current = self.fetch(id).await?;
        let collection = self.store.collection(spec.collection);

        if !collection.append(id, ORDER_HISTORY, entry).await? {
            return Err(self.not_found());
        }

        let mut touched = BsonDocument::new();
        touched.insert("updated_at", next_timestamp(current.get("updated_at")));
        collection.patch(id, touched).await?;

        let stored = self.fetch(id).await?;
        self.render(&stored).await
    }
}
