//! Extension points typed resources plug into the generic dispatcher.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, Uuid};
use serde_json::{Map, Value};
use shopdesk_store::{
    query::{Expr, Filter},
    store::DynDocumentStore,
};

use crate::error::AppError;

/// Per-resource behavior layered on top of list/get/create/update/delete.
///
/// Every method has a no-op default, so a resource only implements what it needs.
#[async_trait]
pub trait ResourceHooks: Send + Sync {
    /// Extra filter for list requests, built from the query string.
    fn list_filter(&self, _params: &HashMap<String, String>) -> Result<Option<Expr>, AppError> {
        Ok(None)
    }

    /// Runs after coercion and before insertion.
    async fn before_create(&self, _store: &DynDocumentStore, _document: &mut BsonDocument) -> Result<(), AppError> {
        Ok(())
    }

    /// Runs after coercion and before the patch is applied.
    async fn before_update(
        &self,
        _store: &DynDocumentStore,
        _id: Uuid,
        _patch: &mut BsonDocument,
    ) -> Result<(), AppError> {
        Ok(())
    }

    /// Adds read-only fields to a presented document. Nothing added here is stored.
    async fn decorate(&self, _store: &DynDocumentStore, _item: &mut Map<String, Value>) -> Result<(), AppError> {
        Ok(())
    }
}

/// Query-string filters shared by most resources.
///
/// - `refs`: `?field=<uuid>` exact match on a reference field
/// - `choices`: `?field=<option>` match on an enumerated field; the option is matched
///   case-insensitively and canonicalized the same way writes are
/// - `search`: `?search=<text>` case-insensitive substring over the listed fields
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilters {
    pub refs: &'static [&'static str],
    pub choices: &'static [(&'static str, &'static [&'static str])],
    pub search: &'static [&'static str],
}

impl ListFilters {
    pub const NONE: ListFilters = ListFilters {
        refs: &[],
        choices: &[],
        search: &[],
    };

    pub fn build(&self, params: &HashMap<String, String>) -> Result<Option<Expr>, AppError> {
        let mut exprs = Vec::new();
        let param = |name: &str| {
            params
                .get(name)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        for field in self.refs {
            if let Some(raw) = param(field) {
                let id = Uuid::parse_str(raw)
                    .map_err(|_| AppError::validation(format!("Invalid {field}")))?;
                exprs.push(Filter::eq(*field, id));
            }
        }

        for &(field, options) in self.choices {
            if let Some(value) = param(field) {
                let option = options
                    .iter()
                    .find(|option| option.eq_ignore_ascii_case(value))
                    .ok_or_else(|| {
                        AppError::validation(format!("{field} must be one of {}", options.join(", ")))
                    })?;
                exprs.push(Filter::eq(field, *option));
            }
        }

        if !self.search.is_empty() {
            if let Some(term) = param("search") {
                exprs.push(Filter::search(self.search.iter().copied(), term));
            }
        }

        Ok(match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Filter::and(exprs)),
        })
    }
}

/// Hooks for resources that only filter their list.
pub struct FilterHooks(pub ListFilters);

#[async_trait]
impl ResourceHooks for FilterHooks {
    fn list_filter(&self, params: &HashMap<String, String>) -> Result<Option<Expr>, AppError> {
        self.0.build(params)
    }
}

/// Reads a reference field of a stored document as a UUID.
pub fn reference(document: &BsonDocument, field: &str) -> Option<Uuid> {
    document
        .get(field)
        .and_then(shopdesk_store::document::uuid_from_bson)
}

/// Looks up the `name` of the document `id` in `collection`.
pub async fn display_name(
    store: &DynDocumentStore,
    collection: &str,
    id: Option<Uuid>,
) -> Result<Value, AppError> {
    let Some(id) = id else {
        return Ok(Value::Null);
    };

    Ok(store
        .collection(collection)
        .get_one(id)
        .await?
        .and_then(|doc| match doc.get("name") {
            Some(Bson::String(name)) => Some(Value::String(name.clone())),
            _ => None,
        })
        .unwrap_or(Value::Null))
}

/// Reads a reference from a presented (JSON) document.
pub fn presented_reference(item: &Map<String, Value>, field: &str) -> Option<Uuid> {
    item.get(field)
        .and_then(Value::as_str)
        .and_then(|text| Uuid::parse_str(text).ok())
}
