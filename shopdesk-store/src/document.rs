//! Core traits and types for document representation and serialization.
//!
//! This module provides the trait that typed stored documents implement, helpers to
//! move documents between BSON and JSON, and the plain-JSON rendering used when
//! stored documents are handed to HTTP clients.

use bson::{Binary, Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson, spec::BinarySubtype};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value, from_value, to_value};

use crate::error::DocumentStoreResult;

/// Field every stored document carries its id in.
pub const ID_FIELD: &str = "id";

/// Generates an id for a new document.
///
/// Ids are UUIDv7: they start with a millisecond timestamp followed by a counter, so
/// ids generated later in the same process always compare greater.
pub fn new_document_id() -> Uuid {
    Uuid::from_bytes(uuid::Uuid::now_v7().into_bytes())
}

/// Core trait that all typed documents stored in a document store must implement.
///
/// Every document has a unique identifier (UUID) and names the collection it belongs to.
///
/// # Example
///
/// ```ignore
/// use shopdesk_store::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Admin {
///     pub id: Uuid,
///     pub name: String,
/// }
///
/// impl Document for Admin {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "admins"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing serialization/deserialization utilities for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON value for storage.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Creates a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Converts this document to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a document from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

/// Reads a UUID stored either as BSON binary (subtype 4) or as its hyphenated text.
pub fn uuid_from_bson(value: &Bson) -> Option<Uuid> {
    match value {
        Bson::Binary(Binary { subtype: BinarySubtype::Uuid, bytes }) => {
            <[u8; 16]>::try_from(bytes.as_slice())
                .ok()
                .map(Uuid::from_bytes)
        }
        Bson::String(text) => Uuid::parse_str(text).ok(),
        _ => None,
    }
}

/// Renders a stored value as the plain JSON a client expects.
///
/// Unlike extended JSON, identifiers become hyphenated strings, datetimes become
/// RFC 3339 strings and decimals become numbers.
pub fn to_plain_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(value) => Value::Bool(*value),
        Bson::Int32(value) => Value::from(*value),
        Bson::Int64(value) => Value::from(*value),
        Bson::Double(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
        Bson::Decimal128(value) => value
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        Bson::String(value) => Value::String(value.clone()),
        Bson::Array(items) => Value::Array(items.iter().map(to_plain_json).collect()),
        Bson::Document(doc) => Value::Object(
            doc.iter()
                .map(|(key, value)| (key.clone(), to_plain_json(value)))
                .collect::<Map<_, _>>(),
        ),
        Bson::DateTime(value) => Value::String(
            value
                .to_chrono()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Bson::ObjectId(value) => Value::String(value.to_hex()),
        Bson::Binary(_) => uuid_from_bson(value)
            .map_or(Value::Null, |id| Value::String(id.to_string())),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime, doc};
    use serde_json::json;

    #[test]
    fn renders_ids_and_dates_as_strings() {
        let id = Uuid::parse_str("6f1c1b0e-3f7a-4f59-9a55-0d8d1f1f2c11").unwrap();
        let created = DateTime::from_millis(1_700_000_000_000);
        let doc = Bson::Document(doc! {
            "id": id,
            "name": "Chair",
            "created_at": created,
            "tags": ["a", "b"],
            "count": 3,
        });

        assert_eq!(
            to_plain_json(&doc),
            json!({
                "id": "6f1c1b0e-3f7a-4f59-9a55-0d8d1f1f2c11",
                "name": "Chair",
                "created_at": "2023-11-14T22:13:20.000Z",
                "tags": ["a", "b"],
                "count": 3,
            })
        );
    }

    #[test]
    fn reads_uuids_from_binary_and_text() {
        let id = Uuid::new();

        assert_eq!(uuid_from_bson(&Bson::from(id)), Some(id));
        assert_eq!(uuid_from_bson(&Bson::String(id.to_string())), Some(id));
        assert_eq!(uuid_from_bson(&Bson::String("nope".into())), None);
        assert_eq!(uuid_from_bson(&Bson::Int32(1)), None);
    }

    #[test]
    fn new_ids_increase() {
        let ids = (0..100).map(|_| new_document_id().bytes()).collect::<Vec<_>>();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
