//! Field schemas for collection-backed resources.
//!
//! A [`ResourceSpec`] lists the fields a client may write and how each is typed.
//! Request bodies are coerced against it before they reach the store, so unknown
//! fields are rejected and numbers sent as strings are normalized. Stored documents go
//! back through [`ResourceSpec::present`] on the way out.

use bson::{Bson, DateTime, Document as BsonDocument, Uuid};
use chrono::Utc;
use serde_json::{Map, Value};
use shopdesk_store::{document::to_plain_json, error::DocumentStoreResult, flex::FlexFloat};

use crate::error::AppError;

/// Keys the server owns. Clients may echo them back; they are dropped silently.
const SERVER_FIELDS: &[&str] = &["id", "_id", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// A string; `null` clears it.
    Text,
    /// A whole number. Numeric strings are accepted, fractions are not.
    Int,
    /// A [`FlexFloat`]: number, numeric string, or empty/null for unset.
    Flex,
    Bool,
    /// The id of another document, sent as a UUID string.
    Ref,
    /// An RFC 3339 timestamp.
    Timestamp,
    TextList,
    /// One of a fixed set of strings, matched case-insensitively.
    Choice(&'static [&'static str]),
    /// A list of embedded objects, each checked against the nested fields.
    Lines(&'static [FieldSpec]),
    /// A password. Hashed before storage and never returned.
    Secret,
}

impl FieldKind {
    fn describe(&self) -> String {
        match self {
            FieldKind::Text => "a string".to_string(),
            FieldKind::Int => "an integer".to_string(),
            FieldKind::Flex => "a number".to_string(),
            FieldKind::Bool => "a boolean".to_string(),
            FieldKind::Ref => "a valid ID".to_string(),
            FieldKind::Timestamp => "an RFC 3339 timestamp".to_string(),
            FieldKind::TextList => "a list of strings".to_string(),
            FieldKind::Choice(options) => format!("one of {}", options.join(", ")),
            FieldKind::Lines(_) => "a list of objects".to_string(),
            FieldKind::Secret => "a non-empty string".to_string(),
        }
    }

    fn is_list(&self) -> bool {
        matches!(self, FieldKind::Lines(_) | FieldKind::TextList)
    }

    /// Coerces a non-null scalar; `None` when the value has the wrong shape.
    fn coerce_scalar(&self, value: &Value) -> Option<Bson> {
        match self {
            FieldKind::Text => value.as_str().map(Bson::from),
            FieldKind::Secret => value
                .as_str()
                .filter(|text| !text.is_empty())
                .map(Bson::from),
            FieldKind::Int => match value {
                Value::Number(number) => number
                    .as_i64()
                    .or_else(|| number.as_f64().and_then(whole_number)),
                Value::String(text) => {
                    let text = text.trim();
                    text.parse::<i64>()
                        .ok()
                        .or_else(|| text.parse::<f64>().ok().and_then(whole_number))
                }
                _ => None,
            }
            .map(Bson::Int64),
            FieldKind::Flex => match value {
                Value::Number(number) => number.as_f64().map(FlexFloat::new),
                Value::String(text) => FlexFloat::parse(text).ok(),
                _ => None,
            }
            .map(Bson::from),
            FieldKind::Bool => value.as_bool().map(Bson::Boolean),
            FieldKind::Ref => value.as_str().and_then(|text| match text.trim() {
                "" => Some(Bson::Null),
                text => Uuid::parse_str(text).ok().map(Bson::from),
            }),
            FieldKind::Timestamp => value
                .as_str()
                .and_then(|text| chrono::DateTime::parse_from_rfc3339(text.trim()).ok())
                .map(|parsed| Bson::DateTime(DateTime::from_chrono(parsed.with_timezone(&Utc)))),
            FieldKind::TextList => value.as_array().and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(Bson::from))
                    .collect::<Option<Vec<_>>>()
                    .map(Bson::Array)
            }),
            FieldKind::Choice(options) => value.as_str().and_then(|text| {
                options
                    .iter()
                    .find(|option| option.eq_ignore_ascii_case(text.trim()))
                    .map(|option| Bson::from(*option))
            }),
            FieldKind::Lines(_) => None,
        }
    }
}

fn whole_number(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < 9.0e15).then_some(value as i64)
}

/// Value stored for a field that is absent from a create request.
#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    /// Leave it out (lists still default to `[]`).
    Absent,
    Int(i64),
    Text(&'static str),
    /// The current time.
    Now,
}

/// One writable field of a resource.
///
/// Built with the `const` constructors so that specs can live in statics:
///
/// ```ignore
/// const FIELDS: &[FieldSpec] = &[
///     FieldSpec::text("name").required(),
///     FieldSpec::int("count").non_negative().default_int(0),
/// ];
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Must be present and non-empty on create, and cannot be cleared by update.
    pub required: bool,
    /// Accepted on create, rejected by update.
    pub immutable: bool,
    pub non_negative: bool,
    pub default: FieldDefault,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            immutable: false,
            non_negative: false,
            default: FieldDefault::Absent,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int)
    }

    pub const fn flex(name: &'static str) -> Self {
        Self::new(name, FieldKind::Flex)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub const fn reference(name: &'static str) -> Self {
        Self::new(name, FieldKind::Ref)
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub const fn text_list(name: &'static str) -> Self {
        Self::new(name, FieldKind::TextList)
    }

    pub const fn choice(name: &'static str, options: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Choice(options))
    }

    pub const fn lines(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self::new(name, FieldKind::Lines(fields))
    }

    pub const fn secret(name: &'static str) -> Self {
        Self::new(name, FieldKind::Secret)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub const fn non_negative(mut self) -> Self {
        self.non_negative = true;
        self
    }

    pub const fn default_int(mut self, value: i64) -> Self {
        self.default = FieldDefault::Int(value);
        self
    }

    pub const fn default_text(mut self, value: &'static str) -> Self {
        self.default = FieldDefault::Text(value);
        self
    }

    pub const fn default_now(mut self) -> Self {
        self.default = FieldDefault::Now;
        self
    }

    fn default_value(&self) -> Option<Bson> {
        match self.default {
            FieldDefault::Int(value) => Some(Bson::Int64(value)),
            FieldDefault::Text(value) => Some(Bson::from(value)),
            FieldDefault::Now => Some(Bson::DateTime(DateTime::now())),
            FieldDefault::Absent if self.kind.is_list() => Some(Bson::Array(vec![])),
            FieldDefault::Absent => None,
        }
    }

    fn coerce(&self, value: &Value, path: &str) -> Result<Bson, AppError> {
        if value.is_null() {
            if self.required {
                return Err(AppError::validation(format!("{path} is required")));
            }

            return Ok(match self.kind.is_list() {
                true => Bson::Array(vec![]),
                false => Bson::Null,
            });
        }

        let mismatch = || AppError::validation(format!("{path} must be {}", self.kind.describe()));

        let coerced = match self.kind {
            FieldKind::Lines(fields) => Bson::Array(
                value
                    .as_array()
                    .ok_or_else(mismatch)?
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let object = item.as_object().ok_or_else(mismatch)?;
                        coerce_object(fields, &[], object, Mode::Create, &format!("{path}[{index}]"))
                            .map(Bson::Document)
                    })
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            kind => kind.coerce_scalar(value).ok_or_else(mismatch)?,
        };

        if self.required && is_blank(&coerced) {
            return Err(AppError::validation(format!("{path} is required")));
        }

        if self.non_negative && is_negative(&coerced) {
            return Err(AppError::validation(format!("{path} cannot be negative")));
        }

        Ok(coerced)
    }
}

fn is_blank(value: &Bson) -> bool {
    match value {
        Bson::Null => true,
        Bson::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn is_negative(value: &Bson) -> bool {
    match value {
        Bson::Int64(value) => *value < 0,
        Bson::Double(value) => *value < 0.0,
        _ => false,
    }
}

fn qualified(prefix: &str, name: &str) -> String {
    match prefix {
        "" => name.to_string(),
        prefix => format!("{prefix}.{name}"),
    }
}

/// Whether a body is coerced for insertion or for a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

fn coerce_object(
    fields: &[FieldSpec],
    derived: &[&str],
    object: &Map<String, Value>,
    mode: Mode,
    prefix: &str,
) -> Result<BsonDocument, AppError> {
    let mut document = BsonDocument::new();

    for (key, value) in object {
        if SERVER_FIELDS.contains(&key.as_str()) || derived.contains(&key.as_str()) {
            continue;
        }

        let path = qualified(prefix, key);
        let field = fields
            .iter()
            .find(|field| field.name == key)
            .ok_or_else(|| AppError::validation(format!("unknown field '{path}'")))?;

        if mode == Mode::Update && field.immutable {
            return Err(AppError::validation(format!("{path} cannot be updated")));
        }

        document.insert(key.clone(), field.coerce(value, &path)?);
    }

    if mode == Mode::Create {
        for field in fields {
            if document.contains_key(field.name) {
                continue;
            }

            if field.required {
                return Err(AppError::validation(format!(
                    "{} is required",
                    qualified(prefix, field.name)
                )));
            }

            if let Some(default) = field.default_value() {
                document.insert(field.name, default);
            }
        }
    }

    Ok(document)
}

/// Renders a stored document for a client.
///
/// Secrets are removed, [`FieldKind::Flex`] values are decoded (legacy strings become
/// numbers, empty becomes null) and list fields default to `[]`. A Flex value that
/// cannot be decoded is an error.
pub fn present_document(fields: &[FieldSpec], document: &BsonDocument) -> DocumentStoreResult<Map<String, Value>> {
    let mut output = Map::new();

    for (key, value) in document {
        if key == "_id" {
            continue;
        }

        let rendered = match fields.iter().find(|field| field.name == key).map(|field| field.kind) {
            Some(FieldKind::Secret) => continue,
            Some(FieldKind::Flex) => to_plain_json(&Bson::from(FlexFloat::try_from(value)?)),
            Some(FieldKind::Lines(nested)) => present_lines(nested, value)?,
            _ => to_plain_json(value),
        };

        output.insert(key.clone(), rendered);
    }

    for field in fields.iter().filter(|field| field.kind.is_list()) {
        let entry = output
            .entry(field.name)
            .or_insert(Value::Array(vec![]));

        match entry {
            Value::Null => *entry = Value::Array(vec![]),
            Value::String(single) if single.is_empty() => *entry = Value::Array(vec![]),
            Value::String(single) => *entry = Value::Array(vec![Value::String(std::mem::take(single))]),
            _ => {}
        }
    }

    Ok(output)
}

fn present_lines(fields: &[FieldSpec], value: &Bson) -> DocumentStoreResult<Value> {
    match value {
        Bson::Array(items) => items
            .iter()
            .map(|item| match item {
                Bson::Document(line) => present_document(fields, line).map(Value::Object),
                other => Ok(to_plain_json(other)),
            })
            .collect::<DocumentStoreResult<Vec<_>>>()
            .map(Value::Array),
        Bson::Null => Ok(Value::Array(vec![])),
        other => Ok(to_plain_json(other)),
    }
}

/// Who may read a resource. Writes are always admin-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    PublicRead,
    AdminOnly,
}

/// Static description of one collection-backed resource.
#[derive(Debug)]
pub struct ResourceSpec {
    /// Path segment under `/api/`
    pub route: &'static str,
    pub collection: &'static str,
    /// Singular display name used in messages ("Product not found")
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
    /// Read-only names added at presentation time; dropped if a client sends them.
    pub derived: &'static [&'static str],
    pub access: Access,
}

impl ResourceSpec {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Coerces a request body.
    ///
    /// # Returns
    /// - `Ok(BsonDocument)` - Typed fields ready to store; on create, with defaults
    /// - `Err(AppError::Validation)` - Body is not an object, a field is unknown,
    ///   mistyped, missing, negative or immutable, or an update names no field
    pub fn coerce(&self, body: &Value, mode: Mode) -> Result<BsonDocument, AppError> {
        let object = body
            .as_object()
            .ok_or_else(|| AppError::validation("Invalid request body"))?;

        let document = coerce_object(self.fields, self.derived, object, mode, "")?;

        if mode == Mode::Update && document.is_empty() {
            return Err(AppError::validation("no fields to update"));
        }

        Ok(document)
    }

    /// Coerces one embedded object against the nested fields of a `Lines` field.
    pub fn coerce_line(&self, field: &FieldSpec, body: &Value) -> Result<BsonDocument, AppError> {
        let FieldKind::Lines(fields) = field.kind else {
            return Err(AppError::internal(format!("{} is not a list of objects", field.name)));
        };

        let object = body
            .as_object()
            .ok_or_else(|| AppError::validation("Invalid request body"))?;

        coerce_object(fields, &[], object, Mode::Create, "")
    }

    pub fn present(&self, document: &BsonDocument) -> DocumentStoreResult<Map<String, Value>> {
        present_document(self.fields, document)
    }

    /// Names of fields holding passwords.
    pub fn secret_fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .filter(|field| matches!(field.kind, FieldKind::Secret))
            .map(|field| field.name)
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use serde_json::json;

    use super::*;

    const LINE: &[FieldSpec] = &[
        FieldSpec::reference("product_id").required(),
        FieldSpec::int("count").required().non_negative(),
        FieldSpec::flex("price"),
    ];

    static SPEC: ResourceSpec = ResourceSpec {
        route: "widgets",
        collection: "widgets",
        label: "Widget",
        fields: &[
            FieldSpec::text("name").required(),
            FieldSpec::flex("price"),
            FieldSpec::int("count").non_negative().default_int(0),
            FieldSpec::choice("status", &["pending", "shipped"]).default_text("pending"),
            FieldSpec::text_list("images"),
            FieldSpec::lines("products", LINE),
            FieldSpec::lines("history", LINE).immutable(),
            FieldSpec::secret("password"),
        ],
        derived: &["category_name"],
        access: Access::PublicRead,
    };

    fn message(result: Result<BsonDocument, AppError>) -> String {
        match result {
            Err(AppError::Validation(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_applies_defaults_and_normalizes_numbers() {
        let doc = SPEC
            .coerce(&json!({ "name": "Desk", "price": "12.50", "status": "SHIPPED" }), Mode::Create)
            .unwrap();

        assert_eq!(doc.get("price"), Some(&Bson::Double(12.5)));
        assert_eq!(doc.get("count"), Some(&Bson::Int64(0)));
        assert_eq!(doc.get_str("status").unwrap(), "shipped");
        assert_eq!(doc.get_array("images").unwrap().len(), 0);
        assert!(!doc.contains_key("password"));
    }

    #[test]
    fn rejects_unknown_missing_and_mistyped_fields() {
        assert_eq!(message(SPEC.coerce(&json!({ "name": "a", "colour": "red" }), Mode::Create)), "unknown field 'colour'");
        assert_eq!(message(SPEC.coerce(&json!({ "name": "  " }), Mode::Create)), "name is required");
        assert_eq!(message(SPEC.coerce(&json!({ "price": 3 }), Mode::Create)), "name is required");
        assert_eq!(message(SPEC.coerce(&json!({ "name": "a", "count": 1.5 }), Mode::Create)), "count must be an integer");
        assert_eq!(message(SPEC.coerce(&json!({ "name": "a", "count": -1 }), Mode::Create)), "count cannot be negative");
        assert_eq!(message(SPEC.coerce(&json!(["name"]), Mode::Create)), "Invalid request body");
    }

    #[test]
    fn nested_lines_report_their_path() {
        let body = json!({
            "name": "a",
            "products": [{ "product_id": Uuid::new().to_string(), "count": "2" }, { "product_id": "x", "count": 1 }],
        });

        assert_eq!(message(SPEC.coerce(&body, Mode::Create)), "products[1].product_id must be a valid ID");
    }

    #[test]
    fn update_keeps_only_named_fields() {
        let doc = SPEC
            .coerce(&json!({ "id": "ignored", "category_name": "x", "count": "4" }), Mode::Update)
            .unwrap();

        assert_eq!(doc, doc! { "count": 4i64 });
        assert_eq!(message(SPEC.coerce(&json!({ "history": [] }), Mode::Update)), "history cannot be updated");
        assert_eq!(message(SPEC.coerce(&json!({ "created_at": "now" }), Mode::Update)), "no fields to update");
        assert_eq!(message(SPEC.coerce(&json!({ "name": null }), Mode::Update)), "name is required");
    }

    #[test]
    fn presents_legacy_values_and_hides_secrets() {
        let stored = doc! {
            "_id": "internal",
            "name": "Desk",
            "price": "99.90",
            "password": "$2b$04$hash",
            "products": [{ "count": 1i64, "price": "" }],
        };

        let shown = Value::Object(SPEC.present(&stored).unwrap());

        assert_eq!(
            shown,
            json!({
                "name": "Desk",
                "price": 99.9,
                "products": [{ "count": 1, "price": null }],
                "images": [],
                "history": [],
            })
        );
    }

    #[test]
    fn undecodable_flex_value_is_an_error() {
        assert!(SPEC.present(&doc! { "price": "twelve" }).is_err());
    }
}
