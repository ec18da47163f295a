//! Query expression evaluation for in-memory document filtering.
//!
//! Matching mirrors what the MongoDB translator produces so handlers behave the same
//! against either backend: string operators are case-insensitive, negative operators
//! (`Ne`, `NoneOf`) match documents that lack the field, and an equality
//! test against an array field matches when any element is equal.

use bson::{Bson, Document as BsonDocument, datetime::DateTime, spec::BinarySubtype};
use std::{cmp::Ordering, collections::HashMap};

use shopdesk_store::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types (including decimals) are normalized to `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    /// Binary payloads, which includes UUIDs.
    Binary(BinarySubtype, &'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::Decimal128(value) => value
                .to_string()
                .parse::<f64>()
                .map(Comparable::Number)
                .unwrap_or(Comparable::Null),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Binary(binary.subtype, &binary.bytes),
            Bson::Array(arr) => Comparable::Array(
                arr.iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>(),
            ),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Binary(sa, a), Comparable::Binary(sb, b)) => sa == sb && a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Binary(sa, a), Comparable::Binary(sb, b)) if sa == sb => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Ordering used for sorting: missing and incomparable values sort first.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Null, _) => Ordering::Less,
            (_, Comparable::Null) => Ordering::Greater,
            _ => self.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }
}

/// Resolves a possibly dotted path (`"contacts.phone"`) inside a document.
pub(crate) fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

fn array_holds(array: &[Comparable<'_>], value: &Comparable<'_>) -> bool {
    match value {
        Comparable::Array(values) => values
            .iter()
            .any(|val| array.contains(val)),
        single => array.contains(single),
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a BsonDocument,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a BsonDocument) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns whether `document` matches `expr`. Non-document values never match.
    pub fn matches(document: &Bson, expr: &Expr) -> DocumentStoreResult<bool> {
        match document.as_document() {
            Some(doc) => DocumentEvaluator::new(doc).evaluate(expr),
            None => Ok(false),
        }
    }

    pub fn filter_documents<'b>(
        documents: impl IntoIterator<Item = &'b Bson>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut matched = Vec::new();

        for doc in documents {
            if DocumentEvaluator::matches(doc, expr)? {
                matched.push(doc.clone());
            }
        }

        Ok(matched)
    }

    fn compare(field_value: &Bson, op: &FieldOp, value: &Bson) -> bool {
        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        match op {
            FieldOp::Eq => match &left {
                Comparable::Array(array) if !matches!(right, Comparable::Array(_)) => {
                    array.contains(&right)
                }
                _ => left == right,
            },
            FieldOp::Ne => !Self::compare(field_value, &FieldOp::Eq, value),
            FieldOp::Gt | FieldOp::Gte | FieldOp::Lt | FieldOp::Lte => {
                match left.partial_cmp(&right) {
                    Some(ordering) => match op {
                        FieldOp::Gt => ordering == Ordering::Greater,
                        FieldOp::Gte => ordering != Ordering::Less,
                        FieldOp::Lt => ordering == Ordering::Less,
                        _ => ordering != Ordering::Greater,
                    },
                    None => false,
                }
            }
            FieldOp::Contains => match (&left, &right) {
                (Comparable::String(haystack), Comparable::String(needle)) => {
                    contains_ignore_case(haystack, needle)
                }
                (Comparable::Array(array), Comparable::Array(values)) => values
                    .iter()
                    .all(|val| array.contains(val)),
                (Comparable::Array(array), single) => array.contains(single),
                _ => false,
            },
            FieldOp::AnyOf => match (&left, &right) {
                (Comparable::Array(array), values) => array_holds(array, values),
                (single, Comparable::Array(values)) => values.contains(single),
                (single, other) => single == other,
            },
            FieldOp::NoneOf => !Self::compare(field_value, &FieldOp::AnyOf, value),
        }
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(lookup(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(match lookup(self.document, field) {
            Some(field_value) => Self::compare(field_value, op, value),
            None => matches!(op, FieldOp::Ne | FieldOp::NoneOf),
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::{Uuid, doc};
    use shopdesk_store::query::Filter;

    use super::*;

    fn product() -> Bson {
        Bson::Document(doc! {
            "name": "Office Chair",
            "price": 120.5,
            "count": 3,
            "tags": ["furniture", "office"],
            "category_id": Uuid::parse_str("6f1c1b7e-3b0a-4d8e-9a51-0a6c2b7f9e10").unwrap(),
            "meta": { "color": "black" },
        })
    }

    fn check(expr: Expr) -> bool {
        DocumentEvaluator::matches(&product(), &expr).unwrap()
    }

    #[test]
    fn contains_ignores_case() {
        assert!(check(Filter::contains("name", "chair")));
        assert!(check(Filter::contains("name", "OFFICE")));
        assert!(!check(Filter::contains("name", "table")));
    }

    #[test]
    fn uuid_equality_compares_bytes() {
        let same = Uuid::parse_str("6f1c1b7e-3b0a-4d8e-9a51-0a6c2b7f9e10").unwrap();

        assert!(check(Filter::eq("category_id", same)));
        assert!(!check(Filter::eq("category_id", Uuid::new())));
    }

    #[test]
    fn numbers_compare_across_widths() {
        assert!(check(Filter::gt("price", 100)));
        assert!(check(Filter::lte("count", 3.0)));
        assert!(!check(Filter::lt("count", 3i64)));
    }

    #[test]
    fn negative_operators_match_missing_fields() {
        assert!(check(Filter::ne("discount", 10)));
        assert!(check(Filter::none_of("status", vec!["cancelled"])));
        assert!(!check(Filter::eq("discount", 10)));
    }

    #[test]
    fn equality_on_array_field_matches_any_element() {
        assert!(check(Filter::eq("tags", "office")));
        assert!(check(Filter::any_of("tags", vec!["kitchen", "office"])));
        assert!(!check(Filter::any_of("tags", vec!["kitchen"])));
    }

    #[test]
    fn dotted_paths_reach_nested_fields() {
        assert!(check(Filter::eq("meta.color", "black")));
        assert!(check(Filter::not_exists("meta.size")));
    }

    #[test]
    fn search_matches_any_listed_field() {
        assert!(check(Filter::search(["description", "name"], "chair")));
        assert!(!check(Filter::search(["description", "name"], "lamp")));
    }

    #[test]
    fn nulls_sort_before_values() {
        let value = Bson::Int32(1);

        assert_eq!(Comparable::Null.sort_cmp(&Comparable::from(&value)), Ordering::Less);
    }
}
