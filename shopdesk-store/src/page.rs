//! Pagination parameters and the list envelope.
//!
//! List endpoints accept `page` and `limit` and answer with a [`Page`]:
//! `{ "data": [...], "total": N, "page": P, "limit": L }`.
//! Pages are 1-indexed and `limit` is capped at [`MAX_LIMIT`].

use serde::{Deserialize, Serialize};

use crate::{
    document::ID_FIELD,
    query::{Query, SortDirection},
};

/// Page size used when the client does not ask for one.
pub const DEFAULT_LIMIT: usize = 10;

/// Largest page a client can request; larger values are clamped, not rejected.
pub const MAX_LIMIT: usize = 100;

/// A single page of results together with the size of the full result set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items on this page.
    pub data: Vec<T>,
    /// Number of matching items across all pages.
    pub total: u64,
    /// The page number (1-indexed).
    pub page: usize,
    /// The page size that was applied.
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        Self {
            data,
            total,
            page: params.page,
            limit: params.limit,
        }
    }

    /// Maps the items while keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
        }
    }
}

/// Page selection as sent by the client.
///
/// Deserialize straight from a query string; missing values fall back to page 1 and
/// [`DEFAULT_LIMIT`]. Call [`PaginationParams::normalized`] before use.
///
/// # Example
///
/// ```ignore
/// use shopdesk_store::page::PaginationParams;
///
/// let params = PaginationParams::new(3, 20);
/// assert_eq!(params.offset(), 40);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl PaginationParams {
    /// Creates normalized pagination parameters.
    pub fn new(page: usize, limit: usize) -> Self {
        Self { page, limit }.normalized()
    }

    /// Forces `page >= 1` and `1 <= limit <= MAX_LIMIT`; a zero limit means the default.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: match self.limit {
                0 => DEFAULT_LIMIT,
                limit => limit.min(MAX_LIMIT),
            },
        }
    }

    /// Reads raw query-string values. Anything missing or unparsable falls back to the
    /// default, then the result is normalized.
    pub fn parse(page: Option<&str>, limit: Option<&str>) -> Self {
        let read = |raw: Option<&str>, default: usize| {
            raw.and_then(|value| value.trim().parse::<i64>().ok())
                .map_or(default, |value| usize::try_from(value).unwrap_or(0))
        };

        Self {
            page: read(page, 1),
            limit: read(limit, DEFAULT_LIMIT),
        }
        .normalized()
    }

    /// Number of items to skip for this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// A query for this page, newest first by `sort_field`.
    ///
    /// Documents with the same `sort_field` value are ordered by descending `id`.
    /// Ids are time-ordered (see [`crate::document::new_document_id`]), so ties still come back
    /// newest first and pages never overlap.
    pub fn newest_first(&self, sort_field: &str) -> crate::query::QueryBuilder {
        Query::builder()
            .sort(sort_field, SortDirection::Desc)
            .sort(ID_FIELD, SortDirection::Desc)
            .offset(self.offset())
            .limit(self.limit)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_LIMIT }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_follows_page_and_limit() {
        assert_eq!(PaginationParams::new(1, 10).offset(), 0);
        assert_eq!(PaginationParams::new(2, 5).offset(), 5);
        assert_eq!(PaginationParams::new(3, 20).offset(), 40);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(PaginationParams::new(0, 10), PaginationParams { page: 1, limit: 10 });
        assert_eq!(PaginationParams::new(1, 0).limit, DEFAULT_LIMIT);
        assert_eq!(PaginationParams::new(1, 5_000).limit, MAX_LIMIT);
    }

    #[test]
    fn parses_loose_query_values() {
        assert_eq!(PaginationParams::parse(Some("2"), Some("5")), PaginationParams::new(2, 5));
        assert_eq!(PaginationParams::parse(Some("-3"), Some("abc")), PaginationParams::default());
        assert_eq!(PaginationParams::parse(None, Some("1000")).limit, MAX_LIMIT);
        assert_eq!(PaginationParams::parse(None, None), PaginationParams::default());
    }

    #[test]
    fn defaults_when_missing_from_query_string() {
        let params: PaginationParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, PaginationParams::default());
    }

    #[test]
    fn page_serializes_as_list_envelope() {
        let page = Page::new(vec!["a", "b"], 12, &PaginationParams::new(2, 5));

        assert_eq!(
            serde_json::to_value(&page).unwrap(),
            serde_json::json!({ "data": ["a", "b"], "total": 12, "page": 2, "limit": 5 })
        );
    }
}
