//! Request parsing shared by the controllers.

use std::collections::HashMap;

use axum::{Json, extract::rejection::JsonRejection, http::StatusCode};
use shopdesk_store::page::PaginationParams;

use crate::error::AppError;

/// Unwraps a JSON body, turning axum's rejection into the service's error shape.
///
/// # Returns
/// - `Ok(T)` - The parsed body
/// - `Err(AppError::PayloadTooLarge)` - Body exceeds the configured limit
/// - `Err(AppError::Validation)` - Missing content type, malformed JSON or wrong shape
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(AppError::PayloadTooLarge("Request body too large".to_string()))
        }
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection.body_text());
            Err(AppError::validation("Invalid request body"))
        }
    }
}

pub fn query_value<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(String::as_str)
}

/// `page` and `limit` from the query string, normalized.
pub fn pagination(query: &HashMap<String, String>) -> PaginationParams {
    PaginationParams::parse(query_value(query, "page"), query_value(query, "limit"))
}
