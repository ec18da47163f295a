//! Error types and HTTP response handling.
//!
//! `AppError` is the top-level error of every handler and service. It wraps the
//! domain errors (configuration, authentication, storage) and implements
//! `IntoResponse`, so handlers return `Result<_, AppError>` and use `?` freely.
//! Every error body has the shape `{"error": "<message>"}`.

pub mod auth;
pub mod config;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shopdesk_store::error::DocumentStoreError;
use thiserror::Error;

use crate::{
    error::{auth::AuthError, config::ConfigError},
    model::api::ErrorDto,
};

/// Top-level application error type.
///
/// Domain errors convert in through `#[from]`. The message-carrying variants map to
/// fixed status codes and pass their message to the client verbatim, so they must
/// only ever hold text that is safe to show.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error during startup.
    ///
    /// Never reaches a client in practice; maps to 500 if it does.
    #[error(transparent)]
    ConfigErr(#[from] ConfigError),

    /// Authentication or authorization error.
    ///
    /// Delegates to `AuthError::into_response()`, always 401.
    #[error(transparent)]
    AuthErr(#[from] AuthError),

    /// Document store error.
    ///
    /// A missing document is 404 and a duplicate id or unique key is 409; everything
    /// else is logged and reported as 500.
    #[error(transparent)]
    StoreErr(#[from] DocumentStoreError),

    /// Filesystem error while storing uploads. Results in 500.
    #[error(transparent)]
    IoErr(#[from] std::io::Error),

    /// Malformed body, missing or mistyped field, bad identifier.
    ///
    /// Results in 400 Bad Request with the provided message.
    #[error("{0}")]
    Validation(String),

    /// Results in 404 Not Found with the provided message.
    #[error("{0}")]
    NotFound(String),

    /// A unique value is already taken. Results in 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Upload or body larger than the configured maximum. Results in 413.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Internal server error with a detailed message.
    ///
    /// Results in 500. The message is logged, the client gets a generic one.
    #[error("{0}")]
    InternalError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::InternalError(err.to_string())
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorDto { error: message })).into_response()
}

/// Converts application errors into HTTP responses.
///
/// # Returns
/// - 400 Bad Request - For `Validation`
/// - 401 Unauthorized - For `AuthErr`, delegated to `AuthError::into_response()`
/// - 404 Not Found - For `NotFound` and a store `DocumentNotFound`
/// - 409 Conflict - For `Conflict` and a store `DocumentAlreadyExists`
/// - 413 Payload Too Large - For `PayloadTooLarge`
/// - 500 Internal Server Error - For everything else, with details logged server-side
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::AuthErr(err) => err.into_response(),
            Self::Validation(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => error_body(StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => error_body(StatusCode::CONFLICT, msg),
            Self::PayloadTooLarge(msg) => error_body(StatusCode::PAYLOAD_TOO_LARGE, msg),
            Self::StoreErr(DocumentStoreError::DocumentNotFound(id, collection)) => {
                tracing::debug!("Document {} missing from {}", id, collection);
                error_body(StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Self::StoreErr(DocumentStoreError::DocumentAlreadyExists(key, collection)) => {
                tracing::debug!("Duplicate {} in {}", key, collection);
                error_body(StatusCode::CONFLICT, "Resource already exists".to_string())
            }
            err => InternalServerError(err).into_response(),
        }
    }
}

/// Wrapper type for converting any displayable error into a 500 Internal Server Error response.
///
/// Logs the full error and returns a generic "Internal server error" message so that
/// driver or filesystem details never reach the client.
pub struct InternalServerError<E>(pub E);

/// Converts wrapped errors into 500 Internal Server Error responses.
///
/// # Arguments
/// - `E` - Any type that implements `Display` (typically an error type)
///
/// # Returns
/// A 500 Internal Server Error response with a generic error message JSON body
impl<E: std::fmt::Display> IntoResponse for InternalServerError<E> {
    fn into_response(self) -> Response {
        tracing::error!("{}", self.0);

        error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    }
}
