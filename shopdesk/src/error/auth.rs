use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::model::api::ErrorDto;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The request carries no `Authorization` header.
    #[error("Authorization header required")]
    MissingHeader,

    /// The `Authorization` header is not of the form `Bearer <token>`.
    #[error("Invalid authorization format")]
    InvalidFormat,

    /// The token is malformed or its signature does not verify.
    #[error("Invalid token")]
    InvalidToken,

    /// The token was valid once but its `exp` claim has passed.
    #[error("Token expired")]
    TokenExpired,

    /// A valid token issued for the other identity domain, e.g. a user token on an
    /// admin route.
    #[error("Invalid token type")]
    WrongRole,

    /// Login failed. Deliberately the same for an unknown identity and a wrong
    /// password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Correct credentials for a user whose account has been switched off.
    #[error("Account is deactivated")]
    AccountDeactivated,
}

/// Converts authentication errors into HTTP responses.
///
/// Every variant maps to 401 Unauthorized and its display text becomes the `error`
/// field of the body. Details are logged at debug level only.
///
/// # Returns
/// - 401 Unauthorized - For all variants
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!("Rejected request: {:?}", self);

        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorDto {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
