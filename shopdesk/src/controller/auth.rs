//! Customer authentication under `/api/auth`.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    controller::extract::json_body,
    error::AppError,
    middleware::auth::AuthGuard,
    model::{
        account::{LoginUserDto, RegisterUserDto, UpdateProfileDto},
        api::MessageDto,
    },
    service::auth::{UserAuthService, token::Role},
    state::AppState,
};

/// POST /api/auth/register
///
/// # Returns
/// - `201 Created`: `{token, user}`
/// - `400 Bad Request`: missing field or phone not in `+998XXXXXXXXX` form
/// - `409 Conflict`: phone or email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(payload)?;

    let auth = UserAuthService::new(&state).register(body).await?;

    Ok((StatusCode::CREATED, Json(auth)))
}

/// POST /api/auth/login
///
/// # Returns
/// - `200 OK`: `{token, user}`
/// - `401 Unauthorized`: "Invalid credentials" for an unknown phone or a wrong
///   password alike, "Account is deactivated" for an inactive account
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginUserDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(payload)?;

    let auth = UserAuthService::new(&state).login(body).await?;

    Ok((StatusCode::OK, Json(auth)))
}

/// GET /api/auth/profile - Requires a user token
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let claims = AuthGuard::new(&state, &headers).require(Role::User)?;

    let user = UserAuthService::new(&state)
        .profile(claims.subject()?)
        .await?;

    Ok((StatusCode::OK, Json(user)))
}

/// PUT /api/auth/profile - Requires a user token
///
/// # Returns
/// - `200 OK`: the updated account
/// - `409 Conflict`: phone or email taken by another account
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdateProfileDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let claims = AuthGuard::new(&state, &headers).require(Role::User)?;
    let body = json_body(payload)?;

    let user = UserAuthService::new(&state)
        .update_profile(claims.subject()?, body)
        .await?;

    Ok((StatusCode::OK, Json(user)))
}

/// POST /api/auth/logout - Requires a user token
///
/// Tokens are not tracked server-side; the client discards its copy.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::User)?;

    Ok((StatusCode::OK, Json(MessageDto::new("Logged out successfully"))))
}
