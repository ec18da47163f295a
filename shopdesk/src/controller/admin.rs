//! Administrator authentication under `/api/admin`.

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
    model::{account::AdminCredentialsDto, api::MessageDto},
    service::auth::{AdminAuthService, token::Role},
    state::AppState,
};

/// POST /api/admin/login
///
/// # Returns
/// - `200 OK`: `{token, admin}`
/// - `400 Bad Request`: name or password missing
/// - `401 Unauthorized`: "Invalid credentials", whether or not the name exists
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<AdminCredentialsDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let body = json_body(payload)?;

    let auth = AdminAuthService::new(&state).login(body).await?;

    Ok((StatusCode::OK, Json(auth)))
}

/// POST /api/admin/register - Requires an admin token
///
/// # Returns
/// - `201 Created`: `{token, admin}` for the new administrator
/// - `409 Conflict`: name taken
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AdminCredentialsDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let auth = AdminAuthService::new(&state).register(body).await?;

    Ok((StatusCode::CREATED, Json(auth)))
}

/// GET /api/admin/profile - Requires an admin token
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let claims = AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let admin = AdminAuthService::new(&state)
        .profile(claims.subject()?)
        .await?;

    Ok((StatusCode::OK, Json(admin.into_dto())))
}

/// PUT /api/admin/profile - Requires an admin token
///
/// Name and password are both required. The response carries a fresh token because
/// the old one names the previous account name.
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AdminCredentialsDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let claims = AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let auth = AdminAuthService::new(&state)
        .update_profile(claims.subject()?, body)
        .await?;

    Ok((StatusCode::OK, Json(auth)))
}

/// POST /api/admin/logout - Requires an admin token
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    Ok((StatusCode::OK, Json(MessageDto::new("Logged out successfully"))))
}
