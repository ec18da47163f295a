use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::Value;

use crate::{
    controller::extract::json_body,
    error::AppError,
    middleware::auth::AuthGuard,
    resource::{schema::ResourceSpec, singleton::SingletonService},
    service::auth::token::Role,
    state::AppState,
};

/// GET /api/{singleton}
///
/// # Returns
/// - `200 OK`: the document, without an id
/// - `404 Not Found`: not created yet
pub async fn get(
    State(state): State<AppState>,
    Extension(spec): Extension<&'static ResourceSpec>,
) -> Result<impl IntoResponse, AppError> {
    let item = SingletonService::new(&state, spec).get().await?;

    Ok((StatusCode::OK, Json(item)))
}

/// POST /api/{singleton} - Admin only
///
/// # Returns
/// - `201 Created`: the stored document
/// - `409 Conflict`: it already exists
pub async fn create(
    State(state): State<AppState>,
    Extension(spec): Extension<&'static ResourceSpec>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let item = SingletonService::new(&state, spec).create(&body).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/{singleton} - Admin only, partial update
pub async fn update(
    State(state): State<AppState>,
    Extension(spec): Extension<&'static ResourceSpec>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let item = SingletonService::new(&state, spec).update(&body).await?;

    Ok((StatusCode::OK, Json(item)))
}

/// DELETE /api/{singleton} - Admin only
pub async fn delete(
    State(state): State<AppState>,
    Extension(spec): Extension<&'static ResourceSpec>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let message = SingletonService::new(&state, spec).delete().await?;

    Ok((StatusCode::OK, Json(message)))
}
