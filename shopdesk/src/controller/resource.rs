//! Handlers shared by every catalogue resource.
//!
//! Each route carries its [`Resource`] as a request extension, so one set of handlers
//! serves all collections.

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::Value;
use shopdesk_store::query::Filter;

use crate::{
    controller::extract::{json_body, pagination},
    error::AppError,
    middleware::auth::AuthGuard,
    resource::{
        catalogue::{PRODUCTS, Resource},
        dispatcher::{ResourceService, parse_id},
        schema::Access,
    },
    service::auth::token::Role,
    state::AppState,
};

fn require_read(state: &AppState, headers: &HeaderMap, resource: &Resource) -> Result<(), AppError> {
    if resource.spec.access == Access::AdminOnly {
        AuthGuard::new(state, headers).require(Role::Admin)?;
    }

    Ok(())
}

/// GET /api/{resource} - Paginated list, newest first
///
/// # Query Parameters
/// - `page`, `limit`: page selection (limit capped at 100)
/// - resource-specific filters such as `category_id` or `search`
///
/// # Returns
/// - `200 OK`: `{data, total, page, limit}`
/// - `400 Bad Request`: malformed filter value
/// - `401 Unauthorized`: admin-only resource without an admin token
pub async fn list(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    require_read(&state, &headers, resource)?;

    let page = ResourceService::new(&state, resource)
        .list(pagination(&query), &query)
        .await?;

    Ok((StatusCode::OK, Json(page)))
}

/// GET /api/{resource}/{id}
///
/// # Returns
/// - `200 OK`: the document
/// - `400 Bad Request`: malformed id
/// - `404 Not Found`: no such document
pub async fn get_one(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_read(&state, &headers, resource)?;

    let item = ResourceService::new(&state, resource).get(&id).await?;

    Ok((StatusCode::OK, Json(item)))
}

/// POST /api/{resource} - Admin only
///
/// # Returns
/// - `201 Created`: the stored document with its generated id
/// - `400 Bad Request`: unknown, missing or mistyped field
pub async fn create(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    headers: HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let item = ResourceService::new(&state, resource).create(&body).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/{resource}/{id} - Admin only, partial update
///
/// # Returns
/// - `200 OK`: the document after the update
/// - `400 Bad Request`: malformed id or field
/// - `404 Not Found`: no such document
pub async fn update(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let item = ResourceService::new(&state, resource)
        .update(&id, &body)
        .await?;

    Ok((StatusCode::OK, Json(item)))
}

/// DELETE /api/{resource}/{id} - Admin only
pub async fn delete(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let message = ResourceService::new(&state, resource).delete(&id).await?;

    Ok((StatusCode::OK, Json(message)))
}

/// POST /api/{clients|companies|counterparties}/{id}/order-history - Admin only
///
/// Appends one entry; existing entries are never replaced.
///
/// # Returns
/// - `201 Created`: the owning document including the new entry
/// - `400 Bad Request`: the entry fails validation
/// - `404 Not Found`: no such document
pub async fn append_history(
    State(state): State<AppState>,
    Extension(resource): Extension<&'static Resource>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;
    let body = json_body(payload)?;

    let item = ResourceService::new(&state, resource)
        .append_history(&id, &body)
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /api/products/discounted - Products whose discount is set and positive
pub async fn list_discounted_products(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let page = ResourceService::new(&state, &PRODUCTS)
        .list_filtered(Some(Filter::gt("discount", 0.0)), pagination(&query))
        .await?;

    Ok((StatusCode::OK, Json(page)))
}

/// GET /api/products/by-top-category/{top_category_id}
pub async fn list_products_by_top_category(
    State(state): State<AppState>,
    Path(top_category_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let top_category_id = parse_id(&top_category_id)?;

    let page = ResourceService::new(&state, &PRODUCTS)
        .list_filtered(
            Some(Filter::eq("top_category_id", top_category_id)),
            pagination(&query),
        )
        .await?;

    Ok((StatusCode::OK, Json(page)))
}
