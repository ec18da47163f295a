//! Admin dashboard under `/api/admin/dashboard`.
//!
//! Every endpoint answers 200 once the caller is authenticated; a metric that could
//! not be computed is reported inside the body as `{"ok": false, "error": ...}`.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;

use crate::{
    controller::extract::query_value,
    error::AppError,
    middleware::auth::AuthGuard,
    service::{
        auth::token::Role,
        dashboard::{DashboardService, Period, clamp_limit},
    },
    state::AppState,
};

/// GET /api/admin/dashboard/stats
///
/// # Returns
/// - `200 OK`: user, order, product and review counters plus a `timestamp`
pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let stats = DashboardService::new(&state).stats(Utc::now()).await;

    Ok((StatusCode::OK, Json(stats)))
}

/// GET /api/admin/dashboard/sales-analytics
///
/// # Query Parameters
/// - `period`: `day`, `week`, `month` (default) or `year`
pub async fn sales_analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let period = Period::parse(query_value(&query, "period"));
    let series = DashboardService::new(&state)
        .sales_analytics(period, Utc::now())
        .await;

    Ok((StatusCode::OK, Json(series)))
}

/// GET /api/admin/dashboard/user-growth
///
/// # Query Parameters
/// - `period`: `day`, `week`, `month` (default) or `year`
pub async fn user_growth(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let period = Period::parse(query_value(&query, "period"));
    let series = DashboardService::new(&state)
        .user_growth(period, Utc::now())
        .await;

    Ok((StatusCode::OK, Json(series)))
}

/// GET /api/admin/dashboard/top-products
///
/// # Query Parameters
/// - `limit`: number of products, default 10, at most 100
pub async fn top_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let limit = clamp_limit(query_value(&query, "limit"), 10);
    let ranking = DashboardService::new(&state).top_products(limit).await;

    Ok((StatusCode::OK, Json(ranking)))
}

/// GET /api/admin/dashboard/recent-activity
///
/// # Query Parameters
/// - `limit`: number of entries, default 20, at most 100
pub async fn recent_activity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let limit = clamp_limit(query_value(&query, "limit"), 20);
    let activity = DashboardService::new(&state).recent_activity(limit).await;

    Ok((StatusCode::OK, Json(activity)))
}

/// GET /api/admin/dashboard/alerts
pub async fn alerts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    AuthGuard::new(&state, &headers).require(Role::Admin)?;

    let alerts = DashboardService::new(&state).alerts(Utc::now()).await;

    Ok((StatusCode::OK, Json(alerts)))
}
