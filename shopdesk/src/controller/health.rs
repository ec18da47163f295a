//! Service metadata, liveness and the catch-all 404.

use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::{
    resource::{catalogue::CATALOGUE, singleton::SINGLETONS},
    state::AppState,
};

/// GET / - Service name, version and a summary of the mounted routes
pub async fn index() -> impl IntoResponse {
    let resources = CATALOGUE
        .iter()
        .map(|resource| format!("/api/{}", resource.spec.route))
        .collect::<Vec<_>>();
    let singletons = SINGLETONS
        .iter()
        .map(|spec| format!("/api/{}", spec.route))
        .collect::<Vec<_>>();

    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "routes": {
            "auth": "/api/auth",
            "admin": "/api/admin",
            "dashboard": "/api/admin/dashboard",
            "files": "/api/files",
            "uploads": "/uploads",
            "health": "/health",
            "resources": resources,
            "singletons": singletons,
        },
    }))
}

/// GET /health
///
/// Always 200 while the process serves requests; `database` reports whether the store
/// answered a collection listing.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.store.list_collections().await {
        Ok(_) => "connected",
        Err(err) => {
            tracing::warn!("Health check could not reach the store: {}", err);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "database": database,
    }))
}

/// Fallback for every unmatched route.
pub async fn not_found(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "path": uri.path(),
            "method": method.as_str(),
        })),
    )
}
