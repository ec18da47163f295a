//! Route table and the middleware stack around it.

use std::{path::Path, time::Duration};

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeader,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    controller::{admin, auth, dashboard, files, health, resource, singleton},
    resource::{catalogue::CATALOGUE, singleton::SINGLETONS},
    service::files::PUBLIC_PREFIX,
    state::AppState,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Uploaded files, served so that active content (SVG, HTML) cannot run on the API origin.
fn upload_files(
    dir: &Path,
) -> SetResponseHeader<SetResponseHeader<ServeDir, HeaderValue>, HeaderValue> {
    let sandboxed = SetResponseHeader::overriding(
        ServeDir::new(dir),
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("sandbox"),
    );
    SetResponseHeader::overriding(
        sandboxed,
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    )
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/api/auth/logout", post(auth::logout))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/register", post(admin::register))
        .route("/api/admin/profile", get(admin::get_profile).put(admin::update_profile))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/dashboard/stats", get(dashboard::stats))
        .route("/api/admin/dashboard/sales-analytics", get(dashboard::sales_analytics))
        .route("/api/admin/dashboard/user-growth", get(dashboard::user_growth))
        .route("/api/admin/dashboard/top-products", get(dashboard::top_products))
        .route("/api/admin/dashboard/recent-activity", get(dashboard::recent_activity))
        .route("/api/admin/dashboard/alerts", get(dashboard::alerts))
}

fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/api/files/upload", post(files::upload))
        .route("/api/files/upload-multiple", post(files::upload_multiple))
        .route("/api/files/limits", get(files::limits))
}

/// One route pair per catalogue entry, each carrying its [`Resource`](crate::resource::catalogue::Resource)
/// as an extension, plus the product-only listings.
fn resource_routes() -> Router<AppState> {
    let router = Router::new()
        .route("/api/products/discounted", get(resource::list_discounted_products))
        .route(
            "/api/products/by-top-category/{top_category_id}",
            get(resource::list_products_by_top_category),
        );

    CATALOGUE.iter().copied().fold(router, |router, entry| {
        let base = format!("/api/{}", entry.spec.route);

        let router = router
            .route(
                &base,
                get(resource::list)
                    .post(resource::create)
                    .layer(Extension(entry)),
            )
            .route(
                &format!("{base}/{{id}}"),
                get(resource::get_one)
                    .put(resource::update)
                    .delete(resource::delete)
                    .layer(Extension(entry)),
            );

        if entry.has_order_history() {
            router.route(
                &format!("{base}/{{id}}/order-history"),
                post(resource::append_history).layer(Extension(entry)),
            )
        } else {
            router
        }
    })
}

fn singleton_routes() -> Router<AppState> {
    SINGLETONS.iter().copied().fold(Router::new(), |router, spec| {
        router.route(
            &format!("/api/{}", spec.route),
            get(singleton::get)
                .post(singleton::create)
                .put(singleton::update)
                .delete(singleton::delete)
                .layer(Extension(spec)),
        )
    })
}

/// Every API route, without middleware or state.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health))
        .merge(auth_routes())
        .merge(admin_routes())
        .merge(file_routes())
        .merge(resource_routes())
        .merge(singleton_routes())
}

/// The complete application: routes, static uploads, middleware and state.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    router()
        .nest_service(PUBLIC_PREFIX, upload_files(&state.config.upload_dir))
        .fallback(health::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
