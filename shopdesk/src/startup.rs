//! Process startup: store connection, migrations, admin bootstrap and the HTTP server.

use std::{net::SocketAddr, sync::Arc};

use shopdesk_store::{
    backend::StoreBackendBuilder,
    migrate::Migrator,
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
};
use shopdesk_store_memory::InMemoryStore;
use tokio::net::TcpListener;

use crate::{
    config::{Config, StoreKind},
    error::AppError,
    migrations::AppMigrations,
    router::app,
    service::auth::bootstrap_admin,
    state::AppState,
};

#[cfg(feature = "mongodb")]
async fn connect_mongodb(config: &Config) -> Result<DynDocumentStore, AppError> {
    use shopdesk_store_mongodb::MongoDbStore;

    let backend = MongoDbStore::builder(&config.mongodb_uri, &config.mongodb_database)
        .build()
        .await?;

    Ok(DocumentStore::new(backend).into_dyn())
}

#[cfg(not(feature = "mongodb"))]
async fn connect_mongodb(_config: &Config) -> Result<DynDocumentStore, AppError> {
    Err(crate::error::config::ConfigError::invalid(
        "STORE_BACKEND",
        "this build has no MongoDB support, use 'memory'",
    )
    .into())
}

/// Builds the configured store backend and brings its schema up to date.
///
/// # Arguments
/// - `config` - Application configuration selecting the backend
///
/// # Returns
/// - `Ok(DynDocumentStore)` - Connected store with every migration applied
/// - `Err(AppError)` - Could not connect, or a migration failed
pub async fn connect_to_store(config: &Config) -> Result<DynDocumentStore, AppError> {
    let store = match config.store {
        StoreKind::MongoDb => connect_mongodb(config).await?,
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on shutdown");
            DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn()
        }
    };

    store.upgrade::<AppMigrations>().await?;

    Ok(store)
}

/// Connects the store, bootstraps the administrator and assembles the shared state.
pub async fn build_state(config: Config) -> Result<AppState, AppError> {
    let store = connect_to_store(&config).await?;

    if bootstrap_admin(&store, &config).await? {
        tracing::info!("Bootstrapped administrator from ADMIN_NAME");
    }

    AppState::new(Arc::new(store), config).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }

    tracing::info!("Shutting down");
}

/// Serves the API until Ctrl-C, then closes the store.
pub async fn run(config: Config) -> Result<(), AppError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = build_state(config).await?;
    let store = state.store.clone();

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(store) {
        Ok(store) => store.shutdown().await?,
        Err(_) => tracing::warn!("Store still in use at shutdown, skipping close"),
    }

    Ok(())
}
