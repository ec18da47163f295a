//! Application state shared across all request handlers.

use std::sync::Arc;

use shopdesk_store::store::DynDocumentStore;

use crate::{
    config::Config,
    error::AppError,
    service::auth::{password::DecoyHash, token::TokenService},
};

/// Shared resources handed to every handler through axum's `State` extractor.
///
/// Cloning is cheap: every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Document store over whichever backend was selected at startup.
    pub store: Arc<DynDocumentStore>,

    /// Signs and verifies bearer tokens.
    pub tokens: Arc<TokenService>,

    /// Checked in place of a password hash when a login names no account.
    pub decoy_hash: Arc<DecoyHash>,

    pub config: Arc<Config>,
}

impl AppState {
    /// Creates the state from a ready store and the loaded configuration.
    ///
    /// # Arguments
    /// - `store` - Document store, already migrated
    /// - `config` - Loaded configuration; the token service is keyed from its secret
    ///
    /// # Returns
    /// - `Ok(AppState)` - Initialized application state ready for use
    /// - `Err(AppError)` - The decoy password hash could not be computed
    pub async fn new(store: Arc<DynDocumentStore>, config: Config) -> Result<Self, AppError> {
        Ok(Self {
            store,
            tokens: Arc::new(TokenService::new(&config.jwt_secret)),
            decoy_hash: Arc::new(DecoyHash::new(config.bcrypt_cost).await?),
            config: Arc::new(config),
        })
    }
}
