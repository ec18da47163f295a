//! bcrypt hashing, run off the async executor.

use crate::error::AppError;

/// Hashes `password` with the given bcrypt cost.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();

    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

/// Checks `password` against a stored hash.
///
/// A stored value that is not a bcrypt hash is an internal error, not a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let (password, hash) = (password.to_string(), hash.to_string());

    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

/// Hash checked in place of a stored one when the account does not exist.
///
/// A login for an unknown identity still pays for one bcrypt verification at the
/// configured cost, so response times do not reveal which accounts exist.
#[derive(Debug, Clone)]
pub struct DecoyHash(String);

impl DecoyHash {
    /// Hashes a random password at `cost`.
    pub async fn new(cost: u32) -> Result<Self, AppError> {
        hash_password(&uuid::Uuid::new_v4().to_string(), cost)
            .await
            .map(Self)
    }
}

/// Checks `password` against an account's stored hash.
///
/// Without an account the password is checked against `decoy` instead and the
/// result is always `false`.
pub async fn verify_account_password(
    password: &str,
    stored: Option<&str>,
    decoy: &DecoyHash,
) -> Result<bool, AppError> {
    match stored {
        Some(hash) => verify_password(password, hash).await,
        None => verify_password(password, &decoy.0)
            .await
            .map(|_| false),
    }
}
