use axum::http::{HeaderMap, header::AUTHORIZATION};

use crate::{
    error::{AppError, auth::AuthError},
    service::auth::token::{Claims, Role, TokenService},
    state::AppState,
};

/// Checks the bearer token of one request.
///
/// Handlers build a guard from the shared state and the request headers and call
/// [`AuthGuard::require`] before doing any work:
///
/// ```ignore
/// let claims = AuthGuard::new(&state, &headers).require(Role::Admin)?;
/// ```
pub struct AuthGuard<'a> {
    tokens: &'a TokenService,
    headers: &'a HeaderMap,
}

impl<'a> AuthGuard<'a> {
    pub fn new(state: &'a AppState, headers: &'a HeaderMap) -> Self {
        Self {
            tokens: &state.tokens,
            headers,
        }
    }

    /// Verifies the token and that it was issued for `role`.
    ///
    /// # Returns
    /// - `Ok(Claims)` - The verified claims
    /// - `Err(AuthError::MissingHeader)` - No `Authorization` header
    /// - `Err(AuthError::InvalidFormat)` - Header is not `Bearer <token>`
    /// - `Err(AuthError::InvalidToken | TokenExpired)` - Token does not verify
    /// - `Err(AuthError::WrongRole)` - Token belongs to the other identity domain
    pub fn require(&self, role: Role) -> Result<Claims, AppError> {
        let header = self
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidFormat)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::InvalidFormat)?;

        let claims = self.tokens.verify(token)?;

        if claims.role != role {
            return Err(AuthError::WrongRole.into());
        }

        Ok(claims)
    }
}
