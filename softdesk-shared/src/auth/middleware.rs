/// Bearer credential resolution
///
/// Turns an `Authorization: Bearer <jwt>` header into an optional
/// [`AuthContext`]:
///
/// - no header: `Ok(None)`, an anonymous request; the Authorization Engine
///   decides whether the operation needs an actor
/// - a valid access token whose subject is still active: `Ok(Some(ctx))`
/// - anything else: an [`AuthError`]
///
/// # Request Extensions
///
/// The HTTP layer inserts the resolved `AuthContext` into request extensions,
/// and handlers extract it with `Option<Extension<AuthContext>>`.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use softdesk_shared::auth::middleware::resolve_bearer;
/// use softdesk_shared::store::memory::MemoryStore;
///
/// # async fn example(headers: HeaderMap) {
/// let store = MemoryStore::new();
/// match resolve_bearer(&store, &headers, "jwt-secret").await {
///     Ok(Some(ctx)) => println!("user {}", ctx.user_id),
///     Ok(None) => println!("anonymous"),
///     Err(e) => println!("rejected: {}", e),
/// }
/// # }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::error::ServiceError;
use crate::service::identity;
use crate::store::Store;

/// The authenticated actor of a request
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use softdesk_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for bearer resolution
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Header present but not `Bearer <token>`
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Bad signature, wrong issuer, wrong type, expired
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token subject no longer exists or was deactivated
    #[error("User is inactive")]
    InactiveUser,

    /// Identity Store could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Extracts the bearer token, if an Authorization header is present
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| AuthError::InvalidFormat)?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)?;

    Ok(Some(token))
}

/// Resolves the request's actor from its headers
///
/// # Errors
///
/// - `AuthError::InvalidFormat` / `AuthError::InvalidToken` for bad credentials
/// - `AuthError::InactiveUser` if the subject was soft-deleted
/// - `AuthError::Unavailable` if the store failed
pub async fn resolve_bearer(
    store: &dyn Store,
    headers: &HeaderMap,
    secret: &str,
) -> Result<Option<AuthContext>, AuthError> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(None);
    };

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        other => AuthError::InvalidToken(other.to_string()),
    })?;

    match identity::resolve_actor(store, claims.sub).await {
        Ok(ctx) => Ok(Some(ctx)),
        Err(ServiceError::Unavailable(msg)) => Err(AuthError::Unavailable(msg)),
        Err(_) => Err(AuthError::InactiveUser),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_absent() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn test_bearer_token_present() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat)));
    }
}
