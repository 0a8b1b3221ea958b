/// Token endpoints
///
/// # Endpoints
///
/// - `POST /api/token/` - Exchange username and password for a token pair
/// - `POST /api/token/refresh/` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use softdesk_shared::auth::jwt::{self, JwtError, TokenPair};
use softdesk_shared::error::ServiceError;
use softdesk_shared::service::identity;
use tracing::info;

/// Token request
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// New access token
    pub access: String,
}

/// Token acquisition endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/token/
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "correct horse battery"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "access": "eyJ...",
///   "refresh": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown user, wrong password or deleted account
pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(req) = payload?;

    let user = identity::authenticate(state.store.as_ref(), &req.username, &req.password)
        .await
        .map_err(|e| match e {
            ServiceError::Unauthenticated => {
                ApiError::Unauthorized("No active account found with the given credentials".to_string())
            }
            other => other.into(),
        })?;

    let pair = jwt::issue_token_pair(user.id, state.jwt_secret(), &state.token_lifetimes())?;

    info!(user_id = %user.id, "Token pair issued");
    Ok(Json(pair))
}

/// Token refresh endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/token/refresh/
/// Content-Type: application/json
///
/// {
///   "refresh": "eyJ..."
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or access-type token, or the
///   account was deleted since the token was issued
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;

    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret()).map_err(|e| match e {
        JwtError::WrongType { .. } => ApiError::Unauthorized("Token is not a refresh token".to_string()),
        other => other.into(),
    })?;

    let actor = identity::resolve_actor(state.store.as_ref(), claims.sub).await?;
    let access = jwt::issue_access_token(actor.user_id, state.jwt_secret(), &state.token_lifetimes())?;

    Ok(Json(RefreshResponse { access }))
}
