/// Account endpoints
///
/// Registration is open; everything else is restricted to the caller's own
/// record. Another user's id answers 404.
///
/// # Endpoints
///
/// - `POST /api/user/` - Register
/// - `GET /api/user/` - List (only the caller)
/// - `GET /api/user/:id/` - Retrieve own record
/// - `PATCH /api/user/:id/` - Partial update of own record
/// - `DELETE /api/user/:id/` - Soft delete own account

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::models::user::User;
use softdesk_shared::service::identity::{self, ProfileUpdate, Registration};
use uuid::Uuid;

use super::{actor, authenticated_body, Ids};
use crate::{app::AppState, error::ApiResult};

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /api/user/
/// Content-Type: application/json
///
/// {
///   "username": "alice",
///   "password": "correct horse battery",
///   "email": "alice@example.com",
///   "age": 30,
///   "can_be_contacted": false,
///   "can_data_be_shared": false
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid field, age below 15 or username taken
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(input) = payload?;
    let user = identity::register(state.store.as_ref(), input).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Json<Vec<User>>> {
    let users = identity::list_self(state.store.as_ref(), actor(&auth)).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(user_id): Ids<Uuid>,
) -> ApiResult<Json<User>> {
    let user = identity::retrieve(state.store.as_ref(), actor(&auth), user_id).await?;
    Ok(Json(user))
}

/// Partial update; a new password is re-hashed
pub async fn update_user(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(user_id): Ids<Uuid>,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let input = authenticated_body(&auth, payload)?;
    let user = identity::update(state.store.as_ref(), actor(&auth), user_id, input).await?;

    Ok(Json(user))
}

/// Soft delete: the account is anonymized and can no longer log in
pub async fn delete_user(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(user_id): Ids<Uuid>,
) -> ApiResult<StatusCode> {
    identity::soft_delete(state.store.as_ref(), actor(&auth), user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
