/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Token acquisition and refresh
/// - `users`: Registration and self-service account endpoints
/// - `contributors`: Joining and leaving projects
/// - `projects`, `issues`, `comments`: the resource hierarchy
///
/// Handlers are thin: they pull the optional actor from request extensions,
/// call one service operation and shape the response. Authorization lives
/// in the services.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, Path},
    http::request::Parts,
    Extension, Json,
};
use serde::de::DeserializeOwned;
use softdesk_shared::auth::authorization::authenticated;
use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::error::ServiceError;

use crate::error::{ApiError, ApiResult};

pub mod auth;
pub mod comments;
pub mod contributors;
pub mod health;
pub mod issues;
pub mod projects;
pub mod users;

/// Path ids of a resource that requires an actor
///
/// Anonymous callers get 401 before the path is parsed; malformed ids are
/// 404 for everyone else.
pub struct Ids<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for Ids<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticated(parts.extensions.get::<AuthContext>()).map_err(ServiceError::from)?;

        let Path(ids) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Ids(ids))
    }
}

/// The actor resolved by the bearer layer, if any
pub(crate) fn actor(auth: &Option<Extension<AuthContext>>) -> Option<&AuthContext> {
    auth.as_ref().map(|Extension(ctx)| ctx)
}

/// Unwraps a JSON body for an operation that requires an actor
///
/// Anonymous callers get 401 before the body is looked at.
pub(crate) fn authenticated_body<T>(
    auth: &Option<Extension<AuthContext>>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<T> {
    authenticated(actor(auth)).map_err(ServiceError::from)?;
    let Json(body) = payload?;
    Ok(body)
}
