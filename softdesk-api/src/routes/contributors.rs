/// Membership endpoints
///
/// # Endpoints
///
/// - `GET /api/contributor/` - Projects the caller contributes to
/// - `POST /api/contributor/` - Join a project (`{"project_id": ...}`)
/// - `DELETE /api/contributor/:project_id/` - Leave a project
///
/// Only the caller can be enrolled. A body naming another `user_id` is
/// rejected with 403.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::models::contributor::Contributor;
use softdesk_shared::models::project::Project;
use softdesk_shared::service::membership;
use uuid::Uuid;

use super::{actor, authenticated_body, Ids};
use crate::{app::AppState, error::ApiResult};

/// Join request
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    #[serde(alias = "project")]
    pub project_id: Uuid,

    /// Defaults to the caller
    #[serde(default, alias = "user")]
    pub user_id: Option<Uuid>,
}

pub async fn my_projects(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = membership::list_for_user(state.store.as_ref(), actor(&auth)).await?;
    Ok(Json(projects))
}

/// # Errors
///
/// - `403 Forbidden`: `user_id` names someone else
/// - `404 Not Found`: No such project
/// - `409 Conflict`: Already a contributor
pub async fn join_project(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Contributor>)> {
    let req = authenticated_body(&auth, payload)?;
    let contributor = membership::add_self(state.store.as_ref(), actor(&auth), req.project_id, req.user_id).await?;

    Ok((StatusCode::CREATED, Json(contributor)))
}

/// The project author cannot leave (403)
pub async fn leave_project(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(project_id): Ids<Uuid>,
) -> ApiResult<StatusCode> {
    membership::leave(state.store.as_ref(), actor(&auth), project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
