/// Project endpoints
///
/// Any authenticated user can list and create projects. Detail, issues and
/// comments are visible to contributors only; everyone else gets 404.
/// Updates and deletes are reserved to the author.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::models::project::Project;
use softdesk_shared::service::hierarchy::{self, NewProject, ProjectChanges, ProjectDetail};
use uuid::Uuid;

use super::{actor, authenticated_body, Ids};
use crate::{app::AppState, error::ApiResult};

pub async fn list_projects(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Json<Vec<Project>>> {
    let projects = hierarchy::list_projects(state.store.as_ref(), actor(&auth)).await?;
    Ok(Json(projects))
}

/// Creates a project authored by the caller, who becomes its first contributor
///
/// Any `author` field in the body is ignored.
pub async fn create_project(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let input = authenticated_body(&auth, payload)?;
    let project = hierarchy::create_project(state.store.as_ref(), actor(&auth), input).await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(project_id): Ids<Uuid>,
) -> ApiResult<Json<ProjectDetail>> {
    let detail = hierarchy::get_project(state.store.as_ref(), actor(&auth), project_id).await?;
    Ok(Json(detail))
}

pub async fn update_project(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(project_id): Ids<Uuid>,
    payload: Result<Json<ProjectChanges>, JsonRejection>,
) -> ApiResult<Json<Project>> {
    let input = authenticated_body(&auth, payload)?;
    let project = hierarchy::update_project(state.store.as_ref(), actor(&auth), project_id, input).await?;

    Ok(Json(project))
}

/// Deletes the project with its issues, comments and contributor rows
pub async fn delete_project(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(project_id): Ids<Uuid>,
) -> ApiResult<StatusCode> {
    hierarchy::delete_project(state.store.as_ref(), actor(&auth), project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
