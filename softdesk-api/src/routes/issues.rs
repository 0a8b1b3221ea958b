/// Issue endpoints, nested under a project

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::models::issue::Issue;
use softdesk_shared::service::hierarchy::{self, IssueChanges, IssueDetail, NewIssue};
use uuid::Uuid;

use super::{actor, authenticated_body, Ids};
use crate::{app::AppState, error::ApiResult};

pub async fn list_issues(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(project_id): Ids<Uuid>,
) -> ApiResult<Json<Vec<Issue>>> {
    let issues = hierarchy::list_issues(state.store.as_ref(), actor(&auth), project_id).await?;
    Ok(Json(issues))
}

/// Creates an issue authored by the caller
///
/// # Errors
///
/// - `404 Not Found`: Project missing or caller not a contributor
/// - `400 Bad Request`: Assignee is not a contributor of the project
pub async fn create_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids(project_id): Ids<Uuid>,
    payload: Result<Json<NewIssue>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Issue>)> {
    let input = authenticated_body(&auth, payload)?;
    let issue = hierarchy::create_issue(state.store.as_ref(), actor(&auth), project_id, input).await?;

    Ok((StatusCode::CREATED, Json(issue)))
}

pub async fn get_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id)): Ids<(Uuid, Uuid)>,
) -> ApiResult<Json<IssueDetail>> {
    let detail = hierarchy::get_issue(state.store.as_ref(), actor(&auth), project_id, issue_id).await?;
    Ok(Json(detail))
}

pub async fn update_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id)): Ids<(Uuid, Uuid)>,
    payload: Result<Json<IssueChanges>, JsonRejection>,
) -> ApiResult<Json<Issue>> {
    let input = authenticated_body(&auth, payload)?;
    let issue = hierarchy::update_issue(state.store.as_ref(), actor(&auth), project_id, issue_id, input).await?;

    Ok(Json(issue))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id)): Ids<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    hierarchy::delete_issue(state.store.as_ref(), actor(&auth), project_id, issue_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
