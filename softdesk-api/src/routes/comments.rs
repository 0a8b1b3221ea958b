/// Comment endpoints, nested under an issue under a project
///
/// The full path is re-validated on every request: a comment is only found
/// under its own issue, and that issue only under its own project.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use softdesk_shared::auth::middleware::AuthContext;
use softdesk_shared::models::comment::Comment;
use softdesk_shared::service::hierarchy::{self, CommentChanges, NewComment};
use uuid::Uuid;

use super::{actor, authenticated_body, Ids};
use crate::{app::AppState, error::ApiResult};

pub async fn list_comments(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id)): Ids<(Uuid, Uuid)>,
) -> ApiResult<Json<Vec<Comment>>> {
    let comments = hierarchy::list_comments(state.store.as_ref(), actor(&auth), project_id, issue_id).await?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id)): Ids<(Uuid, Uuid)>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let input = authenticated_body(&auth, payload)?;
    let comment = hierarchy::create_comment(state.store.as_ref(), actor(&auth), project_id, issue_id, input).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id, comment_id)): Ids<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<Comment>> {
    let comment =
        hierarchy::get_comment(state.store.as_ref(), actor(&auth), project_id, issue_id, comment_id).await?;
    Ok(Json(comment))
}

pub async fn update_comment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id, comment_id)): Ids<(Uuid, Uuid, Uuid)>,
    payload: Result<Json<CommentChanges>, JsonRejection>,
) -> ApiResult<Json<Comment>> {
    let input = authenticated_body(&auth, payload)?;
    let comment = hierarchy::update_comment(
        state.store.as_ref(),
        actor(&auth),
        project_id,
        issue_id,
        comment_id,
        input,
    )
    .await?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Ids((project_id, issue_id, comment_id)): Ids<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    hierarchy::delete_comment(state.store.as_ref(), actor(&auth), project_id, issue_id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
