/// Resource Hierarchy Store operations
///
/// Projects own issues, issues own comments. Every nested lookup goes through
/// its parent: an issue is only found under its own project and a comment
/// only under its own issue, so a mismatched path is `NotFound` rather than
/// being silently corrected.
///
/// Authors are always the actor. Inputs carry no author field, and unknown
/// JSON fields are ignored on deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{authorize, membership, project_ancestry};
use crate::auth::authorization::{authenticated, AccessRequest, Ancestry, Operation, ResourceClass};
use crate::auth::middleware::AuthContext;
use crate::error::ServiceError;
use crate::models::comment::{Comment, CreateComment, UpdateComment};
use crate::models::contributor::{Contributor, CreateContributor};
use crate::models::issue::{CreateIssue, Issue, IssuePriority, IssueStatus, IssueTag, UpdateIssue};
use crate::models::project::{CreateProject, Project, ProjectType, UpdateProject};
use crate::store::{Store, UnitOfWork};

/// Deserializes a field that distinguishes "absent" from `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a
/// missing field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewProject {
    #[serde(alias = "name")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters."))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, alias = "type")]
    pub project_type: Option<ProjectType>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProjectChanges {
    #[serde(alias = "name")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters."))]
    pub title: Option<String>,

    pub description: Option<String>,

    #[serde(alias = "type")]
    pub project_type: Option<ProjectType>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewIssue {
    #[serde(alias = "name")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters."))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub tag: Option<IssueTag>,

    #[serde(alias = "assignee")]
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct IssueChanges {
    #[serde(alias = "name")]
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters."))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub tag: Option<IssueTag>,

    /// `null` unassigns
    #[serde(default, alias = "assignee", deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewComment {
    #[serde(alias = "description")]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentChanges {
    #[serde(alias = "description")]
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub body: Option<String>,
}

/// Project with its contributors and issues
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub contributors: Vec<Contributor>,
    pub issues: Vec<Issue>,
}

/// Issue with its comments
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub comments: Vec<Comment>,
}

fn on_project(operation: Operation, project: &Project, ancestry: Ancestry) -> AccessRequest {
    AccessRequest::new(operation, ResourceClass::Project)
        .with_owner(project.author_id)
        .with_ancestry(ancestry)
}

fn on_issue(operation: Operation, issue: &Issue, ancestry: Ancestry) -> AccessRequest {
    AccessRequest::new(operation, ResourceClass::Issue)
        .with_owner(issue.author_id)
        .with_ancestry(ancestry)
}

fn on_comment(operation: Operation, comment: &Comment, ancestry: Ancestry) -> AccessRequest {
    AccessRequest::new(operation, ResourceClass::Comment)
        .with_owner(comment.author_id)
        .with_ancestry(ancestry)
}

/// Resolves project then issue, re-validating the path
async fn issue_ancestry(
    uow: &mut dyn UnitOfWork,
    actor: &AuthContext,
    project_id: Uuid,
    issue_id: Uuid,
) -> Result<(Issue, Ancestry), ServiceError> {
    let (_, ancestry) = project_ancestry(uow, actor, project_id).await?;
    let issue = uow
        .find_issue_in_project(project_id, issue_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    Ok((issue, ancestry))
}

/// Resolves project, issue, then comment
async fn comment_ancestry(
    uow: &mut dyn UnitOfWork,
    actor: &AuthContext,
    project_id: Uuid,
    issue_id: Uuid,
    comment_id: Uuid,
) -> Result<(Comment, Ancestry), ServiceError> {
    let (_, ancestry) = issue_ancestry(uow, actor, project_id, issue_id).await?;
    let comment = uow
        .find_comment_in_issue(issue_id, comment_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    Ok((comment, ancestry))
}

/// The assignee must contribute to the issue's project
async fn check_assignee(
    uow: &mut dyn UnitOfWork,
    project_id: Uuid,
    assignee_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(assignee_id) = assignee_id {
        if !uow.is_contributor(project_id, assignee_id).await? {
            return Err(ServiceError::invalid(
                "assignee_id",
                "The assignee must be a contributor of the project.",
            ));
        }
    }

    Ok(())
}

// Projects

/// Lists every project, unfiltered
pub async fn list_projects(store: &dyn Store, actor: Option<&AuthContext>) -> Result<Vec<Project>, ServiceError> {
    let actor = authenticated(actor)?;
    authorize(actor, AccessRequest::new(Operation::List, ResourceClass::Project))?;

    let mut uow = store.begin().await?;
    Ok(uow.list_projects().await?)
}

/// Creates a project and enrolls its author in the same unit of work
///
/// No reader ever sees the project without its author-contributor row.
pub async fn create_project(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    input: NewProject,
) -> Result<Project, ServiceError> {
    let actor = authenticated(actor)?;
    authorize(actor, AccessRequest::new(Operation::Create, ResourceClass::Project))?;
    input.validate()?;

    let mut uow = store.begin().await?;
    let project = uow
        .insert_project(CreateProject {
            title: input.title,
            description: input.description,
            project_type: input.project_type,
            author_id: actor.user_id,
        })
        .await?;
    uow.insert_contributor(CreateContributor {
        project_id: project.id,
        user_id: actor.user_id,
    })
    .await?;
    uow.commit().await?;

    info!(project_id = %project.id, author_id = %actor.user_id, "Project created");
    Ok(project)
}

/// Retrieves a project with its contributors and issues
pub async fn get_project(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
) -> Result<ProjectDetail, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (project, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(actor, on_project(Operation::Retrieve, &project, ancestry))?;

    let contributors = membership::contributors_of(uow.as_mut(), project_id).await?;
    let issues = uow.list_issues(project_id).await?;

    Ok(ProjectDetail {
        project,
        contributors,
        issues,
    })
}

pub async fn update_project(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    input: ProjectChanges,
) -> Result<Project, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (project, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(actor, on_project(Operation::Update, &project, ancestry))?;
    input.validate()?;

    let project = uow
        .update_project(
            project_id,
            UpdateProject {
                title: input.title,
                description: input.description,
                project_type: input.project_type,
            },
        )
        .await?
        .ok_or(ServiceError::NotFound)?;
    uow.commit().await?;

    Ok(project)
}

/// Deletes a project with all its issues, comments and contributor rows
pub async fn delete_project(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
) -> Result<(), ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (project, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(actor, on_project(Operation::Delete, &project, ancestry))?;

    uow.delete_project(project_id).await?;
    uow.commit().await?;

    info!(project_id = %project_id, "Project deleted");
    Ok(())
}

// Issues

pub async fn list_issues(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
) -> Result<Vec<Issue>, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (_, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(
        actor,
        AccessRequest::new(Operation::List, ResourceClass::Issue).with_ancestry(ancestry),
    )?;

    Ok(uow.list_issues(project_id).await?)
}

/// Creates an issue authored by the actor
///
/// # Errors
///
/// - `ServiceError::NotFound` if the project is missing or hidden
/// - `ServiceError::Validation` if the title is invalid or the assignee does
///   not contribute to the project
pub async fn create_issue(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    input: NewIssue,
) -> Result<Issue, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (_, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(
        actor,
        AccessRequest::new(Operation::Create, ResourceClass::Issue).with_ancestry(ancestry),
    )?;
    input.validate()?;
    check_assignee(uow.as_mut(), project_id, input.assignee_id).await?;

    let issue = uow
        .insert_issue(CreateIssue {
            project_id,
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or_default(),
            priority: input.priority,
            tag: input.tag,
            author_id: actor.user_id,
            assignee_id: input.assignee_id,
        })
        .await?;
    uow.commit().await?;

    info!(issue_id = %issue.id, project_id = %project_id, "Issue created");
    Ok(issue)
}

/// Retrieves an issue with its comments
pub async fn get_issue(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
) -> Result<IssueDetail, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (issue, ancestry) = issue_ancestry(uow.as_mut(), actor, project_id, issue_id).await?;
    authorize(actor, on_issue(Operation::Retrieve, &issue, ancestry))?;

    let comments = uow.list_comments(issue_id).await?;

    Ok(IssueDetail { issue, comments })
}

pub async fn update_issue(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
    input: IssueChanges,
) -> Result<Issue, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (issue, ancestry) = issue_ancestry(uow.as_mut(), actor, project_id, issue_id).await?;
    authorize(actor, on_issue(Operation::Update, &issue, ancestry))?;
    input.validate()?;
    check_assignee(uow.as_mut(), project_id, input.assignee_id.flatten()).await?;

    let issue = uow
        .update_issue(
            issue_id,
            UpdateIssue {
                title: input.title,
                description: input.description,
                status: input.status,
                priority: input.priority,
                tag: input.tag,
                assignee_id: input.assignee_id,
            },
        )
        .await?
        .ok_or(ServiceError::NotFound)?;
    uow.commit().await?;

    Ok(issue)
}

/// Deletes an issue and its comments
pub async fn delete_issue(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
) -> Result<(), ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (issue, ancestry) = issue_ancestry(uow.as_mut(), actor, project_id, issue_id).await?;
    authorize(actor, on_issue(Operation::Delete, &issue, ancestry))?;

    uow.delete_issue(issue_id).await?;
    uow.commit().await?;

    info!(issue_id = %issue_id, "Issue deleted");
    Ok(())
}

// Comments

pub async fn list_comments(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
) -> Result<Vec<Comment>, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (_, ancestry) = issue_ancestry(uow.as_mut(), actor, project_id, issue_id).await?;
    authorize(
        actor,
        AccessRequest::new(Operation::List, ResourceClass::Comment).with_ancestry(ancestry),
    )?;

    Ok(uow.list_comments(issue_id).await?)
}

pub async fn create_comment(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
    input: NewComment,
) -> Result<Comment, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (_, ancestry) = issue_ancestry(uow.as_mut(), actor, project_id, issue_id).await?;
    authorize(
        actor,
        AccessRequest::new(Operation::Create, ResourceClass::Comment).with_ancestry(ancestry),
    )?;
    input.validate()?;

    let comment = uow
        .insert_comment(CreateComment {
            issue_id,
            body: input.body,
            author_id: actor.user_id,
        })
        .await?;
    uow.commit().await?;

    Ok(comment)
}

pub async fn get_comment(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
    comment_id: Uuid,
) -> Result<Comment, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (comment, ancestry) = comment_ancestry(uow.as_mut(), actor, project_id, issue_id, comment_id).await?;
    authorize(actor, on_comment(Operation::Retrieve, &comment, ancestry))?;

    Ok(comment)
}

pub async fn update_comment(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
    comment_id: Uuid,
    input: CommentChanges,
) -> Result<Comment, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (comment, ancestry) = comment_ancestry(uow.as_mut(), actor, project_id, issue_id, comment_id).await?;
    authorize(actor, on_comment(Operation::Update, &comment, ancestry))?;
    input.validate()?;

    let comment = uow
        .update_comment(comment_id, UpdateComment { body: input.body })
        .await?
        .ok_or(ServiceError::NotFound)?;
    uow.commit().await?;

    Ok(comment)
}

pub async fn delete_comment(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    issue_id: Uuid,
    comment_id: Uuid,
) -> Result<(), ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (comment, ancestry) = comment_ancestry(uow.as_mut(), actor, project_id, issue_id, comment_id).await?;
    authorize(actor, on_comment(Operation::Delete, &comment, ancestry))?;

    uow.delete_comment(comment_id).await?;
    uow.commit().await?;

    Ok(())
}
