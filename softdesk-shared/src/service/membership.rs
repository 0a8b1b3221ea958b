/// Membership Registry
///
/// A contributor row is the only thing that grants read and create access to
/// a project's subtree. Users enroll themselves; nobody can enroll someone
/// else. The project author is enrolled when the project is created and can
/// never leave, so the author is a contributor for the project's whole life.

use tracing::info;
use uuid::Uuid;

use super::{authorize, project_ancestry};
use crate::auth::authorization::{authenticated, AccessRequest, Operation, ResourceClass};
use crate::auth::middleware::AuthContext;
use crate::error::ServiceError;
use crate::models::contributor::{Contributor, CreateContributor};
use crate::models::project::Project;
use crate::store::{Store, UnitOfWork};

/// Whether `user_id` contributes to `project_id`
pub async fn is_contributor(store: &dyn Store, user_id: Uuid, project_id: Uuid) -> Result<bool, ServiceError> {
    let mut uow = store.begin().await?;
    Ok(uow.is_contributor(project_id, user_id).await?)
}

/// Enrolls a user as contributor of a project
///
/// `user_id` defaults to the actor. Naming anyone else is `Forbidden`.
///
/// # Errors
///
/// - `ServiceError::Forbidden` if `user_id` is not the actor
/// - `ServiceError::NotFound` if the project does not exist
/// - `ServiceError::Conflict` if the actor already contributes
pub async fn add_self(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
    user_id: Option<Uuid>,
) -> Result<Contributor, ServiceError> {
    let actor = authenticated(actor)?;
    let enrollee = user_id.unwrap_or(actor.user_id);
    authorize(
        actor,
        AccessRequest::new(Operation::AddSelf, ResourceClass::Contributor).with_owner(enrollee),
    )?;

    let mut uow = store.begin().await?;
    if uow.find_project(project_id).await?.is_none() {
        return Err(ServiceError::NotFound);
    }

    let contributor = uow
        .insert_contributor(CreateContributor {
            project_id,
            user_id: enrollee,
        })
        .await?;
    uow.commit().await?;

    info!(project_id = %project_id, user_id = %enrollee, "Contributor added");
    Ok(contributor)
}

/// Removes the actor's own contributor row
///
/// # Errors
///
/// - `ServiceError::NotFound` if the project is missing or the actor does not
///   contribute to it
/// - `ServiceError::Forbidden` if the actor authored the project
pub async fn leave(store: &dyn Store, actor: Option<&AuthContext>, project_id: Uuid) -> Result<(), ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (_, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(
        actor,
        AccessRequest::new(Operation::Leave, ResourceClass::Contributor)
            .with_owner(actor.user_id)
            .with_ancestry(ancestry),
    )?;

    uow.delete_contributor(project_id, actor.user_id).await?;
    uow.commit().await?;

    info!(project_id = %project_id, user_id = %actor.user_id, "Contributor left project");
    Ok(())
}

/// Projects the actor contributes to, oldest membership first
pub async fn list_for_user(store: &dyn Store, actor: Option<&AuthContext>) -> Result<Vec<Project>, ServiceError> {
    let actor = authenticated(actor)?;
    authorize(actor, AccessRequest::new(Operation::List, ResourceClass::Contributor))?;

    let mut uow = store.begin().await?;
    Ok(uow.list_projects_for_contributor(actor.user_id).await?)
}

/// Contributor rows of a project; visible to its contributors only
pub async fn list_for_project(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    project_id: Uuid,
) -> Result<Vec<Contributor>, ServiceError> {
    let actor = authenticated(actor)?;

    let mut uow = store.begin().await?;
    let (project, ancestry) = project_ancestry(uow.as_mut(), actor, project_id).await?;
    authorize(
        actor,
        AccessRequest::new(Operation::Retrieve, ResourceClass::Project)
            .with_owner(project.author_id)
            .with_ancestry(ancestry),
    )?;

    contributors_of(uow.as_mut(), project_id).await
}

/// Contributor rows of a project, oldest first
///
/// Callers must already have authorized the actor for the project.
pub(crate) async fn contributors_of(
    uow: &mut dyn UnitOfWork,
    project_id: Uuid,
) -> Result<Vec<Contributor>, ServiceError> {
    Ok(uow.list_contributors(project_id).await?)
}
