/// Domain services
///
/// Each operation takes the store and the (optional) actor, and runs its
/// authorization check and its effect inside a single unit of work. A
/// membership revoked concurrently therefore cannot slip between the check
/// and the write it gates.
///
/// - [`identity`]: Identity Store lifecycle (register, self-service, soft delete)
/// - [`membership`]: Membership Registry (add self, leave, listings)
/// - [`hierarchy`]: Project / Issue / Comment CRUD

use tracing::debug;
use uuid::Uuid;

use crate::auth::authorization::{decide, AccessRequest, Ancestry};
use crate::auth::middleware::AuthContext;
use crate::error::ServiceError;
use crate::models::project::Project;
use crate::store::UnitOfWork;

pub mod hierarchy;
pub mod identity;
pub mod membership;

/// Runs the Authorization Engine and converts a denial into an error
pub(crate) fn authorize(actor: &AuthContext, request: AccessRequest) -> Result<(), ServiceError> {
    let decision = decide(Some(actor), &request);

    debug!(
        user_id = %actor.user_id,
        operation = ?request.operation,
        class = ?request.class,
        ?decision,
        "Authorization decision"
    );

    decision.into_result().map_err(ServiceError::from)
}

/// Loads a project and the actor's standing in it
///
/// A missing project is `NotFound`, exactly like a hidden one.
pub(crate) async fn project_ancestry(
    uow: &mut dyn UnitOfWork,
    actor: &AuthContext,
    project_id: Uuid,
) -> Result<(Project, Ancestry), ServiceError> {
    let project = uow.find_project(project_id).await?.ok_or(ServiceError::NotFound)?;
    let is_contributor = uow.is_contributor(project_id, actor.user_id).await?;

    let ancestry = Ancestry {
        project_id,
        is_contributor,
        project_author_id: project.author_id,
    };

    Ok((project, ancestry))
}
