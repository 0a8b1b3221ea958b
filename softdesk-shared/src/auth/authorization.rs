/// Authorization Engine
///
/// One pure decision function, [`decide`], evaluated before any data is read
/// or written. It consumes facts the caller has already gathered inside its
/// unit of work:
///
/// - **Resource facts**: who owns the target (author of a project, issue or
///   comment; the user itself for user records; the enrollee for a
///   contributor row)
/// - **Ancestry facts**: which project the target lives under, whether the
///   actor contributes to it, and who authored it
///
/// Denying is a normal outcome, not an error path: the result is a
/// [`Decision`]. Reasons are coarse on purpose. Wherever a `Forbidden` would
/// reveal that a contributors-only resource exists, the engine answers
/// `NotFound` instead.
///
/// # Rules
///
/// Evaluated in priority order:
///
/// 1. Registration and token acquisition are open; everything else needs an
///    authenticated actor.
/// 2. Listing projects is open to any actor.
/// 3. Creating a project is open to any actor.
/// 4. Retrieving or listing anything under a project requires membership,
///    otherwise `NotFound`.
/// 5. Creating an issue or comment requires membership, otherwise `NotFound`.
/// 6. Updating or deleting a project, issue or comment requires membership
///    (`NotFound`) and authorship (`Forbidden`).
/// 7. Enrolling as contributor is limited to the actor themselves
///    (`Forbidden`). Leaving requires membership (`NotFound`) and is refused to
///    the project author (`Forbidden`).
/// 8. User records are visible only to their owner, otherwise `NotFound`.
///
/// # Example
///
/// ```
/// use softdesk_shared::auth::authorization::{decide, AccessRequest, Ancestry, Decision, DenyReason, Operation, ResourceClass};
/// use softdesk_shared::auth::middleware::AuthContext;
/// use uuid::Uuid;
///
/// let author = Uuid::new_v4();
/// let stranger = AuthContext::new(Uuid::new_v4());
///
/// let request = AccessRequest::new(Operation::Retrieve, ResourceClass::Project)
///     .with_owner(author)
///     .with_ancestry(Ancestry {
///         project_id: Uuid::new_v4(),
///         is_contributor: false,
///         project_author_id: author,
///     });
///
/// assert_eq!(decide(Some(&stranger), &request), Decision::Deny(DenyReason::NotFound));
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;

/// What the actor wants to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    AcquireToken,
    List,
    Retrieve,
    Create,
    Update,
    Delete,
    /// Enroll as contributor of a project
    AddSelf,
    /// Withdraw one's own contributor row
    Leave,
}

/// Kind of resource the operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    User,
    Project,
    Issue,
    Comment,
    Contributor,
}

impl ResourceClass {
    /// Project, issue and comment live in the contributor-gated tree
    pub fn in_hierarchy(&self) -> bool {
        matches!(
            self,
            ResourceClass::Project | ResourceClass::Issue | ResourceClass::Comment
        )
    }
}

/// Coarse reason for a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    Forbidden,
    NotFound,
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turns a denial into an `Err` for use with `?`
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Project-level context of the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ancestry {
    /// Project the target belongs to (the target itself for projects)
    pub project_id: Uuid,

    /// Whether the actor holds a contributor row for `project_id`
    pub is_contributor: bool,

    /// Author of `project_id`
    pub project_author_id: Uuid,
}

/// Everything [`decide`] looks at besides the actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest {
    pub operation: Operation,
    pub class: ResourceClass,

    /// Owner of the target: the author for hierarchy resources, the user
    /// itself for users, the enrollee for contributor rows
    pub owner_id: Option<Uuid>,

    pub ancestry: Option<Ancestry>,
}

impl AccessRequest {
    pub fn new(operation: Operation, class: ResourceClass) -> Self {
        Self {
            operation,
            class,
            owner_id: None,
            ancestry: None,
        }
    }

    pub fn with_owner(mut self, owner_id: Uuid) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn with_ancestry(mut self, ancestry: Ancestry) -> Self {
        self.ancestry = Some(ancestry);
        self
    }
}

/// Decides whether `actor` may perform `request`
///
/// Pure: no I/O, no clock, no logging. Missing facts deny; a hierarchy check
/// without ancestry is answered `NotFound`.
pub fn decide(actor: Option<&AuthContext>, request: &AccessRequest) -> Decision {
    use Operation::*;
    use ResourceClass::*;

    if matches!(request.operation, Register | AcquireToken) {
        return Decision::Allow;
    }

    let actor = match actor {
        Some(actor) => actor,
        None => return Decision::Deny(DenyReason::Unauthenticated),
    };

    let is_owner = request.owner_id == Some(actor.user_id);
    let is_contributor = request.ancestry.map(|a| a.is_contributor).unwrap_or(false);

    match (request.operation, request.class) {
        (List, Project) | (Create, Project) => Decision::Allow,

        (Retrieve, class) | (List, class) if class.in_hierarchy() => member_only(is_contributor),

        (Create, Issue) | (Create, Comment) => member_only(is_contributor),

        (Update, class) | (Delete, class) if class.in_hierarchy() => {
            if !is_contributor {
                Decision::Deny(DenyReason::NotFound)
            } else if !is_owner {
                Decision::Deny(DenyReason::Forbidden)
            } else {
                Decision::Allow
            }
        }

        (AddSelf, Contributor) => {
            if is_owner {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::Forbidden)
            }
        }

        // The actor's own memberships
        (List, Contributor) => Decision::Allow,

        (Leave, Contributor) => match request.ancestry {
            Some(ancestry) if ancestry.is_contributor => {
                if ancestry.project_author_id == actor.user_id {
                    Decision::Deny(DenyReason::Forbidden)
                } else {
                    Decision::Allow
                }
            }
            _ => Decision::Deny(DenyReason::NotFound),
        },

        // Scoped to the actor by the caller
        (List, User) => Decision::Allow,

        (Retrieve, User) | (Update, User) | (Delete, User) => {
            if is_owner {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotFound)
            }
        }

        _ => Decision::Deny(DenyReason::Forbidden),
    }
}

fn member_only(is_contributor: bool) -> Decision {
    if is_contributor {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotFound)
    }
}

/// Rule 1 on its own: the actor, or `Unauthenticated`
///
/// Services call this before touching the store so anonymous callers learn
/// nothing about what exists.
pub fn authenticated(actor: Option<&AuthContext>) -> Result<&AuthContext, DenyReason> {
    actor.ok_or(DenyReason::Unauthenticated)
}
