/// Persistence behind a transactional seam
///
/// Every service operation opens one [`UnitOfWork`], gathers the facts the
/// Authorization Engine needs, applies its effect and commits. Dropping a unit
/// of work without committing rolls it back, so an early `?` return leaves no
/// trace.
///
/// Two backends implement the traits:
///
/// - [`postgres::PgStore`]: sqlx transactions on PostgreSQL
/// - [`memory::MemoryStore`]: whole-state copy-on-write behind a mutex, for
///   development and tests
///
/// # Example
///
/// ```
/// use softdesk_shared::store::{memory::MemoryStore, Store};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), softdesk_shared::store::StoreError> {
/// let store = MemoryStore::new();
///
/// let mut uow = store.begin().await?;
/// assert!(uow.find_user(Uuid::new_v4()).await?.is_none());
/// uow.commit().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::comment::{Comment, CreateComment, UpdateComment};
use crate::models::contributor::{Contributor, CreateContributor};
use crate::models::issue::{CreateIssue, Issue, UpdateIssue};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::user::{CreateUser, UpdateUser, User};

pub mod memory;
pub mod postgres;

/// Storage failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (constraint name)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A referenced row does not exist (constraint name)
    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    /// Connection, timeout or any other storage fault
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return StoreError::UniqueViolation(constraint);
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation(constraint);
            }
        }

        StoreError::Unavailable(err.to_string())
    }
}

/// Entry point to a storage backend
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    /// Checks the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// One transaction's worth of reads and writes
///
/// Lookups return `Ok(None)` for a missing row; the service layer decides
/// which error that becomes.
#[async_trait]
pub trait UnitOfWork: Send {
    // Identity Store

    async fn insert_user(&mut self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError>;

    async fn update_user(&mut self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError>;

    // Membership Registry

    async fn insert_contributor(&mut self, data: CreateContributor) -> Result<Contributor, StoreError>;

    /// The membership predicate. Holds the row stable until commit.
    async fn is_contributor(&mut self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    async fn delete_contributor(&mut self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    async fn list_contributors(&mut self, project_id: Uuid) -> Result<Vec<Contributor>, StoreError>;

    // Resource Hierarchy Store

    async fn insert_project(&mut self, data: CreateProject) -> Result<Project, StoreError>;

    async fn find_project(&mut self, id: Uuid) -> Result<Option<Project>, StoreError>;

    async fn list_projects(&mut self) -> Result<Vec<Project>, StoreError>;

    async fn list_projects_for_contributor(&mut self, user_id: Uuid) -> Result<Vec<Project>, StoreError>;

    async fn update_project(&mut self, id: Uuid, data: UpdateProject) -> Result<Option<Project>, StoreError>;

    /// Removes comments, issues, contributor rows and the project, in that order
    async fn delete_project(&mut self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_issue(&mut self, data: CreateIssue) -> Result<Issue, StoreError>;

    /// Finds an issue only under the given project
    async fn find_issue_in_project(&mut self, project_id: Uuid, id: Uuid) -> Result<Option<Issue>, StoreError>;

    async fn list_issues(&mut self, project_id: Uuid) -> Result<Vec<Issue>, StoreError>;

    async fn update_issue(&mut self, id: Uuid, data: UpdateIssue) -> Result<Option<Issue>, StoreError>;

    /// Removes the issue and its comments
    async fn delete_issue(&mut self, id: Uuid) -> Result<bool, StoreError>;

    async fn insert_comment(&mut self, data: CreateComment) -> Result<Comment, StoreError>;

    /// Finds a comment only under the given issue
    async fn find_comment_in_issue(&mut self, issue_id: Uuid, id: Uuid) -> Result<Option<Comment>, StoreError>;

    async fn list_comments(&mut self, issue_id: Uuid) -> Result<Vec<Comment>, StoreError>;

    async fn update_comment(&mut self, id: Uuid, data: UpdateComment) -> Result<Option<Comment>, StoreError>;

    async fn delete_comment(&mut self, id: Uuid) -> Result<bool, StoreError>;

    /// Makes every write of this unit visible at once
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
