/// PostgreSQL store
///
/// A unit of work wraps one `sqlx` transaction at the default READ COMMITTED
/// level. Membership checks lock the contributor row `FOR SHARE`, so a
/// concurrent removal waits for the gated write to commit.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;
use uuid::Uuid;

use super::{Store, StoreError, UnitOfWork};
use crate::db::pool::health_check;
use crate::models::comment::{Comment, CreateComment, UpdateComment};
use crate::models::contributor::{Contributor, CreateContributor};
use crate::models::issue::{CreateIssue, Issue, UpdateIssue};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::user::{CreateUser, UpdateUser, User};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to open transaction");
            StoreError::from(e)
        })?;

        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_user(&mut self, data: CreateUser) -> Result<User, StoreError> {
        Ok(User::create(&mut *self.tx, data).await?)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&mut *self.tx, id).await?)
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_username(&mut *self.tx, username).await?)
    }

    async fn update_user(&mut self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError> {
        Ok(User::update(&mut *self.tx, id, data).await?)
    }

    async fn insert_contributor(&mut self, data: CreateContributor) -> Result<Contributor, StoreError> {
        Ok(Contributor::create(&mut *self.tx, data).await?)
    }

    async fn is_contributor(&mut self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(Contributor::exists(&mut *self.tx, project_id, user_id).await?)
    }

    async fn delete_contributor(&mut self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(Contributor::delete(&mut *self.tx, project_id, user_id).await?)
    }

    async fn list_contributors(&mut self, project_id: Uuid) -> Result<Vec<Contributor>, StoreError> {
        Ok(Contributor::list_by_project(&mut *self.tx, project_id).await?)
    }

    async fn insert_project(&mut self, data: CreateProject) -> Result<Project, StoreError> {
        Ok(Project::create(&mut *self.tx, data).await?)
    }

    async fn find_project(&mut self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_by_id(&mut *self.tx, id).await?)
    }

    async fn list_projects(&mut self) -> Result<Vec<Project>, StoreError> {
        Ok(Project::list(&mut *self.tx).await?)
    }

    async fn list_projects_for_contributor(&mut self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        Ok(Project::list_by_contributor(&mut *self.tx, user_id).await?)
    }

    async fn update_project(&mut self, id: Uuid, data: UpdateProject) -> Result<Option<Project>, StoreError> {
        Ok(Project::update(&mut *self.tx, id, data).await?)
    }

    async fn delete_project(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Project::delete_cascade(&mut *self.tx, id).await?)
    }

    async fn insert_issue(&mut self, data: CreateIssue) -> Result<Issue, StoreError> {
        Ok(Issue::create(&mut *self.tx, data).await?)
    }

    async fn find_issue_in_project(&mut self, project_id: Uuid, id: Uuid) -> Result<Option<Issue>, StoreError> {
        Ok(Issue::find_in_project(&mut *self.tx, project_id, id).await?)
    }

    async fn list_issues(&mut self, project_id: Uuid) -> Result<Vec<Issue>, StoreError> {
        Ok(Issue::list_by_project(&mut *self.tx, project_id).await?)
    }

    async fn update_issue(&mut self, id: Uuid, data: UpdateIssue) -> Result<Option<Issue>, StoreError> {
        Ok(Issue::update(&mut *self.tx, id, data).await?)
    }

    async fn delete_issue(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Issue::delete_cascade(&mut *self.tx, id).await?)
    }

    async fn insert_comment(&mut self, data: CreateComment) -> Result<Comment, StoreError> {
        Ok(Comment::create(&mut *self.tx, data).await?)
    }

    async fn find_comment_in_issue(&mut self, issue_id: Uuid, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(Comment::find_in_issue(&mut *self.tx, issue_id, id).await?)
    }

    async fn list_comments(&mut self, issue_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        Ok(Comment::list_by_issue(&mut *self.tx, issue_id).await?)
    }

    async fn update_comment(&mut self, id: Uuid, data: UpdateComment) -> Result<Option<Comment>, StoreError> {
        Ok(Comment::update(&mut *self.tx, id, data).await?)
    }

    async fn delete_comment(&mut self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Comment::delete(&mut *self.tx, id).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
