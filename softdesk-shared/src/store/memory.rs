/// In-memory store
///
/// The whole state sits behind one `tokio::sync::Mutex`. A unit of work takes
/// the lock for its whole lifetime and edits a private copy; commit swaps the
/// copy in and dropping discards it. Units of work are therefore serialized,
/// which gives the same all-or-nothing visibility as a database transaction.
///
/// The unique and foreign key constraints of the PostgreSQL schema are
/// enforced by hand and reported with the same constraint names.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, StoreError, UnitOfWork};
use crate::models::comment::{Comment, CreateComment, UpdateComment};
use crate::models::contributor::{Contributor, CreateContributor, CONTRIBUTOR_CONSTRAINT};
use crate::models::issue::{CreateIssue, Issue, UpdateIssue};
use crate::models::project::{CreateProject, Project, UpdateProject};
use crate::models::user::{CreateUser, UpdateUser, User, USERNAME_CONSTRAINT};

const PROJECT_FK: &str = "contributors_project_id_fkey";
const USER_FK: &str = "contributors_user_id_fkey";
const ISSUE_PROJECT_FK: &str = "issues_project_id_fkey";
const COMMENT_ISSUE_FK: &str = "comments_issue_id_fkey";

/// Rows in insertion order
#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: Vec<User>,
    projects: Vec<Project>,
    contributors: Vec<Contributor>,
    issues: Vec<Issue>,
    comments: Vec<Comment>,
}

/// Store keeping everything in process memory
///
/// Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();

        Ok(Box::new(MemoryUnitOfWork { guard, work }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

impl MemoryUnitOfWork {
    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.work
            .users
            .iter()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn project_exists(&self, id: Uuid) -> bool {
        self.work.projects.iter().any(|p| p.id == id)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn insert_user(&mut self, data: CreateUser) -> Result<User, StoreError> {
        if self.username_taken(&data.username, None) {
            return Err(StoreError::UniqueViolation(USERNAME_CONSTRAINT.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            age: data.age,
            active: true,
            can_be_contacted: data.can_be_contacted,
            can_data_be_shared: data.can_data_be_shared,
            created_at: now,
            updated_at: now,
        };
        self.work.users.push(user.clone());

        Ok(user)
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.work.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.work.users.iter().find(|u| u.username == username).cloned())
    }

    async fn update_user(&mut self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError> {
        if let Some(username) = &data.username {
            if self.username_taken(username, Some(id)) {
                return Err(StoreError::UniqueViolation(USERNAME_CONSTRAINT.to_string()));
            }
        }

        Ok(self.work.users.iter_mut().find(|u| u.id == id).map(|user| {
            data.apply(user);
            user.clone()
        }))
    }

    async fn insert_contributor(&mut self, data: CreateContributor) -> Result<Contributor, StoreError> {
        if !self.project_exists(data.project_id) {
            return Err(StoreError::ForeignKeyViolation(PROJECT_FK.to_string()));
        }
        if !self.work.users.iter().any(|u| u.id == data.user_id) {
            return Err(StoreError::ForeignKeyViolation(USER_FK.to_string()));
        }
        if self
            .work
            .contributors
            .iter()
            .any(|c| c.project_id == data.project_id && c.user_id == data.user_id)
        {
            return Err(StoreError::UniqueViolation(CONTRIBUTOR_CONSTRAINT.to_string()));
        }

        let contributor = Contributor {
            project_id: data.project_id,
            user_id: data.user_id,
            created_at: Utc::now(),
        };
        self.work.contributors.push(contributor.clone());

        Ok(contributor)
    }

    async fn is_contributor(&mut self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .work
            .contributors
            .iter()
            .any(|c| c.project_id == project_id && c.user_id == user_id))
    }

    async fn delete_contributor(&mut self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let before = self.work.contributors.len();
        self.work
            .contributors
            .retain(|c| !(c.project_id == project_id && c.user_id == user_id));

        Ok(self.work.contributors.len() < before)
    }

    async fn list_contributors(&mut self, project_id: Uuid) -> Result<Vec<Contributor>, StoreError> {
        Ok(self
            .work
            .contributors
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn insert_project(&mut self, data: CreateProject) -> Result<Project, StoreError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            project_type: data.project_type,
            author_id: data.author_id,
            created_at: now,
            updated_at: now,
        };
        self.work.projects.push(project.clone());

        Ok(project)
    }

    async fn find_project(&mut self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.work.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects(&mut self) -> Result<Vec<Project>, StoreError> {
        Ok(self.work.projects.clone())
    }

    async fn list_projects_for_contributor(&mut self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let projects = &self.work.projects;

        Ok(self
            .work
            .contributors
            .iter()
            .filter(|c| c.user_id == user_id)
            .filter_map(|c| projects.iter().find(|p| p.id == c.project_id).cloned())
            .collect())
    }

    async fn update_project(&mut self, id: Uuid, data: UpdateProject) -> Result<Option<Project>, StoreError> {
        Ok(self.work.projects.iter_mut().find(|p| p.id == id).map(|project| {
            data.apply(project);
            project.clone()
        }))
    }

    async fn delete_project(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let issue_ids: Vec<Uuid> = self
            .work
            .issues
            .iter()
            .filter(|i| i.project_id == id)
            .map(|i| i.id)
            .collect();

        self.work.comments.retain(|c| !issue_ids.contains(&c.issue_id));
        self.work.issues.retain(|i| i.project_id != id);
        self.work.contributors.retain(|c| c.project_id != id);

        let before = self.work.projects.len();
        self.work.projects.retain(|p| p.id != id);

        Ok(self.work.projects.len() < before)
    }

    async fn insert_issue(&mut self, data: CreateIssue) -> Result<Issue, StoreError> {
        if !self.project_exists(data.project_id) {
            return Err(StoreError::ForeignKeyViolation(ISSUE_PROJECT_FK.to_string()));
        }

        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            tag: data.tag,
            author_id: data.author_id,
            assignee_id: data.assignee_id,
            created_at: now,
            updated_at: now,
        };
        self.work.issues.push(issue.clone());

        Ok(issue)
    }

    async fn find_issue_in_project(&mut self, project_id: Uuid, id: Uuid) -> Result<Option<Issue>, StoreError> {
        Ok(self
            .work
            .issues
            .iter()
            .find(|i| i.id == id && i.project_id == project_id)
            .cloned())
    }

    async fn list_issues(&mut self, project_id: Uuid) -> Result<Vec<Issue>, StoreError> {
        Ok(self
            .work
            .issues
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update_issue(&mut self, id: Uuid, data: UpdateIssue) -> Result<Option<Issue>, StoreError> {
        Ok(self.work.issues.iter_mut().find(|i| i.id == id).map(|issue| {
            data.apply(issue);
            issue.clone()
        }))
    }

    async fn delete_issue(&mut self, id: Uuid) -> Result<bool, StoreError> {
        self.work.comments.retain(|c| c.issue_id != id);

        let before = self.work.issues.len();
        self.work.issues.retain(|i| i.id != id);

        Ok(self.work.issues.len() < before)
    }

    async fn insert_comment(&mut self, data: CreateComment) -> Result<Comment, StoreError> {
        if !self.work.issues.iter().any(|i| i.id == data.issue_id) {
            return Err(StoreError::ForeignKeyViolation(COMMENT_ISSUE_FK.to_string()));
        }

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            issue_id: data.issue_id,
            body: data.body,
            author_id: data.author_id,
            created_at: now,
            updated_at: now,
        };
        self.work.comments.push(comment.clone());

        Ok(comment)
    }

    async fn find_comment_in_issue(&mut self, issue_id: Uuid, id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self
            .work
            .comments
            .iter()
            .find(|c| c.id == id && c.issue_id == issue_id)
            .cloned())
    }

    async fn list_comments(&mut self, issue_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        Ok(self
            .work
            .comments
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn update_comment(&mut self, id: Uuid, data: UpdateComment) -> Result<Option<Comment>, StoreError> {
        Ok(self.work.comments.iter_mut().find(|c| c.id == id).map(|comment| {
            data.apply(comment);
            comment.clone()
        }))
    }

    async fn delete_comment(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let before = self.work.comments.len();
        self.work.comments.retain(|c| c.id != id);

        Ok(self.work.comments.len() < before)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> CreateUser {
        CreateUser {
            username: name.to_string(),
            email: String::new(),
            password_hash: "hash".to_string(),
            age: 30,
            can_be_contacted: false,
            can_data_be_shared: false,
        }
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        let user = uow.insert_user(new_user("alice")).await.unwrap();
        drop(uow);

        let mut uow = store.begin().await.unwrap();
        assert!(uow.find_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();

        let mut uow = store.begin().await.unwrap();
        let user = uow.insert_user(new_user("alice")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert_eq!(uow.find_user(user.id).await.unwrap().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();

        let alice = uow.insert_user(new_user("alice")).await.unwrap();
        let bob = uow.insert_user(new_user("bob")).await.unwrap();
        assert_eq!(
            uow.insert_user(new_user("alice")).await.unwrap_err(),
            StoreError::UniqueViolation(USERNAME_CONSTRAINT.to_string())
        );

        let rename = UpdateUser {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(uow.update_user(bob.id, rename).await.is_err());

        let project = uow
            .insert_project(CreateProject {
                title: "Sprint1".to_string(),
                description: String::new(),
                project_type: None,
                author_id: alice.id,
            })
            .await
            .unwrap();
        let pair = CreateContributor {
            project_id: project.id,
            user_id: alice.id,
        };
        uow.insert_contributor(pair).await.unwrap();
        assert_eq!(
            uow.insert_contributor(pair).await.unwrap_err(),
            StoreError::UniqueViolation(CONTRIBUTOR_CONSTRAINT.to_string())
        );
    }

    #[tokio::test]
    async fn test_contributor_requires_existing_project() {
        let store = MemoryStore::new();
        let mut uow = store.begin().await.unwrap();
        let alice = uow.insert_user(new_user("alice")).await.unwrap();

        let result = uow
            .insert_contributor(CreateContributor {
                project_id: Uuid::new_v4(),
                user_id: alice.id,
            })
            .await;

        assert!(matches!(result, Err(StoreError::ForeignKeyViolation(_))));
    }
}
