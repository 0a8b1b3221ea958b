/// Issue model and database operations
///
/// An issue belongs to exactly one project for its whole life and owns its
/// comments.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE issues (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status issue_status NOT NULL DEFAULT 'TODO',
///     priority issue_priority,
///     tag issue_tag,
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Workflow status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    #[default]
    Todo,
    InProgress,
    Finished,
}

/// Priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuePriority {
    Low,
    Medium,
    High,
}

/// Kind of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "issue_tag", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueTag {
    Bug,
    Feature,
    Task,
}

/// Issue model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Issue {
    pub id: Uuid,

    /// Owning project, immutable
    pub project_id: Uuid,

    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Option<IssuePriority>,
    pub tag: Option<IssueTag>,

    /// Creator, immutable
    pub author_id: Uuid,

    /// Contributor responsible for the issue, if any
    pub assignee_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssue {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub priority: Option<IssuePriority>,
    pub tag: Option<IssueTag>,
    pub author_id: Uuid,
    pub assignee_id: Option<Uuid>,
}

/// Input for updating an issue
///
/// `assignee_id` uses `Some(None)` to clear the assignee.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIssue {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<IssuePriority>,
    pub tag: Option<IssueTag>,
    pub assignee_id: Option<Option<Uuid>>,
}

impl UpdateIssue {
    /// Applies the changes to an in-memory record
    pub fn apply(self, issue: &mut Issue) {
        if let Some(title) = self.title {
            issue.title = title;
        }
        if let Some(description) = self.description {
            issue.description = description;
        }
        if let Some(status) = self.status {
            issue.status = status;
        }
        if let Some(priority) = self.priority {
            issue.priority = Some(priority);
        }
        if let Some(tag) = self.tag {
            issue.tag = Some(tag);
        }
        if let Some(assignee_id) = self.assignee_id {
            issue.assignee_id = assignee_id;
        }
        issue.updated_at = Utc::now();
    }
}

const ISSUE_COLUMNS: &str = "id, project_id, title, description, status, priority, tag, \
                             author_id, assignee_id, created_at, updated_at";

impl Issue {
    /// Inserts an issue row
    pub async fn create(conn: &mut PgConnection, data: CreateIssue) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO issues (project_id, title, description, status, priority, tag, author_id, assignee_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ISSUE_COLUMNS}
            "#
        );

        let issue = sqlx::query_as::<_, Issue>(&query)
            .bind(data.project_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.tag)
            .bind(data.author_id)
            .bind(data.assignee_id)
            .fetch_one(conn)
            .await?;

        Ok(issue)
    }

    /// Finds an issue only if it belongs to `project_id`
    ///
    /// A mismatched project/issue pair yields None, never the issue.
    pub async fn find_in_project(
        conn: &mut PgConnection,
        project_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = $1 AND project_id = $2");

        let issue = sqlx::query_as::<_, Issue>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(conn)
            .await?;

        Ok(issue)
    }

    /// Lists the issues of a project, oldest first
    pub async fn list_by_project(conn: &mut PgConnection, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = $1 ORDER BY created_at ASC"
        );

        let issues = sqlx::query_as::<_, Issue>(&query)
            .bind(project_id)
            .fetch_all(conn)
            .await?;

        Ok(issues)
    }

    /// Updates an issue
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateIssue,
    ) -> Result<Option<Self>, sqlx::Error> {
        // $7 tells whether the assignee is being written at all, since NULL
        // is a legitimate new value for it
        let query = format!(
            r#"
            UPDATE issues
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                priority = COALESCE($5, priority),
                tag = COALESCE($6, tag),
                assignee_id = CASE WHEN $7 THEN $8 ELSE assignee_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ISSUE_COLUMNS}
            "#
        );

        let set_assignee = data.assignee_id.is_some();
        let issue = sqlx::query_as::<_, Issue>(&query)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.tag)
            .bind(set_assignee)
            .bind(data.assignee_id.flatten())
            .fetch_optional(conn)
            .await?;

        Ok(issue)
    }

    /// Deletes an issue together with its comments
    pub async fn delete_cascade(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM comments WHERE issue_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM issues WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
