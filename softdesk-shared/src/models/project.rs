/// Project model and database operations
///
/// A project is the root of the resource hierarchy. It exclusively owns its
/// issues (and through them their comments) and its contributor rows.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_type AS ENUM ('FRONTEND', 'BACK_END', 'IOS', 'ANDROID');
///
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     project_type project_type,
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use super::contributor::Contributor;

/// Project category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectType {
    Frontend,
    BackEnd,
    Ios,
    Android,
}

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project title
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Optional category
    pub project_type: Option<ProjectType>,

    /// Creator of the project, immutable
    pub author_id: Uuid,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    pub project_type: Option<ProjectType>,
    pub author_id: Uuid,
}

/// Input for updating a project. Only non-None fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_type: Option<ProjectType>,
}

impl UpdateProject {
    /// Applies the changes to an in-memory record
    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(project_type) = self.project_type {
            project.project_type = Some(project_type);
        }
        project.updated_at = Utc::now();
    }
}

const PROJECT_COLUMNS: &str = "id, title, description, project_type, author_id, created_at, updated_at";

impl Project {
    /// Inserts a project row
    ///
    /// Does not enroll the author as contributor; the store's unit of work
    /// does both in one transaction.
    pub async fn create(conn: &mut PgConnection, data: CreateProject) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO projects (title, description, project_type, author_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.project_type)
            .bind(data.author_id)
            .fetch_one(conn)
            .await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(project)
    }

    /// Lists every project, oldest first
    pub async fn list(conn: &mut PgConnection) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at ASC");

        let projects = sqlx::query_as::<_, Project>(&query).fetch_all(conn).await?;

        Ok(projects)
    }

    /// Lists the projects a user contributes to
    pub async fn list_by_contributor(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.title, p.description, p.project_type, p.author_id, p.created_at, p.updated_at
            FROM projects p
            JOIN contributors c ON c.project_id = p.id
            WHERE c.user_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(projects)
    }

    /// Updates a project
    ///
    /// # Returns
    ///
    /// The updated project if found, None otherwise
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE projects
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                project_type = COALESCE($4, project_type),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        );

        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.project_type)
            .fetch_optional(conn)
            .await?;

        Ok(project)
    }

    /// Deletes a project and everything below it
    ///
    /// Comments, issues and contributor rows are removed explicitly, in that
    /// order, before the project row. Run inside a transaction so no reader
    /// ever sees a partial cascade.
    ///
    /// # Returns
    ///
    /// True if the project existed
    pub async fn delete_cascade(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query(
            "DELETE FROM comments WHERE issue_id IN (SELECT id FROM issues WHERE project_id = $1)",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM issues WHERE project_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Contributor::delete_by_project(&mut *conn, id).await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
