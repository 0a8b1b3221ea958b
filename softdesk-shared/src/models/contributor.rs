/// Contributor model and database operations
///
/// A contributor row is the membership fact linking a user to a project. It is
/// the only source of truth for read and create access to a project's subtree.
/// There is no role hierarchy: a row either exists or it does not.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE contributors (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT contributors_pkey PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// Rows survive the soft deletion of their user, which keeps the audit trail
/// intact. Deleting the project removes them.
///
/// # Example
///
/// ```no_run
/// use softdesk_shared::models::contributor::{Contributor, CreateContributor};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, project_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
///
/// Contributor::create(&mut tx, CreateContributor { project_id, user_id }).await?;
/// assert!(Contributor::exists(&mut tx, project_id, user_id).await?);
///
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Name of the primary key constraint, reported on duplicate enrollment
pub const CONTRIBUTOR_CONSTRAINT: &str = "contributors_pkey";

/// Membership fact: `user_id` contributes to `project_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contributor {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// When the user joined the project
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new contributor row
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CreateContributor {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,
}

impl Contributor {
    /// Adds a user to a project
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pair already exists (primary key violation)
    /// - Project or user doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(conn: &mut PgConnection, data: CreateContributor) -> Result<Self, sqlx::Error> {
        let contributor = sqlx::query_as::<_, Contributor>(
            r#"
            INSERT INTO contributors (project_id, user_id)
            VALUES ($1, $2)
            RETURNING project_id, user_id, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .fetch_one(conn)
        .await?;

        Ok(contributor)
    }

    /// Checks if a user contributes to a project
    ///
    /// The matching row is locked `FOR SHARE` until the surrounding transaction
    /// ends, so a concurrent removal cannot slip between the check and the
    /// write it gates.
    pub async fn exists(
        conn: &mut PgConnection,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT 1 FROM contributors
            WHERE project_id = $1 AND user_id = $2
            FOR SHARE
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(row.is_some())
    }

    /// Removes a user from a project
    ///
    /// # Returns
    ///
    /// True if the row was deleted, false if it didn't exist
    pub async fn delete(conn: &mut PgConnection, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contributors WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every contributor row of a project
    pub async fn delete_by_project(conn: &mut PgConnection, project_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contributors WHERE project_id = $1")
            .bind(project_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists all contributors of a project, oldest first
    pub async fn list_by_project(conn: &mut PgConnection, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let contributors = sqlx::query_as::<_, Contributor>(
            r#"
            SELECT project_id, user_id, created_at
            FROM contributors
            WHERE project_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(conn)
        .await?;

        Ok(contributors)
    }
}
