/// Comment model and database operations
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     issue_id UUID NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
///     body TEXT NOT NULL CHECK (body <> ''),
///     author_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Comment on an issue
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,

    /// Owning issue, immutable
    pub issue_id: Uuid,

    pub body: String,

    /// Creator, immutable
    pub author_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub issue_id: Uuid,
    pub body: String,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateComment {
    pub body: Option<String>,
}

impl UpdateComment {
    pub fn apply(self, comment: &mut Comment) {
        if let Some(body) = self.body {
            comment.body = body;
        }
        comment.updated_at = Utc::now();
    }
}

impl Comment {
    pub async fn create(conn: &mut PgConnection, data: CreateComment) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (issue_id, body, author_id)
            VALUES ($1, $2, $3)
            RETURNING id, issue_id, body, author_id, created_at, updated_at
            "#,
        )
        .bind(data.issue_id)
        .bind(data.body)
        .bind(data.author_id)
        .fetch_one(conn)
        .await?;

        Ok(comment)
    }

    /// Finds a comment only if it belongs to `issue_id`
    pub async fn find_in_issue(
        conn: &mut PgConnection,
        issue_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, issue_id, body, author_id, created_at, updated_at
            FROM comments
            WHERE id = $1 AND issue_id = $2
            "#,
        )
        .bind(id)
        .bind(issue_id)
        .fetch_optional(conn)
        .await?;

        Ok(comment)
    }

    pub async fn list_by_issue(conn: &mut PgConnection, issue_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, issue_id, body, author_id, created_at, updated_at
            FROM comments
            WHERE issue_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(issue_id)
        .fetch_all(conn)
        .await?;

        Ok(comments)
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateComment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            UPDATE comments
            SET body = COALESCE($2, body),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, issue_id, body, author_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.body)
        .fetch_optional(conn)
        .await?;

        Ok(comment)
    }

    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
