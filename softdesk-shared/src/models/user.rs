/// User model and database operations
///
/// This module provides the User model and the queries backing the Identity
/// Store. Users are never physically removed: deleting an account is a soft
/// transition that anonymizes the record and disables login, so authorship
/// references from projects, issues and comments stay valid.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(150) NOT NULL,
///     email VARCHAR(254) NOT NULL DEFAULT '',
///     password_hash VARCHAR(255) NOT NULL,
///     age INTEGER NOT NULL CHECK (age > 0),
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     can_be_contacted BOOLEAN NOT NULL DEFAULT FALSE,
///     can_data_be_shared BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_username_key UNIQUE (username)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use softdesk_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = pool.acquire().await?;
///
/// let user = User::create(&mut conn, CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     age: 30,
///     can_be_contacted: false,
///     can_data_be_shared: false,
/// }).await?;
///
/// let found = User::find_by_username(&mut conn, "alice").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

/// Name of the unique constraint on `users.username`
pub const USERNAME_CONSTRAINT: &str = "users_username_key";

/// Prefix of anonymized usernames
pub const DELETED_USERNAME_PREFIX: &str = "deleted_";

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Login name, unique across all users
    pub username: String,

    /// Email address (empty when not provided or after deletion)
    pub email: String,

    /// Argon2id password hash
    ///
    /// Holds an unusable marker once the account is deleted.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Age in years
    pub age: i32,

    /// False once the account has been soft-deleted
    pub active: bool,

    /// Whether the user agrees to be contacted
    pub can_be_contacted: bool,

    /// Whether the user consents to data sharing
    pub can_data_be_shared: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Login name
    pub username: String,

    /// Email address, empty if none
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Age in years
    pub age: i32,

    /// Contact consent
    pub can_be_contacted: bool,

    /// Data sharing consent
    pub can_data_be_shared: bool,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New username
    pub username: Option<String>,

    /// New email address
    pub email: Option<String>,

    /// New password hash
    pub password_hash: Option<String>,

    /// New age
    pub age: Option<i32>,

    /// Activation flag
    pub active: Option<bool>,

    /// Contact consent
    pub can_be_contacted: Option<bool>,

    /// Data sharing consent
    pub can_data_be_shared: Option<bool>,
}

impl UpdateUser {
    /// Returns true if no field would change
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.age.is_none()
            && self.active.is_none()
            && self.can_be_contacted.is_none()
            && self.can_data_be_shared.is_none()
    }

    /// Applies the changes to an in-memory record
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(age) = self.age {
            user.age = age;
        }
        if let Some(active) = self.active {
            user.active = active;
        }
        if let Some(can_be_contacted) = self.can_be_contacted {
            user.can_be_contacted = can_be_contacted;
        }
        if let Some(can_data_be_shared) = self.can_data_be_shared {
            user.can_data_be_shared = can_data_be_shared;
        }
        user.updated_at = Utc::now();
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, age, active, \
                            can_be_contacted, can_data_be_shared, created_at, updated_at";

impl User {
    /// Anonymized username for a deleted account
    ///
    /// Derived from the ID, so it is deterministic and cannot collide with
    /// another deleted account.
    ///
    /// # Example
    ///
    /// ```
    /// use softdesk_shared::models::user::User;
    /// use uuid::Uuid;
    ///
    /// let id = Uuid::new_v4();
    /// let name = User::anonymized_username(id);
    /// assert!(name.starts_with("deleted_"));
    /// assert_eq!(name, User::anonymized_username(id));
    /// ```
    pub fn anonymized_username(id: Uuid) -> String {
        format!("{}{}", DELETED_USERNAME_PREFIX, id.simple())
    }

    /// Whether the account has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        !self.active
    }

    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(conn: &mut PgConnection, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (username, email, password_hash, age, can_be_contacted, can_data_be_shared)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.age)
            .bind(data.can_be_contacted)
            .bind(data.can_data_be_shared)
            .fetch_one(conn)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// Returns soft-deleted users as well; callers decide what to do with them.
    pub async fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(user)
    }

    /// Finds a user by username (exact match)
    pub async fn find_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");

        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(conn)
            .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at` timestamp
    /// is automatically set to the current time.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Username already exists for another user
    /// - Database connection fails
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push = |column: &str, present: bool| {
            if present {
                bind_count += 1;
                query.push_str(&format!(", {} = ${}", column, bind_count));
            }
        };
        push("username", data.username.is_some());
        push("email", data.email.is_some());
        push("password_hash", data.password_hash.is_some());
        push("age", data.age.is_some());
        push("active", data.active.is_some());
        push("can_be_contacted", data.can_be_contacted.is_some());
        push("can_data_be_shared", data.can_data_be_shared.is_some());

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(age) = data.age {
            q = q.bind(age);
        }
        if let Some(active) = data.active {
            q = q.bind(active);
        }
        if let Some(can_be_contacted) = data.can_be_contacted {
            q = q.bind(can_be_contacted);
        }
        if let Some(can_data_be_shared) = data.can_data_be_shared {
            q = q.bind(can_data_be_shared);
        }

        let user = q.fetch_optional(conn).await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            age: 30,
            active: true,
            can_be_contacted: true,
            can_data_be_shared: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_update_user_default() {
        let update = UpdateUser::default();
        assert!(update.is_empty());
        assert!(update.username.is_none());
        assert!(update.password_hash.is_none());
        assert!(update.active.is_none());
    }

    #[test]
    fn test_update_user_apply_partial() {
        let mut user = sample_user();
        UpdateUser {
            age: Some(31),
            ..Default::default()
        }
        .apply(&mut user);

        assert_eq!(user.age, 31);
        assert_eq!(user.username, "alice");
        assert!(user.can_be_contacted);
    }

    #[test]
    fn test_anonymized_username_is_derived_from_id() {
        let user = sample_user();
        let name = User::anonymized_username(user.id);
        assert_eq!(name, format!("deleted_{}", user.id.simple()));
        assert_ne!(name, User::anonymized_username(Uuid::new_v4()));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
