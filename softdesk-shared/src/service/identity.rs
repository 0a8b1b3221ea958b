/// Identity Store lifecycle
///
/// Accounts move through two states, active and soft-deleted. Registration
/// creates an active account; every self-service operation is scoped to the
/// actor's own record; soft deletion anonymizes the record in place and
/// disables login for good.
///
/// # Example
///
/// ```
/// use softdesk_shared::auth::middleware::AuthContext;
/// use softdesk_shared::service::identity::{self, Registration};
/// use softdesk_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), softdesk_shared::error::ServiceError> {
/// let store = MemoryStore::new();
///
/// let alice = identity::register(&store, Registration {
///     username: "alice".to_string(),
///     password: "correct horse battery".to_string(),
///     email: Some("alice@example.com".to_string()),
///     age: Some(30),
///     ..Default::default()
/// })
/// .await?;
///
/// let actor = AuthContext::new(alice.id);
/// identity::soft_delete(&store, Some(&actor), alice.id).await?;
/// assert!(identity::authenticate(&store, "alice", "correct horse battery").await.is_err());
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::authorize;
use crate::auth::authorization::{authenticated, decide, AccessRequest, Operation, ResourceClass};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{hash_password, unusable_password, verify_password};
use crate::error::ServiceError;
use crate::models::user::{CreateUser, UpdateUser, User, DELETED_USERNAME_PREFIX};
use crate::store::Store;

/// Minimum age at registration (age of digital consent)
pub const MIN_AGE: i32 = 15;

/// Registration input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters."))]
    pub username: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    pub age: Option<i32>,

    #[serde(default)]
    pub can_be_contacted: bool,

    #[serde(default)]
    pub can_data_be_shared: bool,
}

/// Partial profile update; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 150, message = "Username must be 1 to 150 characters."))]
    pub username: Option<String>,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: Option<String>,

    pub age: Option<i32>,

    pub can_be_contacted: Option<bool>,

    pub can_data_be_shared: Option<bool>,
}

fn check_username(username: &str) -> Result<(), ServiceError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');

    if !username.chars().all(allowed) {
        return Err(ServiceError::invalid(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }

    // Reserved for anonymized accounts
    if username.to_ascii_lowercase().starts_with(DELETED_USERNAME_PREFIX) {
        return Err(ServiceError::invalid("username", "This username is reserved."));
    }

    Ok(())
}

fn check_age(age: i32) -> Result<(), ServiceError> {
    if age < MIN_AGE {
        return Err(ServiceError::invalid(
            "age",
            "You must be at least 15 years old to register.",
        ));
    }

    Ok(())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Registers a new active account
///
/// Open to anonymous callers.
///
/// # Errors
///
/// - `ServiceError::Validation` if a field is invalid, `age` is missing or
///   below [`MIN_AGE`], or the username is taken
/// - `ServiceError::Unavailable` if the store failed
pub async fn register(store: &dyn Store, mut input: Registration) -> Result<User, ServiceError> {
    decide(None, &AccessRequest::new(Operation::Register, ResourceClass::User)).into_result()?;

    input.email = blank_to_none(input.email);
    input.validate()?;
    check_username(&input.username)?;

    let age = input
        .age
        .ok_or_else(|| ServiceError::invalid("age", "This field is required."))?;
    check_age(age)?;

    let password_hash = hash_password(&input.password).map_err(|e| ServiceError::Internal(e.to_string()))?;

    let mut uow = store.begin().await?;
    let user = uow
        .insert_user(CreateUser {
            username: input.username,
            email: input.email.unwrap_or_default(),
            password_hash,
            age,
            can_be_contacted: input.can_be_contacted,
            can_data_be_shared: input.can_data_be_shared,
        })
        .await?;
    uow.commit().await?;

    info!(user_id = %user.id, "User registered");
    Ok(user)
}

/// Checks a username/password pair for token acquisition
///
/// Unknown users, wrong passwords and deactivated accounts all fail the same
/// way.
pub async fn authenticate(store: &dyn Store, username: &str, password: &str) -> Result<User, ServiceError> {
    decide(None, &AccessRequest::new(Operation::AcquireToken, ResourceClass::User)).into_result()?;

    let user = store.begin().await?.find_user_by_username(username).await?;

    let Some(user) = user.filter(|u| u.active) else {
        return Err(ServiceError::Unauthenticated);
    };

    match verify_password(password, &user.password_hash) {
        Ok(true) => Ok(user),
        Ok(false) => Err(ServiceError::Unauthenticated),
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Stored password hash is unreadable");
            Err(ServiceError::Unauthenticated)
        }
    }
}

/// Maps a token subject to an actor, if the account is still active
pub async fn resolve_actor(store: &dyn Store, user_id: Uuid) -> Result<AuthContext, ServiceError> {
    let mut uow = store.begin().await?;

    match uow.find_user(user_id).await? {
        Some(user) if user.active => Ok(AuthContext::new(user.id)),
        _ => Err(ServiceError::Unauthenticated),
    }
}

/// Lists users visible to the actor: exactly their own record
pub async fn list_self(store: &dyn Store, actor: Option<&AuthContext>) -> Result<Vec<User>, ServiceError> {
    let actor = authenticated(actor)?;
    authorize(actor, AccessRequest::new(Operation::List, ResourceClass::User))?;

    let mut uow = store.begin().await?;
    let user = uow.find_user(actor.user_id).await?;

    Ok(user.into_iter().collect())
}

/// Returns the actor's own record; any other ID is `NotFound`
pub async fn retrieve(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    target_id: Uuid,
) -> Result<User, ServiceError> {
    let actor = authenticated(actor)?;
    authorize(
        actor,
        AccessRequest::new(Operation::Retrieve, ResourceClass::User).with_owner(target_id),
    )?;

    let mut uow = store.begin().await?;
    uow.find_user(target_id).await?.ok_or(ServiceError::NotFound)
}

/// Applies a partial update to the actor's own record
///
/// A new password is hashed before it is stored.
pub async fn update(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    target_id: Uuid,
    mut input: ProfileUpdate,
) -> Result<User, ServiceError> {
    let actor = authenticated(actor)?;
    authorize(
        actor,
        AccessRequest::new(Operation::Update, ResourceClass::User).with_owner(target_id),
    )?;

    // An explicit empty email clears it
    let clear_email = input.email.as_deref().is_some_and(|e| e.trim().is_empty());
    if clear_email {
        input.email = None;
    }
    input.validate()?;
    if clear_email {
        input.email = Some(String::new());
    }
    if let Some(username) = &input.username {
        check_username(username)?;
    }
    if let Some(age) = input.age {
        check_age(age)?;
    }

    let password_hash = input
        .password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|e| ServiceError::Internal(e.to_string()))?;

    let changes = UpdateUser {
        username: input.username,
        email: input.email,
        password_hash,
        age: input.age,
        active: None,
        can_be_contacted: input.can_be_contacted,
        can_data_be_shared: input.can_data_be_shared,
    };

    let mut uow = store.begin().await?;
    let updated = if changes.is_empty() {
        uow.find_user(target_id).await?
    } else {
        uow.update_user(target_id, changes).await?
    };
    let user = updated.ok_or(ServiceError::NotFound)?;
    uow.commit().await?;

    info!(user_id = %user.id, "User profile updated");
    Ok(user)
}

/// Soft-deletes the actor's own account
///
/// The username becomes `deleted_<id>`, email and consents are cleared, the
/// password is made unusable and the account is deactivated. Contributor rows
/// and authorship references stay in place. Deleting an already deleted
/// account succeeds without changes.
pub async fn soft_delete(
    store: &dyn Store,
    actor: Option<&AuthContext>,
    target_id: Uuid,
) -> Result<(), ServiceError> {
    let actor = authenticated(actor)?;
    authorize(
        actor,
        AccessRequest::new(Operation::Delete, ResourceClass::User).with_owner(target_id),
    )?;

    let mut uow = store.begin().await?;
    let user = uow.find_user(target_id).await?.ok_or(ServiceError::NotFound)?;

    if user.is_deleted() {
        return Ok(());
    }

    uow.update_user(
        target_id,
        UpdateUser {
            username: Some(User::anonymized_username(target_id)),
            email: Some(String::new()),
            password_hash: Some(unusable_password()),
            age: None,
            active: Some(false),
            can_be_contacted: Some(false),
            can_data_be_shared: Some(false),
        },
    )
    .await?;
    uow.commit().await?;

    info!(user_id = %target_id, "User soft-deleted");
    Ok(())
}
