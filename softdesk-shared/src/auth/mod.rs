/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and unusable-password markers
/// - [`jwt`]: Identity Token Service (access/refresh JWTs)
/// - [`middleware`]: bearer header resolution into an [`middleware::AuthContext`]
/// - [`authorization`]: the Authorization Engine
///
/// # Example
///
/// ```no_run
/// use softdesk_shared::auth::password::{hash_password, verify_password};
/// use softdesk_shared::auth::jwt::{issue_token_pair, TokenLifetimes};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let pair = issue_token_pair(Uuid::new_v4(), "a-secret-of-at-least-thirty-two-bytes", &TokenLifetimes::default())?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
