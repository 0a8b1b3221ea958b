/// Password hashing using Argon2id
///
/// Hashes are stored as PHC strings, so the parameters travel with the hash
/// and verification needs no configuration.
///
/// # Parameters
///
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2 passes
/// - **Parallelism**: 1 lane
/// - **Output**: 32-byte hash
///
/// A deactivated account gets an *unusable* password: a `!` marker followed
/// by random characters. It is not a PHC string, so no input ever verifies
/// against it.
///
/// # Example
///
/// ```
/// use softdesk_shared::auth::password::{hash_password, unusable_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("super_secret_password_123")?;
/// assert!(verify_password("super_secret_password_123", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
///
/// assert!(!verify_password("anything", &unusable_password())?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use rand::{distributions::Alphanumeric, Rng};

/// Prefix marking a password that can never match
pub const UNUSABLE_PASSWORD_PREFIX: char = '!';

const UNUSABLE_PASSWORD_SUFFIX_LEN: usize = 40;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is neither a PHC string nor an unusable marker
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = ParamsBuilder::new()
        .m_cost(19456)
        .t_cost(2)
        .p_cost(1)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh 16-byte random salt
///
/// # Returns
///
/// PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash in constant time
///
/// # Returns
///
/// `Ok(true)` on match. `Ok(false)` on mismatch or when `hash` is an unusable
/// marker.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if `hash` cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if is_unusable(hash) {
        return Ok(false);
    }

    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Generates a marker that no password will ever verify against
pub fn unusable_password() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UNUSABLE_PASSWORD_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{}{}", UNUSABLE_PASSWORD_PREFIX, suffix)
}

/// Whether `hash` is an unusable marker
pub fn is_unusable(hash: &str) -> bool {
    hash.starts_with(UNUSABLE_PASSWORD_PREFIX)
}
