/// Domain error taxonomy
///
/// Every service operation fails with a [`ServiceError`]. Deny reasons from
/// the Authorization Engine and storage faults both convert into it, so
/// services can use `?` throughout. Messages stay coarse: they never name the
/// user, project or membership a decision was based on.

use serde::Serialize;

use crate::auth::authorization::DenyReason;
use crate::models::contributor::CONTRIBUTOR_CONSTRAINT;
use crate::models::user::USERNAME_CONSTRAINT;
use crate::store::StoreError;

/// One rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error returned by the domain services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// No valid credential was presented
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but not allowed
    #[error("Permission denied")]
    Forbidden,

    /// Missing, or hidden from the actor
    #[error("Resource not found")]
    NotFound,

    /// Duplicate membership or other uniqueness conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed or missing input
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// Storage failure
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Failure outside storage, e.g. hashing
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Validation error on a single field
    pub fn invalid(field: &str, message: &str) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<DenyReason> for ServiceError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => ServiceError::Unauthenticated,
            DenyReason::Forbidden => ServiceError::Forbidden,
            DenyReason::NotFound => ServiceError::NotFound,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) if constraint == USERNAME_CONSTRAINT => {
                ServiceError::invalid("username", "A user with that username already exists.")
            }
            StoreError::UniqueViolation(constraint) if constraint == CONTRIBUTOR_CONSTRAINT => {
                ServiceError::Conflict("Already a contributor of this project".to_string())
            }
            StoreError::UniqueViolation(_) => {
                ServiceError::Conflict("Resource already exists".to_string())
            }
            // The parent vanished under a concurrent delete
            StoreError::ForeignKeyViolation(_) => ServiceError::NotFound,
            StoreError::Unavailable(msg) => ServiceError::Unavailable(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    FieldError::new(
                        field.to_string(),
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid {}", field)),
                    )
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));

        ServiceError::Validation(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_by_constraint() {
        let err = ServiceError::from(StoreError::UniqueViolation(USERNAME_CONSTRAINT.to_string()));
        assert!(matches!(err, ServiceError::Validation(ref f) if f[0].field == "username"));

        let err = ServiceError::from(StoreError::UniqueViolation(CONTRIBUTOR_CONSTRAINT.to_string()));
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = ServiceError::from(StoreError::Unavailable("pool timed out".to_string()));
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[test]
    fn test_deny_reasons_map_one_to_one() {
        assert!(matches!(ServiceError::from(DenyReason::Unauthenticated), ServiceError::Unauthenticated));
        assert!(matches!(ServiceError::from(DenyReason::Forbidden), ServiceError::Forbidden));
        assert!(matches!(ServiceError::from(DenyReason::NotFound), ServiceError::NotFound));
    }
}
