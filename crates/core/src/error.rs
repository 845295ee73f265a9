// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse error classes surfaced to callers.
///
/// `InvariantViolation` and `StateConflict` are expected user-facing outcomes and
/// must never be retried automatically. `TransientStore` failures leave no partial
/// state behind and are safe to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvariantViolation,
    StateConflict,
    Validation,
    TransientStore,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        use crate::domain::DomainError;

        match self {
            AppError::Domain(DomainError::ProviderClosed { .. }) => ErrorKind::StateConflict,
            AppError::Domain(DomainError::AlreadyQueuedHere { .. })
            | AppError::Domain(DomainError::AlreadyQueuedElsewhere { .. }) => {
                ErrorKind::InvariantViolation
            }
            AppError::Domain(_) | AppError::Validation(_) | AppError::Serialization(_) => {
                ErrorKind::Validation
            }
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::InvariantViolation,
            AppError::Database(_) => ErrorKind::TransientStore,
            AppError::Config(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn provider_not_found(provider_id: &str) -> Self {
        AppError::NotFound(format!("Provider {} not found", provider_id))
    }

    pub fn customer_not_found(customer_id: &str) -> Self {
        AppError::NotFound(format!("Customer {} not found", customer_id))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_kind_classification() {
        let closed = AppError::from(DomainError::ProviderClosed {
            provider_id: "p1".to_string(),
        });
        assert_eq!(closed.kind(), ErrorKind::StateConflict);

        let here = AppError::from(DomainError::AlreadyQueuedHere {
            customer_id: "c1".to_string(),
            provider_id: "p1".to_string(),
        });
        assert_eq!(here.kind(), ErrorKind::InvariantViolation);

        assert_eq!(
            AppError::provider_not_found("p9").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AppError::Database("locked".to_string()).kind(),
            ErrorKind::TransientStore
        );
    }
}
