//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use salonq_core::domain::DomainError;
use salonq_core::error::{AppError, ErrorKind};
use serde::Serialize;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    /// Already queued here or at another provider
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    /// Provider closed
    pub const STATE_CONFLICT: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// Machine-readable details attached to queue conflicts
#[derive(Debug, Serialize)]
struct ConflictData<'a> {
    reason: &'a str,
    provider_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_name: Option<&'a str>,
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let message = err.to_string();

    match &err {
        AppError::Domain(DomainError::AlreadyQueuedHere { provider_id, .. }) => {
            let data = ConflictData {
                reason: "ALREADY_QUEUED_HERE",
                provider_id,
                provider_name: None,
            };
            return ErrorObjectOwned::owned(code::CONFLICT, message, Some(data));
        }
        AppError::Domain(DomainError::AlreadyQueuedElsewhere {
            provider_id,
            provider_name,
            ..
        }) => {
            let data = ConflictData {
                reason: "ALREADY_QUEUED_ELSEWHERE",
                provider_id,
                provider_name: Some(provider_name),
            };
            return ErrorObjectOwned::owned(code::CONFLICT, message, Some(data));
        }
        _ => {}
    }

    let code = match err.kind() {
        ErrorKind::Validation => code::VALIDATION_ERROR,
        ErrorKind::NotFound => code::NOT_FOUND,
        ErrorKind::InvariantViolation => code::CONFLICT,
        ErrorKind::StateConflict => code::STATE_CONFLICT,
        ErrorKind::TransientStore => code::DB_ERROR,
        ErrorKind::Internal => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}

/// Failure to bring the server up
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to build server on {addr}: {reason}")]
    Build { addr: String, reason: String },

    #[error("Failed to register method {method}: {reason}")]
    Register { method: &'static str, reason: String },
}
