//! Error handling for revisal-store
//!
//! Wraps revisal-core RevisalError with store-specific helpers

use revisal_core::RevisalError;

/// Result type alias using RevisalError
pub type Result<T> = std::result::Result<T, RevisalError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> RevisalError {
    RevisalError::Persistence {
        message: format!("Migration {} failed: {}", migration_id, reason),
    }
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> RevisalError {
    RevisalError::Persistence {
        message: err.to_string(),
    }
}
