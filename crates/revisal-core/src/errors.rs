use thiserror::Error;

/// Result type alias using RevisalError
pub type Result<T> = std::result::Result<T, RevisalError>;

/// Error taxonomy for versioning operations
///
/// All operations are local, synchronous data-layer operations; failures are
/// propagated unchanged to the caller and never retried internally.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RevisalError {
    /// Referenced version does not exist (or is hidden by soft-delete visibility)
    #[error("Version not found: {version_id}")]
    VersionNotFound { version_id: String },

    /// Referenced owner does not exist in the record store
    #[error("Owner not found: {owner}")]
    OwnerNotFound { owner: String },

    /// No loader registered for the owner type tag
    #[error("Unknown owner type: {owner_type}")]
    UnknownOwnerType { owner_type: String },

    /// Versioning configuration was set on an entity type that does not
    /// declare the corresponding extension point
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Unrecognized capture-mode token (configuration-time, never at capture time)
    #[error("Invalid version strategy: {value}")]
    InvalidStrategy { value: String },

    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Underlying record/version store failure
    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

/// Conversion from serde_json::Error to RevisalError
impl From<serde_json::Error> for RevisalError {
    fn from(err: serde_json::Error) -> Self {
        RevisalError::Serialization {
            message: err.to_string(),
        }
    }
}
