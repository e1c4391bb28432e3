/// Domain error taxonomy shared by the engine, the stores and the API.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// An update or delete was attempted against a persisted snapshot.
    #[error("Snapshots are immutable and cannot be {action}")]
    ImmutabilityViolation { action: &'static str },

    /// Stored `data` no longer hashes to the stored `data_checksum`.
    #[error("Checksum mismatch: expected {expected}, actual {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The caller's organisation does not own the requested snapshot.
    ///
    /// Carries no identifiers so the message cannot reveal the
    /// existence of another tenant's records.
    #[error("Access denied")]
    OrganisationAccess,

    /// Version allocation kept losing the claim race and gave up.
    #[error("Version conflict on {entity}: gave up after {attempts} attempts")]
    VersionConflict { entity: String, attempts: u32 },

    #[error("Unsupported output format '{0}'")]
    UnsupportedFormat(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The snapshot store failed for a reason unrelated to the caller.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}
