//! Error types and error handling

use thiserror::Error;

use crate::hooks::HookEvent;
use crate::uploads::UploadError;
use crate::validate::ValidationErrors;

/// Convenience result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DynCrudError>;

/// Crate error type
#[derive(Debug, Error)]
pub enum DynCrudError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Connection URL scheme does not match a supported dialect
    #[error("Unsupported database dialect: {0}")]
    UnsupportedDialect(String),

    /// Introspected table has no primary key
    #[error("Table `{0}` has no primary key")]
    NoPrimaryKey(String),

    /// Table or column name failed the identifier check
    #[error("Invalid SQL identifier: `{0}`")]
    InvalidIdentifier(String),

    /// Column referenced by the caller is not in the table schema
    #[error("Unknown column: `{0}`")]
    UnknownColumn(String),

    /// CSRF token missing or failed verification
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    /// A lifecycle hook vetoed the operation
    #[error("Hook {event} rejected the operation: {message}")]
    HookVeto {
        /// Event whose callback returned an error
        event: HookEvent,
        /// Veto reason supplied by the callback
        message: String,
    },

    /// File upload failure
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Schema cache backend failure
    #[error("Schema cache error: {0}")]
    Cache(String),

    /// Submission contained no persistable fields after sanitizing
    #[error("Submission contained no persistable fields")]
    EmptySubmission,

    /// A submitted value could not be converted to its column type
    ///
    /// Validation runs first, so this indicates a rule gap rather than bad
    /// user input.
    #[error("Cannot convert value for column `{column}`: {message}")]
    Coerce {
        /// Target column
        column: String,
        /// Parse failure detail
        message: String,
    },

    /// Record validation failed where a typed error is required
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DynCrudError::NoPrimaryKey("users".into());
        assert_eq!(err.to_string(), "Table `users` has no primary key");

        let err = DynCrudError::HookVeto {
            event: HookEvent::BeforeSave,
            message: "nope".into(),
        };
        assert!(err.to_string().contains("beforeSave"));
        assert!(err.to_string().contains("nope"));
    }
}
