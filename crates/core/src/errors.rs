//! Error types for the codesync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// Input validation failures. The action is aborted and no state is mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The username is already taken.
    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    /// The college id is already registered to another user.
    #[error("college id '{0}' is already registered")]
    DuplicateCollegeId(String),

    /// College ids are exactly 10 ASCII-alphanumeric characters.
    #[error("college id '{0}' must be 10 alphanumeric characters")]
    MalformedCollegeId(String),

    /// Password and confirmation do not match.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The email address is not syntactically valid.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// Date of birth could not be parsed or falls outside the accepted range.
    #[error("invalid date of birth '{0}': {1}")]
    InvalidDateOfBirth(String, String),

    /// A required field was left empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The room id already exists, so it cannot be created again.
    #[error("room '{0}' already exists")]
    RoomExists(String),
}

// ---------------------------------------------------------------------------
// Authentication / authorization errors
// ---------------------------------------------------------------------------

/// Credential, session, and permission failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// College id / password pair did not match any user.
    #[error("invalid college id or password")]
    InvalidCredentials,

    /// The bearer token is missing, unknown, or past its expiry.
    #[error("session expired or invalid")]
    SessionInvalid,

    /// The submitted OTP does not match the one that was sent.
    #[error("invalid OTP")]
    InvalidOtp,

    /// The OTP outlived its 5-minute validity window.
    #[error("OTP expired, restart registration")]
    OtpExpired,

    /// A registration flow step was taken out of order.
    #[error("registration flow is in state '{state}', cannot {action}")]
    FlowOutOfOrder { state: String, action: String },

    /// The acting user is not allowed to perform this operation.
    #[error("user '{user}' may not {action}")]
    Forbidden { user: String, action: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors from the JSON document persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// JSON (de)serialization failure.
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Generic I/O error reading or writing a store file.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Shorthand for a `NotFound` with an owned id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Code execution errors
// ---------------------------------------------------------------------------

/// Errors from running submitted code in a subprocess.
///
/// A non-zero exit of the child is *not* an error; the captured output is
/// returned in the report and shown verbatim.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The configured interpreter was not found on `$PATH`.
    #[error("interpreter not found: {0}")]
    InterpreterNotFound(String),

    /// The child ran past the wall-clock limit and was killed.
    #[error("execution exceeded the {limit_secs}s time limit")]
    Timeout { limit_secs: u64 },

    /// Generic I/O wrapper (spawn, pipe, temp file).
    #[error("execution I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

/// Errors from OTP email delivery. There are no retries.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message could not be constructed (bad address, bad header).
    #[error("failed to build email: {0}")]
    BuildFailed(String),

    /// SMTP delivery failed.
    #[error("email delivery failed: {0}")]
    SendFailed(String),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = ValidationError::DuplicateCollegeId("ABCD123456".into());
        assert_eq!(
            err.to_string(),
            "college id 'ABCD123456' is already registered"
        );

        let err = StoreError::not_found("project", "p-1");
        assert_eq!(err.to_string(), "project not found: p-1");

        let err = AuthError::Forbidden {
            user: "alice".into(),
            action: "merge fork f-1".into(),
        };
        assert!(err.to_string().contains("alice"));

        let err = ExecError::Timeout { limit_secs: 10 };
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let val_err = ValidationError::PasswordMismatch;
        let core_err: CoreError = val_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let store_err = StoreError::not_found("room", "rust101");
        let core_err: CoreError = store_err.into();
        assert!(matches!(core_err, CoreError::Store(_)));
    }
}
