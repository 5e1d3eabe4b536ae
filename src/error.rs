use http::StatusCode;
use thiserror::Error;

/// Message used by the error translator when a failure carries no message.
pub const FALLBACK_ERROR_MESSAGE: &str = "Internal Server Error";

/// A failure raised by a pipeline stage or route handler.
///
/// Constructed at the point of failure and handed unchanged to the error
/// translator. The status code records what the failing stage believed the
/// problem to be; the translator always answers 500 regardless.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
    status_code: StatusCode,
}

impl ApiError {
    /// Create an error with the default 500 status code.
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create an error with an explicit status code.
    pub fn with_status(message: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }

    /// The raw failure message (may be empty).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The status code recorded where the failure was raised.
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// The message to show to clients, falling back when empty.
    pub fn public_message(&self) -> &str {
        if self.message.is_empty() {
            FALLBACK_ERROR_MESSAGE
        } else {
            &self.message
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::with_status(err.to_string(), StatusCode::BAD_REQUEST)
    }
}

/// Errors raised when building a user directory from records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// The directory must hold at least one record
    #[error("User directory must contain at least one record")]
    Empty,

    /// Two records share the same id
    #[error("Duplicate user id: {0}")]
    DuplicateId(u32),

    /// Ids start at 1
    #[error("Invalid user id: {0} (ids must be greater than 0)")]
    InvalidId(u32),
}

/// Errors raised by an identity provider while authenticating a login.
#[derive(Debug, Clone, Error)]
pub enum IdentityError {
    /// The callback arrived without an authorization code
    #[error("Missing authorization code")]
    MissingCode,

    /// The provider refused the authorization code
    #[error("Authorization code rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered unexpectedly
    #[error("Identity provider error: {0}")]
    Provider(String),
}
