//! Shared-secret API key authentication.
//!
//! Requests under a protected path prefix must carry the configured key in
//! the `x-api-key` header:
//!
//! ```text
//! GET /users/1
//! x-api-key: secret123
//! ```
//!
//! # Comparison Policy
//!
//! - Both the provided and the configured key are trimmed of surrounding whitespace
//! - The trimmed values must be exactly equal (case-sensitive)
//! - A missing, empty or non-text header is always rejected
//! - Comparison runs in constant time
//!
//! A rejected request ends the pipeline with `403 { "message": "Unauthorized" }`.
//! This is a direct response; it never reaches the error translator.
//!
//! # Example
//!
//! ```rust
//! use user_api::pipeline::auth::ApiKey;
//!
//! let key = ApiKey::new("secret123");
//! assert!(key.verify(Some(" secret123 ")).is_ok());
//! assert!(key.verify(Some("SECRET123")).is_err());
//! assert!(key.verify(None).is_err());
//! ```

use async_trait::async_trait;
use http::StatusCode;
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use super::context::{Outcome, Reply, RequestContext, Stage};

/// Header carrying the credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Fallback credential used when none is configured. Development only.
pub const DEFAULT_API_KEY: &str = "secret123";

/// Body message of the 403 reply.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

// =============================================================================
// Types
// =============================================================================

/// Why a request was denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No usable `x-api-key` header
    MissingKey,

    /// Key present but different from the configured one
    InvalidKey,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingKey => write!(f, "Missing API key"),
            AuthError::InvalidKey => write!(f, "Invalid API key"),
        }
    }
}

impl AuthError {
    /// The terminal reply for a denied request.
    ///
    /// Both causes share the same body so clients cannot tell them apart.
    pub fn into_reply(self) -> Reply {
        // Denials are routine, never error severity
        info!(
            reason = %self,
            status = StatusCode::FORBIDDEN.as_u16(),
            "Authentication failed"
        );
        Reply::message(StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE)
    }
}

// =============================================================================
// API Key
// =============================================================================

/// The configured shared secret.
#[derive(Clone)]
pub struct ApiKey {
    secret: String,
}

impl ApiKey {
    /// Create a key from the configured secret. Surrounding whitespace is ignored.
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self {
            secret: secret.as_ref().trim().to_string(),
        }
    }

    /// Check a provided header value against the secret.
    pub fn verify(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let provided = match provided {
            Some(value) if !value.is_empty() => value.trim(),
            _ => return Err(AuthError::MissingKey),
        };

        if provided.as_bytes().ct_eq(self.secret.as_bytes()).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidKey)
        }
    }

    /// Whether this is the built-in development fallback.
    pub fn is_default(&self) -> bool {
        self.secret == DEFAULT_API_KEY
    }
}

impl Default for ApiKey {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Gate Stage
// =============================================================================

/// Pipeline stage enforcing the API key under one path prefix.
///
/// The prefix works like a mount point: it covers the prefix itself and every
/// path below it, compared case-insensitively. Requests outside the prefix
/// pass through untouched.
#[derive(Debug, Clone)]
pub struct AuthGate {
    scope: String,
    key: ApiKey,
}

impl AuthGate {
    pub fn new(scope: impl Into<String>, key: ApiKey) -> Self {
        let scope = scope.into();
        let scope = scope.trim_end_matches('/').to_string();
        Self { scope, key }
    }

    /// Whether `path` falls under the protected prefix.
    pub fn covers(&self, path: &str) -> bool {
        if self.scope.is_empty() {
            return true;
        }
        let Some(head) = path.get(..self.scope.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(&self.scope) {
            return false;
        }
        matches!(path.as_bytes().get(self.scope.len()), None | Some(b'/'))
    }
}

#[async_trait]
impl Stage for AuthGate {
    fn name(&self) -> &'static str {
        "auth_gate"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Outcome {
        if !self.covers(ctx.path()) {
            return Outcome::Continue;
        }

        match self.key.verify(ctx.header(API_KEY_HEADER)) {
            Ok(()) => {
                debug!(path = ctx.path(), "Authentication succeeded");
                Outcome::Continue
            }
            Err(err) => Outcome::Respond(err.into_reply()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
