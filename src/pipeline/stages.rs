//! Built-in pipeline stages.
//!
//! The stages that do not belong to a bigger component: body parsing, request
//! logging, the health route and the 404 catch-all.

use async_trait::async_trait;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use tracing::{debug, info};

use super::context::{Outcome, Reply, RequestContext, Stage};
use crate::error::ApiError;

/// Message of the health reply.
pub const HEALTH_MESSAGE: &str = "API is running!";

/// Message of the catch-all 404 reply.
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";

/// Message recorded when a JSON body exceeds the limit.
pub const BODY_TOO_LARGE_MESSAGE: &str = "request entity too large";

// =============================================================================
// Body Parser
// =============================================================================

/// Parses JSON request bodies into the context.
///
/// Only requests whose content type is `application/json` (or a `+json`
/// suffix type) are read. Other bodies are left untouched. A body that is
/// too large, unreadable or not valid JSON fails the request.
#[derive(Debug, Clone)]
pub struct BodyParser {
    limit: usize,
}

impl BodyParser {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// Whether a `Content-Type` value denotes JSON. Parameters such as
/// `charset` are ignored.
pub fn is_json_content_type(value: &str) -> bool {
    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

#[async_trait]
impl Stage for BodyParser {
    fn name(&self) -> &'static str {
        "body_parser"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Outcome {
        let is_json = ctx
            .header(http::header::CONTENT_TYPE.as_str())
            .is_some_and(is_json_content_type);
        if !is_json {
            return Outcome::Continue;
        }

        let Some(body) = ctx.take_body() else {
            return Outcome::Continue;
        };

        let bytes = match Limited::new(body, self.limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.is::<LengthLimitError>() => {
                return Outcome::Fail(ApiError::with_status(
                    BODY_TOO_LARGE_MESSAGE,
                    StatusCode::PAYLOAD_TOO_LARGE,
                ));
            }
            Err(err) => {
                return Outcome::Fail(ApiError::with_status(
                    format!("Failed to read request body: {}", err),
                    StatusCode::BAD_REQUEST,
                ));
            }
        };

        if bytes.is_empty() {
            return Outcome::Continue;
        }

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(err) => return Outcome::Fail(err.into()),
        };

        // Only objects and arrays are accepted at the top level
        if !(value.is_object() || value.is_array()) {
            return Outcome::Fail(ApiError::with_status(
                "JSON body must be an object or array",
                StatusCode::BAD_REQUEST,
            ));
        }

        debug!(bytes = bytes.len(), "Parsed JSON body");
        ctx.set_json(value);
        Outcome::Continue
    }
}

// =============================================================================
// Request Logger
// =============================================================================

/// Logs one line per request. Always continues.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger;

#[async_trait]
impl Stage for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Outcome {
        info!(
            method = %ctx.method(),
            path = ctx.path(),
            "[{}] {}",
            ctx.method(),
            ctx.path()
        );
        Outcome::Continue
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Answers `GET /` before authentication runs.
#[derive(Debug, Clone, Default)]
pub struct HealthCheck;

#[async_trait]
impl Stage for HealthCheck {
    fn name(&self) -> &'static str {
        "health_check"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Outcome {
        let method = ctx.method();
        if ctx.path() == "/" && (method == Method::GET || method == Method::HEAD) {
            return Outcome::Respond(Reply::message(StatusCode::OK, HEALTH_MESSAGE));
        }
        Outcome::Continue
    }
}

// =============================================================================
// Not Found
// =============================================================================

/// Terminal stage for requests no earlier stage answered.
#[derive(Debug, Clone, Default)]
pub struct NotFound;

#[async_trait]
impl Stage for NotFound {
    fn name(&self) -> &'static str {
        "not_found"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Outcome {
        debug!(method = %ctx.method(), path = ctx.path(), "No route matched");
        Outcome::Respond(Reply::message(
            StatusCode::NOT_FOUND,
            ROUTE_NOT_FOUND_MESSAGE,
        ))
    }
}
