//! Per-request state and the stage contract.

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::header::{IntoHeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Content type of every reply produced by the pipeline.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// =============================================================================
// Request Context
// =============================================================================

/// Everything the pipeline knows about one inbound request.
///
/// Created when the request arrives and dropped once the reply is produced.
/// Stages read it and fill in what they derive (the parsed JSON body, the
/// route parameters bound by the dispatcher).
pub struct RequestContext {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Body>,
    json: Option<Value>,
    params: Vec<(String, String)>,
}

impl RequestContext {
    /// Create a context for a method and path with no headers or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            json: None,
            params: Vec::new(),
        }
    }

    /// Build a context from an HTTP request. The query string is not part of
    /// the path.
    pub fn from_request(request: Request) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body: Some(body),
            json: None,
            params: Vec::new(),
        }
    }

    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as text; `None` when absent or not valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// The parsed JSON body, if the request carried one.
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// A route parameter bound by the dispatcher (already percent-decoded).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    pub(crate) fn set_json(&mut self, value: Value) {
        self.json = Some(value);
    }

    pub(crate) fn set_params(&mut self, params: Vec<(String, String)>) {
        self.params = params;
    }
}

// =============================================================================
// Reply
// =============================================================================

/// A finished JSON response.
///
/// The body is serialized once when the reply is built, so the bytes on the
/// wire keep the field order of the serialized type and never vary between
/// identical requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    status: StatusCode,
    body: Bytes,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a str,
}

impl Reply {
    /// Serialize `value` as the body of a reply with the given status.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_vec(value)?;
        Ok(Self {
            status,
            body: Bytes::from(body),
        })
    }

    /// A `200 OK` reply.
    pub fn ok<T: Serialize + ?Sized>(value: &T) -> Result<Self, ApiError> {
        Self::json(StatusCode::OK, value)
    }

    /// A `{ "message": ... }` reply.
    pub fn message(status: StatusCode, message: &str) -> Self {
        // A struct holding one string always serializes
        let body = serde_json::to_vec(&MessageBody { message }).unwrap_or_default();
        Self {
            status,
            body: Bytes::from(body),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            self.body,
        )
            .into_response()
    }
}

// =============================================================================
// Stage Contract
// =============================================================================

/// What a stage decided about the request.
#[derive(Debug)]
pub enum Outcome {
    /// Hand the request to the next stage
    Continue,

    /// Stop here and send this reply (a direct terminal response)
    Respond(Reply),

    /// Stop here and hand the failure to the error translator
    Fail(ApiError),
}

/// One step of request processing.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Process the request.
    async fn handle(&self, ctx: &mut RequestContext) -> Outcome;
}
