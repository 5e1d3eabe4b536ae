//! Route dispatch.
//!
//! A [`RouteTable`] maps a method and a path pattern to a handler. Patterns
//! are slash-separated segments; a segment written `:name` (or `{name}`)
//! captures one non-empty path segment as a parameter.
//!
//! # Matching Rules
//!
//! - Literal segments compare case-insensitively (`/USERS` matches `/users`)
//! - One trailing slash on the request path is ignored
//! - A `GET` route also answers `HEAD`
//! - Routes are tried in registration order; the first match wins
//!
//! Captured parameters are percent-decoded before the handler sees them. A
//! segment that does not decode to UTF-8 is passed through as written.

use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use tracing::debug;

use super::context::{Outcome, Reply, RequestContext, Stage};
use crate::error::ApiError;

// =============================================================================
// Handler Contract
// =============================================================================

/// Produces the reply for a matched route.
///
/// Handlers are synchronous: everything they need is already in memory.
/// Returning `Err` hands the failure to the error translator.
pub trait RouteHandler: Send + Sync {
    fn call(&self, ctx: &RequestContext) -> Result<Reply, ApiError>;
}

impl<F> RouteHandler for F
where
    F: Fn(&RequestContext) -> Result<Reply, ApiError> + Send + Sync,
{
    fn call(&self, ctx: &RequestContext) -> Result<Reply, ApiError> {
        self(ctx)
    }
}

// =============================================================================
// Path Patterns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed route pattern such as `/users/:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = split_segments(pattern)
            .map(|segment| {
                if let Some(name) = segment.strip_prefix(':') {
                    Segment::Param(name.to_string())
                } else if let Some(name) = segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Segment::Param(name.to_string())
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path, returning the raw (still encoded) parameters.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut params = Vec::new();
        let mut parts = split_segments(path);

        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) => {
                    if !part.eq_ignore_ascii_case(literal) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), part.to_string()));
                }
            }
        }

        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

/// Split a path into segments, dropping the leading slash and one trailing slash.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    // The root path has no segments at all
    path.split('/').filter(move |_| !path.is_empty())
}

/// Percent-decode captured parameters, keeping undecodable ones raw.
fn decode_params(raw: Vec<(String, String)>) -> Vec<(String, String)> {
    raw.into_iter()
        .map(|(name, value)| match urlencoding::decode(&value) {
            Ok(decoded) => (name, decoded.into_owned()),
            Err(_) => {
                debug!(param = %name, value = %value, "Param is not valid UTF-8, keeping raw");
                (name, value)
            }
        })
        .collect()
}

// =============================================================================
// Route Table
// =============================================================================

struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    fn accepts(&self, method: &Method) -> bool {
        self.method == *method || (self.method == Method::GET && *method == Method::HEAD)
    }
}

/// Ordered list of routes.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Later registrations never shadow earlier ones.
    pub fn route<H>(mut self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            handler: Arc::new(handler),
        });
        self
    }

    /// Append every route of another table.
    pub fn merge(mut self, other: RouteTable) -> Self {
        self.routes.extend(other.routes);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `(method, pattern)` of every route in registration order.
    pub fn describe(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|route| (route.method.clone(), route.pattern.as_str().to_string()))
            .collect()
    }

    fn find(&self, method: &Method, path: &str) -> Option<(&Route, Vec<(String, String)>)> {
        self.routes.iter().find_map(|route| {
            if !route.accepts(method) {
                return None;
            }
            route.pattern.matches(path).map(|params| (route, params))
        })
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

// =============================================================================
// Dispatcher Stage
// =============================================================================

/// Pipeline stage invoking the handler of the first matching route.
///
/// Continues when nothing matches so the catch-all can answer.
#[derive(Debug)]
pub struct Dispatcher {
    table: RouteTable,
}

impl Dispatcher {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

#[async_trait]
impl Stage for Dispatcher {
    fn name(&self) -> &'static str {
        "dispatcher"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> Outcome {
        let Some((route, raw_params)) = self.table.find(ctx.method(), ctx.path()) else {
            return Outcome::Continue;
        };

        let params = decode_params(raw_params);

        debug!(
            method = %ctx.method(),
            pattern = route.pattern.as_str(),
            "Dispatching request"
        );
        ctx.set_params(params);

        match route.handler.call(ctx) {
            Ok(reply) => Outcome::Respond(reply),
            Err(err) => Outcome::Fail(err),
        }
    }
}
