//! Request-processing pipeline.
//!
//! A request runs once through an ordered list of stages. Each stage either
//! passes it on, answers it directly, or fails it; failures go to the error
//! translator, which produces the uniform 500 reply.
//!
//! # Stage Order
//!
//! ```text
//! ┌──────────────┐  ┌────────────────┐  ┌──────────────┐  ┌───────────┐
//! │ body_parser  │─▶│ request_logger │─▶│ health_check │─▶│ auth_gate │
//! └──────────────┘  └────────────────┘  └──────────────┘  └───────────┘
//!                                                              │
//!                   ┌──────────────┐  ┌──────────────┐         │
//!                   │  not_found   │◀─│  dispatcher  │◀────────┘
//!                   └──────────────┘  └──────────────┘
//!
//!        any Fail ──▶ error translator ──▶ 500 { "message": ... }
//! ```
//!
//! The order is fixed by [`PipelineBuilder::build`]. Response-shaping
//! concerns (CORS, security headers, compression) wrap the pipeline as tower
//! layers; see [`crate::server::routes`].
//!
//! # Example
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use user_api::error::ApiError;
//! use user_api::pipeline::{auth::ApiKey, Pipeline, Reply, RequestContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let pipeline = Pipeline::builder()
//!     .protect("/admin", ApiKey::new("secret123"))
//!     .route(Method::GET, "/admin/ping", |_: &RequestContext| -> Result<Reply, ApiError> {
//!         Ok(Reply::message(StatusCode::OK, "pong"))
//!     })
//!     .build();
//!
//! let reply = pipeline.handle(RequestContext::new(Method::GET, "/admin/ping")).await;
//! assert_eq!(reply.status(), StatusCode::FORBIDDEN);
//! # }
//! ```

pub mod auth;
pub mod context;
pub mod dispatch;
pub mod stages;
pub mod translator;

use http::{Method, StatusCode};
use tracing::trace;

pub use auth::{ApiKey, AuthError, AuthGate, API_KEY_HEADER, DEFAULT_API_KEY};
pub use context::{Outcome, Reply, RequestContext, Stage, JSON_CONTENT_TYPE};
pub use dispatch::{Dispatcher, PathPattern, RouteHandler, RouteTable};
pub use stages::{
    BodyParser, HealthCheck, NotFound, RequestLogger, HEALTH_MESSAGE, ROUTE_NOT_FOUND_MESSAGE,
};
pub use translator::ErrorTranslator;

/// Default maximum JSON body size (100 KiB).
pub const DEFAULT_BODY_LIMIT: usize = 100 * 1024;

// =============================================================================
// Pipeline
// =============================================================================

/// The composed, ordered stage chain.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    translator: ErrorTranslator,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Run a request through every stage until one answers or fails.
    pub async fn handle(&self, mut ctx: RequestContext) -> Reply {
        for stage in &self.stages {
            trace!(stage = stage.name(), "Running stage");
            match stage.handle(&mut ctx).await {
                Outcome::Continue => {}
                Outcome::Respond(reply) => return reply,
                Outcome::Fail(err) => return self.translator.translate(&err),
            }
        }

        // Only reachable for a chain without the catch-all
        Reply::message(StatusCode::NOT_FOUND, ROUTE_NOT_FOUND_MESSAGE)
    }

    /// The error translator used for failed requests.
    pub fn translator(&self) -> &ErrorTranslator {
        &self.translator
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`Pipeline`] in the fixed stage order.
pub struct PipelineBuilder {
    body_limit: usize,
    gate: Option<AuthGate>,
    routes: RouteTable,
}

impl PipelineBuilder {
    /// A builder with the default body limit, no protected scope and no routes.
    pub fn new() -> Self {
        Self {
            body_limit: DEFAULT_BODY_LIMIT,
            gate: None,
            routes: RouteTable::new(),
        }
    }

    /// Maximum accepted JSON body size in bytes.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Require `key` for every request under `scope`.
    pub fn protect(mut self, scope: impl Into<String>, key: ApiKey) -> Self {
        self.gate = Some(AuthGate::new(scope, key));
        self
    }

    /// Register a single route.
    pub fn route<H>(mut self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: RouteHandler + 'static,
    {
        self.routes = self.routes.route(method, pattern, handler);
        self
    }

    /// Register every route of a table, after the ones already registered.
    pub fn routes(mut self, table: RouteTable) -> Self {
        self.routes = self.routes.merge(table);
        self
    }

    pub fn build(self) -> Pipeline {
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(BodyParser::new(self.body_limit)),
            Box::new(RequestLogger),
            Box::new(HealthCheck),
        ];
        if let Some(gate) = self.gate {
            stages.push(Box::new(gate));
        }
        stages.push(Box::new(Dispatcher::new(self.routes)));
        stages.push(Box::new(NotFound));

        Pipeline {
            stages,
            translator: ErrorTranslator::new(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
