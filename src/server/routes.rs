//! Router configuration for the user API.
//!
//! The request pipeline is mounted as the router's fallback, so every path
//! goes through it. Response-shaping concerns wrap it as tower layers.
//!
//! # Layer Stack
//!
//! ```text
//! TraceLayer (optional)
//!   └─ CorsLayer
//!        └─ security_headers
//!             └─ CompressionLayer
//!                  └─ CatchPanicLayer  (panics -> error translator)
//!                       └─ Pipeline   (body, log, health, auth, dispatch, 404)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use user_api::directory::UserDirectory;
//! use user_api::pipeline::ApiKey;
//! use user_api::server::routes::{create_router, RouterConfig};
//!
//! let config = RouterConfig::new(ApiKey::new("my-secret-key"))
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(Arc::new(UserDirectory::seeded()), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware,
    response::IntoResponse,
    Router,
};
use http::header::{HeaderName, CONTENT_TYPE};
use http::Method;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{user_routes, USERS_SCOPE};
use super::headers::security_headers;
use super::identity::{identity_routes, IdentityProvider, SessionStore};
use crate::directory::UserDirectory;
use crate::pipeline::{ApiKey, Pipeline, Reply, RequestContext, API_KEY_HEADER, DEFAULT_BODY_LIMIT};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared secret required under `/users`
    pub api_key: ApiKey,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum accepted JSON body size in bytes
    pub body_limit: usize,

    /// Login provider; the `/auth` routes are mounted only when set
    pub identity: Option<Arc<dyn IdentityProvider>>,
}

impl RouterConfig {
    /// Create a new router configuration with the given API key.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Body limit is 100 KiB
    /// - Tracing is enabled
    /// - No login provider
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            cors_origins: None,
            enable_tracing: true,
            body_limit: DEFAULT_BODY_LIMIT,
            identity: None,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Mount the login routes for `provider`.
    pub fn with_identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new(ApiKey::default())
    }
}

impl std::fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterConfig")
            .field("api_key", &self.api_key)
            .field("cors_origins", &self.cors_origins)
            .field("enable_tracing", &self.enable_tracing)
            .field("body_limit", &self.body_limit)
            .field("identity", &self.identity.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Build the request pipeline serving the user directory.
pub fn build_pipeline(directory: Arc<UserDirectory>, config: &RouterConfig) -> Pipeline {
    Pipeline::builder()
        .body_limit(config.body_limit)
        .protect(USERS_SCOPE, config.api_key.clone())
        .routes(user_routes(directory))
        .build()
}

/// Create the main application router.
///
/// # Arguments
///
/// * `directory` - The user records to serve
/// * `config` - Router configuration
pub fn create_router(directory: Arc<UserDirectory>, config: RouterConfig) -> Router {
    let pipeline = build_pipeline(directory, &config);
    mount_pipeline(pipeline, &config)
}

/// Serve an already built pipeline behind the transport layers.
///
/// Use this to run a pipeline with routes beyond the user directory.
pub fn mount_pipeline(pipeline: Pipeline, config: &RouterConfig) -> Router {
    let translator = *pipeline.translator();

    let mut router: Router = Router::new()
        .fallback(handle_request)
        .with_state(Arc::new(pipeline));

    if let Some(provider) = config.identity.clone() {
        router = router.merge(identity_routes(provider, Arc::new(SessionStore::new())));
    }

    let router = router
        .layer(CatchPanicLayer::custom(move |payload: Box<dyn std::any::Any + Send + 'static>| {
            translator.translate_panic(payload).into_response()
        }))
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors_layer(config));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Run one request through the pipeline.
async fn handle_request(State(pipeline): State<Arc<Pipeline>>, request: Request) -> Reply {
    pipeline.handle(RequestContext::from_request(request)).await
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([HeaderName::from_static(API_KEY_HEADER), CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Create a router over the seeded directory with the development API key.
///
/// **Warning**: The development key is public. Never use this in production.
pub fn create_dev_router() -> Router {
    create_router(Arc::new(UserDirectory::seeded()), RouterConfig::default())
}

// =============================================================================
// Tests
// =============================================================================
