//! # User API
//!
//! A small JSON HTTP API serving a fixed user directory, with the `/users`
//! routes guarded by a shared-secret API key.
//!
//! Requests flow through an explicit, ordered pipeline of stages rather than
//! an implicit middleware registration order, so the processing order can be
//! read straight from [`pipeline::PipelineBuilder::build`].
//!
//! ## Architecture
//!
//! - [`directory`] - The read-only user records
//! - [`pipeline`] - Stage chain, API key gate, route dispatch and error translation
//! - [`server`] - Axum router, transport layers and the optional login flow
//! - [`config`] - CLI and environment configuration
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use user_api::{create_router, ApiKey, RouterConfig, UserDirectory};
//!
//! #[tokio::main]
//! async fn main() {
//!     let router = create_router(
//!         Arc::new(UserDirectory::seeded()),
//!         RouterConfig::new(ApiKey::new("my-secret")),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use config::{Cli, Command, Environment, ServeConfig};
pub use directory::{UserDirectory, UserRecord};
pub use error::{ApiError, DirectoryError, IdentityError, FALLBACK_ERROR_MESSAGE};
pub use pipeline::{
    ApiKey, AuthError, ErrorTranslator, Outcome, Pipeline, PipelineBuilder, Reply,
    RequestContext, RouteTable, Stage, API_KEY_HEADER, DEFAULT_API_KEY, DEFAULT_BODY_LIMIT,
};
pub use server::{
    build_pipeline, create_dev_router, create_router, mount_pipeline, IdentityProvider, Principal,
    RouterConfig, SessionStore, StaticIdentityProvider,
};
