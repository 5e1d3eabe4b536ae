//! HTTP server layer for the user API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │            GET /   GET /users   GET /users/:id                  │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   headers   │  │        routes           │  │
//! │  │ (directory) │  │  (helmet)   │  │ (layers + pipeline)     │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! │                   ┌─────────────┐                               │
//! │                   │  identity   │  optional /auth login flow    │
//! │                   └─────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod headers;
pub mod identity;
pub mod routes;

pub use handlers::{get_user, list_users, user_routes, USERS_SCOPE, USER_NOT_FOUND_MESSAGE};
pub use headers::{default_security_headers, security_headers};
pub use identity::{
    identity_routes, IdentityProvider, Principal, SessionStore, StaticIdentityProvider,
    SESSION_COOKIE,
};
pub use routes::{build_pipeline, create_dev_router, create_router, mount_pipeline, RouterConfig};
