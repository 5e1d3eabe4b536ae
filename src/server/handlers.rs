//! User directory route handlers.
//!
//! # Endpoints
//!
//! - `GET /users` - All user records in directory order
//! - `GET /users/:id` - One user record, or `404 { "message": "User not found" }`
//!
//! Both sit under the protected `/users` scope; the pipeline has already
//! checked the API key by the time a handler runs.

use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::debug;

use crate::directory::UserDirectory;
use crate::error::ApiError;
use crate::pipeline::{Reply, RequestContext, RouteTable};

/// Message of the 404 reply for an unknown user id.
pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

/// Path prefix guarded by the API key.
pub const USERS_SCOPE: &str = "/users";

// =============================================================================
// Handlers
// =============================================================================

/// `GET /users`
pub fn list_users(directory: &UserDirectory) -> Result<Reply, ApiError> {
    Reply::ok(directory.list())
}

/// `GET /users/:id`
///
/// The id must be a base-10 integer. Anything else is treated like an id
/// that does not exist.
pub fn get_user(directory: &UserDirectory, ctx: &RequestContext) -> Result<Reply, ApiError> {
    let raw = ctx.param("id").unwrap_or_default();

    let user = raw
        .parse::<i64>()
        .ok()
        .and_then(|id| directory.get(id));

    match user {
        Some(user) => Reply::ok(user),
        None => {
            debug!(id = raw, "User lookup missed");
            Ok(Reply::message(StatusCode::NOT_FOUND, USER_NOT_FOUND_MESSAGE))
        }
    }
}

/// The route table for the user directory.
pub fn user_routes(directory: Arc<UserDirectory>) -> RouteTable {
    let list_directory = Arc::clone(&directory);
    let get_directory = directory;

    RouteTable::new()
        .route(Method::GET, USERS_SCOPE, move |_: &RequestContext| {
            list_users(&list_directory)
        })
        .route(Method::GET, "/users/:id", move |ctx: &RequestContext| {
            get_user(&get_directory, ctx)
        })
}

// =============================================================================
// Tests
// =============================================================================
