//! Optional third-party login.
//!
//! An [`IdentityProvider`] turns an authorization code into a [`Principal`].
//! The routes here drive the redirect flow and keep logged-in principals in
//! an in-memory [`SessionStore`] keyed by a random session id that is handed
//! to the browser in the `sid` cookie.
//!
//! # Routes
//!
//! ```text
//! GET /auth/{provider}            - 302 to the provider's authorization URL
//! GET /auth/{provider}/callback   - exchange ?code= for a principal
//! GET /auth/logout                - drop the session, 302 to /
//! ```
//!
//! Any other method on these paths gets the same `404 Route not found` reply
//! as an unmatched route.
//!
//! Sessions live only as long as the process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use http::header::{COOKIE, LOCATION, SET_COOKIE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, IdentityError};
use crate::pipeline::{ErrorTranslator, Reply, ROUTE_NOT_FOUND_MESSAGE};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// Fallback username for profiles without one.
pub const DEFAULT_USERNAME: &str = "unknown";

/// Fallback display name for profiles without one.
pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

// =============================================================================
// Principal
// =============================================================================

/// The authenticated identity returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

impl Principal {
    /// Build a principal, filling in missing or blank profile fields.
    pub fn new(
        id: impl Into<String>,
        username: Option<String>,
        display_name: Option<String>,
    ) -> Self {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            id: id.into(),
            username: present(username).unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            display_name: present(display_name)
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        }
    }
}

// =============================================================================
// Provider Contract
// =============================================================================

/// A login provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Route segment, e.g. `github`.
    fn name(&self) -> &str;

    /// Human-readable name, e.g. `GitHub`.
    fn label(&self) -> &str;

    /// Where to send the browser to start a login.
    fn authorization_url(&self) -> String;

    /// Exchange an authorization code for the user's identity.
    async fn authenticate(&self, code: &str) -> Result<Principal, IdentityError>;
}

/// A provider backed by a fixed table of accepted codes.
///
/// Useful for local development and tests, where no real provider is
/// reachable.
#[derive(Debug, Clone)]
pub struct StaticIdentityProvider {
    name: String,
    label: String,
    authorization_url: String,
    logins: HashMap<String, Principal>,
}

impl StaticIdentityProvider {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        authorization_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            authorization_url: authorization_url.into(),
            logins: HashMap::new(),
        }
    }

    /// Accept `code` as a login for `principal`.
    pub fn with_login(mut self, code: impl Into<String>, principal: Principal) -> Self {
        self.logins.insert(code.into(), principal);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn authorization_url(&self) -> String {
        self.authorization_url.clone()
    }

    async fn authenticate(&self, code: &str) -> Result<Principal, IdentityError> {
        if code.is_empty() {
            return Err(IdentityError::MissingCode);
        }
        self.logins
            .get(code)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected("unknown authorization code".to_string()))
    }
}

// =============================================================================
// Session Store
// =============================================================================

/// In-memory sessions keyed by session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Principal>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session and return its id.
    pub async fn create(&self, principal: Principal) -> String {
        let sid = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(sid.clone(), principal);
        sid
    }

    pub async fn get(&self, sid: &str) -> Option<Principal> {
        self.sessions.read().await.get(sid).cloned()
    }

    /// End a session, returning its principal if it existed.
    pub async fn remove(&self, sid: &str) -> Option<Principal> {
        self.sessions.write().await.remove(sid)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// Read the session id from the request's `Cookie` headers.
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

// =============================================================================
// Routes
// =============================================================================

#[derive(Clone)]
struct IdentityState {
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<SessionStore>,
}

impl IdentityState {
    fn serves(&self, provider: &str) -> bool {
        self.provider.name().eq_ignore_ascii_case(provider)
    }
}

/// Query parameters of the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Serialize)]
struct LoginResponse<'a> {
    message: String,
    user: &'a Principal,
}

/// Routes for the login flow of one provider.
pub fn identity_routes(provider: Arc<dyn IdentityProvider>, sessions: Arc<SessionStore>) -> Router {
    let state = IdentityState { provider, sessions };

    Router::new()
        .route("/auth/logout", get(logout_handler).fallback(route_not_found))
        .route("/auth/{provider}", get(login_handler).fallback(route_not_found))
        .route(
            "/auth/{provider}/callback",
            get(callback_handler).fallback(route_not_found),
        )
        .with_state(state)
}

async fn route_not_found() -> Reply {
    Reply::message(StatusCode::NOT_FOUND, ROUTE_NOT_FOUND_MESSAGE)
}

async fn login_handler(
    State(state): State<IdentityState>,
    Path(provider): Path<String>,
) -> Response {
    if !state.serves(&provider) {
        return route_not_found().await.into_response();
    }

    let url = state.provider.authorization_url();
    debug!(provider = state.provider.name(), "Redirecting to provider");
    match HeaderValue::try_from(url) {
        Ok(location) => redirect(location, None),
        Err(err) => ErrorTranslator::new()
            .translate(&ApiError::new(format!("Invalid authorization URL: {}", err)))
            .into_response(),
    }
}

async fn callback_handler(
    State(state): State<IdentityState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if !state.serves(&provider) {
        return route_not_found().await.into_response();
    }

    let code = params.code.unwrap_or_default();
    let principal = match state.provider.authenticate(&code).await {
        Ok(principal) => principal,
        Err(err) => {
            warn!(provider = state.provider.name(), error = %err, "Login failed");
            return redirect(HeaderValue::from_static("/"), None);
        }
    };

    let sid = state.sessions.create(principal.clone()).await;
    info!(
        provider = state.provider.name(),
        username = %principal.username,
        "Login succeeded"
    );

    let body = LoginResponse {
        message: format!("{} login successful!", state.provider.label()),
        user: &principal,
    };
    let reply = match Reply::ok(&body) {
        Ok(reply) => reply,
        Err(err) => return ErrorTranslator::new().translate(&err).into_response(),
    };

    let mut response = reply.into_response();
    if let Ok(cookie) = HeaderValue::try_from(session_cookie(&sid)) {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

async fn logout_handler(State(state): State<IdentityState>, headers: HeaderMap) -> Response {
    if let Some(sid) = session_id(&headers) {
        if let Some(principal) = state.sessions.remove(sid).await {
            info!(username = %principal.username, "Logged out");
        }
    }

    redirect(
        HeaderValue::from_static("/"),
        Some(HeaderValue::from_static(
            "sid=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        )),
    )
}

fn session_cookie(sid: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, sid)
}

fn redirect(location: HeaderValue, cookie: Option<HeaderValue>) -> Response {
    let mut response = (StatusCode::FOUND, [(LOCATION, location)]).into_response();
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

// =============================================================================
// Tests
// =============================================================================
