//! Centralized error translation.
//!
//! Every failure forwarded by a stage becomes the same reply shape:
//!
//! ```json
//! { "message": "<failure message>" }
//! ```
//!
//! with status `500`, whatever status the failure itself recorded. An empty
//! message is replaced by `"Internal Server Error"`.

use std::any::Any;

use http::StatusCode;
use tracing::error;

use super::context::Reply;
use crate::error::ApiError;

/// Converts failures into the uniform 500 reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Log the failure and build its reply.
    pub fn translate(&self, err: &ApiError) -> Reply {
        error!(
            message = err.message(),
            status_code = err.status_code().as_u16(),
            "Unhandled error"
        );
        Reply::message(StatusCode::INTERNAL_SERVER_ERROR, err.public_message())
    }

    /// Translate a panic payload caught while handling a request.
    pub fn translate_panic(&self, payload: Box<dyn Any + Send + 'static>) -> Reply {
        let message = if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else if let Some(text) = payload.downcast_ref::<&str>() {
            text.to_string()
        } else {
            String::new()
        };
        self.translate(&ApiError::new(message))
    }
}
