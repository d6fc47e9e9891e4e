use std::any::Any;

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::error;

/// Outcome of a failed register or login.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("User already exists")]
    UserExists,

    /// Unknown email and wrong password share this variant.
    #[error("Invalid Credentials")]
    InvalidCredentials,

    /// Anything else. The source stays server-side.
    #[error("Server Error")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UserExists | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

/// Error forwarded by the pipeline to the global handler.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        error!(status = ?self.status, error = %self.message, "request failed");
        let status = self.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if self.message.is_empty() {
            "Internal Server Error".to_string()
        } else {
            self.message
        };
        let body = Json(json!({
            "message": message,
            "error": {},
        }));
        (status, body).into_response()
    }
}

/// Turns a handler panic into a global-handler response.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "handler panicked");
    ApiError {
        status: None,
        message: String::new(),
    }
    .into_response()
}
