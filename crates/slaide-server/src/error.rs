//! Mapping of every failure onto an HTTP status and a JSON error body.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::BoxError;
use serde::Serialize;
use serde_json::Value;
use slaide_core::{AuthError, DeliveryError, GenerateError, HostError};

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The caller omitted a required field.
    #[error("{}", missing_message(.0))]
    MissingParameter(&'static str),

    /// The request body is not valid JSON.
    #[error("Bad request")]
    BadRequest(String),

    /// The referenced file is absent or unreadable.
    #[error("Not found")]
    NotFound(#[from] DeliveryError),

    /// The Host could not be reached or answered with a non-2xx status.
    #[error(transparent)]
    Upstream(#[from] HostError),

    /// The Host answered but named no artifact we know.
    #[error("Unrecognized Host response")]
    UnrecognizedResponse(Value),

    /// Discord or Supabase settings are missing.
    #[error("Discord login is not configured")]
    NotConfigured,

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request outlived the server's request timeout.
    #[error("Request timed out")]
    Timeout(Duration),

    #[error("Internal error")]
    Internal(String),
}

fn missing_message(field: &str) -> String {
    match field {
        "code" => "No code provided".to_string(),
        field => format!("Missing {field}"),
    }
}

impl From<GenerateError> for ApiError {
    fn from(err: GenerateError) -> Self {
        match err {
            GenerateError::Host(host) => ApiError::Upstream(host),
            GenerateError::Unrecognized(body) => ApiError::UnrecognizedResponse(body),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(HostError::Status { .. }) => StatusCode::BAD_GATEWAY,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnrecognizedResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Auth(AuthError::TokenRejected(_) | AuthError::ProfileRejected(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        let (error, details) = match self {
            ApiError::BadRequest(reason) => (self.to_string(), Some(Value::String(reason.clone()))),
            ApiError::NotFound(err) => (self.to_string(), Some(Value::String(err.reason().to_string()))),
            ApiError::Upstream(HostError::Transport(err)) => (
                "Server error".to_string(),
                Some(Value::String(err.to_string())),
            ),
            ApiError::Upstream(HostError::Status { body, .. }) => {
                (self.to_string(), Some(Value::String(body.clone())))
            }
            ApiError::UnrecognizedResponse(body) => (self.to_string(), Some(body.clone())),
            ApiError::Auth(err) => {
                let details = match err {
                    AuthError::TokenTransport(e) | AuthError::ProfileTransport(e) => {
                        Some(Value::String(e.to_string()))
                    }
                    AuthError::TokenRejected(body) | AuthError::ProfileRejected(body) => {
                        Some(body.clone())
                    }
                    AuthError::Store { body, .. } => Some(body.clone()),
                    _ => None,
                };
                // Transport causes go in `details`, not the headline.
                let headline = match err {
                    AuthError::TokenTransport(_) => "Failed to fetch token".to_string(),
                    AuthError::ProfileTransport(_) => "Failed to fetch user info".to_string(),
                    other => other.to_string(),
                };
                (headline, details)
            }
            ApiError::Timeout(limit) => (
                self.to_string(),
                Some(Value::String(format!(
                    "no response within {}s",
                    limit.as_secs()
                ))),
            ),
            ApiError::Internal(reason) => (self.to_string(), Some(Value::String(reason.clone()))),
            _ => (self.to_string(), None),
        };
        ErrorResponse { error, details }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

/// Turn a middleware failure into a JSON error; the only expected one is
/// the request timeout.
pub(crate) fn middleware_error(err: BoxError, limit: Duration) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Timeout(limit)
    } else {
        ApiError::Internal(err.to_string())
    }
}
