//! Error handling for HTTP responses.
//!
//! Every error serializes as `{"error":{"code","message"}}`. Unexpected
//! errors map to INTERNAL_SERVER_ERROR; outside production they carry the
//! debug representation so operators can see what broke.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shopforge_core::error::Error;

/// Envelope body for every error response
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

/// HTTP error wrapper for Axum
pub struct HttpError {
    pub status: StatusCode,
    pub body: ErrorEnvelope,
}

impl HttpError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorEnvelope {
                error: ErrorBody {
                    code: code.into(),
                    message: message.into(),
                    stack: None,
                },
            },
        }
    }

    /// Map a core error onto the wire envelope. Operational errors keep
    /// their message; unexpected ones are masked in production.
    pub fn from_error(err: Error, production: bool) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code();

        if err.is_operational() {
            return Self::new(status, code, err.to_string());
        }

        tracing::error!(error = %err, "Request failed with internal error");
        if production {
            Self::new(status, code, "An unexpected error occurred")
        } else {
            let mut http = Self::new(status, code, err.to_string());
            http.body.error.stack = Some(format!("{err:?}"));
            http
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "INVALID_JSON",
            format!("Request body is not valid JSON: {}", message.into()),
        )
    }

    pub fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMIT_EXCEEDED",
            "Rate limit exceeded",
        )
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Result type for HTTP handlers
pub type HttpResult<T> = Result<T, HttpError>;
