use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for Seawall servers.
///
/// These are startup/configuration faults: they are fatal and the process
/// must not begin serving. Per-request failures never surface through this
/// type; they are converted into [`ApiError`] envelopes by the middleware
/// stack instead.
#[derive(Debug, thiserror::Error)]
pub enum SeawallError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SeawallError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type alias for Seawall startup paths
pub type Result<T> = std::result::Result<T, SeawallError>;

/// A predefined, wire-level API error.
///
/// Every error a client can observe is one of a fixed set of immutable
/// records, serialized inside an [`ErrorEnvelope`]. The `code` is a stable
/// machine-readable slug; `status` doubles as the HTTP status of the
/// response carrying the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub status: u16,
    pub title: &'static str,
    pub detail: &'static str,
}

impl ApiError {
    pub const NOT_FOUND: ApiError = ApiError {
        code: "not_found",
        status: 404,
        title: "Not found",
        detail: "Route not found.",
    };

    pub const RESOURCE_NOT_FOUND: ApiError = ApiError {
        code: "resource_not_found",
        status: 404,
        title: "Not found",
        detail: "Resource not found.",
    };

    pub const LIMIT_EXCEEDED: ApiError = ApiError {
        code: "limit_exceeded",
        status: 429,
        title: "Too Many Requests",
        detail: "Too many requests, please wait and submit again.",
    };

    pub const INTERNAL_SERVER_ERROR: ApiError = ApiError {
        code: "internal_server_error",
        status: 500,
        title: "Internal Server Error",
        detail: "Something went wrong.",
    };

    pub const NOT_IMPLEMENTED: ApiError = ApiError {
        code: "not_implemented",
        status: 501,
        title: "Not Implemented",
        detail: "The server does not support the functionality required to fulfill the request. It may not have been implemented yet.",
    };

    pub const TIMEOUT: ApiError = ApiError {
        code: "timeout",
        status: 503,
        title: "Service Unavailable",
        detail: "The request took longer than expected to process.",
    };

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status, self.detail)
    }
}

impl std::error::Error for ApiError {}

/// The fixed top-level wrapper for error responses.
///
/// Always a list, even for a single error, so clients can parse one shape.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ApiError>,
}

impl ErrorEnvelope {
    pub fn single(error: ApiError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(ErrorEnvelope::single(self))).into_response()
    }
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        let status = self
            .errors
            .first()
            .map(ApiError::status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
