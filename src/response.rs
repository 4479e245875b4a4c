//! Success response envelope.
//!
//! Every successful body is `{"data": <payload>}` so clients parse a single
//! shape regardless of route.

use crate::error::ApiError;
use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard JSON success wrapper
#[derive(Debug, Serialize)]
pub struct Data<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => (
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            // An unencodable success payload is an internal fault. The client
            // gets the same generic envelope the panic-recovery layer writes.
            Err(err) => {
                tracing::error!(error = %err, "failed to encode response payload");
                ApiError::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Handler for routes that are declared but not yet implemented.
///
/// Bind this in place of a real handler to always answer 501 with the
/// `not_implemented` error envelope.
pub async fn not_implemented() -> ApiError {
    ApiError::NOT_IMPLEMENTED
}
