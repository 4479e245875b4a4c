//! Panic isolation.
//!
//! Any panic raised by inner layers or the terminal handler is caught here,
//! logged with its payload, and answered with the generic 500 envelope. No
//! internal detail reaches the client and the process keeps serving.

use crate::error::{ApiError, ErrorEnvelope};
use axum::{
    body::Body,
    http::{Response, StatusCode, header},
};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;

type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response<Body>;

/// Build the panic-recovery layer for the middleware stack.
pub(crate) fn build_recover_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(handle_panic as PanicHandler)
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "request handler panicked");

    let body = serde_json::to_string(&ErrorEnvelope::single(ApiError::INTERNAL_SERVER_ERROR))
        .expect("static error envelope serializes");

    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("static response parts are valid")
}
