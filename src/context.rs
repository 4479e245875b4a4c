//! Per-request context.
//!
//! A fresh [`RequestContext`] is attached to every request at the outermost
//! layer of the middleware stack, carrying captured path parameters and the
//! resolved client identity. It is constructed at dispatch and discarded with
//! the request, so nothing can leak between requests. Handlers read it with
//! `Extension<RequestContext>` and never touch the route-matching machinery.

use crate::client_ip::resolve_client_ip;
use axum::{
    extract::{ConnectInfo, RawPathParams, Request, rejection::RawPathParamsRejection},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Request-scoped metadata store.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    client_ip: String,
    params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(client_ip: String) -> Self {
        Self {
            client_ip,
            params: HashMap::new(),
        }
    }

    /// The resolved client identity, as used for rate-limit keying and logs.
    pub fn client_ip(&self) -> &str {
        &self.client_ip
    }

    /// A named path parameter captured by the route pattern, if present.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub(crate) fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }
}

/// Middleware seeding a fresh [`RequestContext`] into the request.
///
/// Runs outermost so every inner layer (rate limiting, logging) and the
/// terminal handler see the same identity, resolved exactly once.
pub(crate) async fn seed_request_context(
    params: std::result::Result<RawPathParams, RawPathParamsRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let connect_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client_ip = resolve_client_ip(request.headers(), connect_addr);

    let mut context = RequestContext::new(client_ip);
    // The fallback route has no captured parameters; the rejection is normal.
    if let Ok(params) = params {
        for (name, value) in &params {
            context.set_param(name, value);
        }
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}
