//! Request logging.
//!
//! One structured event per request, emitted after the full inner chain
//! completes: client identity, method, URI, status, elapsed wall-clock time,
//! and the request id minted by the request-id layer. Rate-limit denials are
//! logged the same way as successes, since this layer sits outside them.
//! Timed-out requests never complete this layer's future; the timeout layer
//! emits their record with the same fields.

use crate::context::RequestContext;
use axum::{body::Body, extract::Request, http::Response};
use futures::future::BoxFuture;
use std::time::Instant;
use tower::Service;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Mints a UUID v4 request id for the request-id layer.
#[derive(Clone, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let request_id = Uuid::new_v4().to_string().parse().ok()?;
        Some(RequestId::new(request_id))
    }
}

/// Tower layer for request logging
#[derive(Clone, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> tower::Layer<S> for RequestLogLayer {
    type Service = RequestLogService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogService { inner }
    }
}

/// Tower service for request logging
#[derive(Clone)]
pub struct RequestLogService<S> {
    inner: S,
}

impl<S> Service<Request> for RequestLogService<S>
where
    S: Service<Request, Response = Response<Body>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let start = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();

        let client = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.client_ip().to_string())
            .unwrap_or_default();

        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fut = self.inner.call(req);

        Box::pin(async move {
            let response = fut.await?;
            let status = response.status();
            let duration = start.elapsed();

            let message = format!(
                "[{}] {} {} {} {}ms",
                client,
                method,
                uri,
                status.as_u16(),
                duration.as_millis()
            );

            if status.is_server_error() {
                tracing::error!(
                    client = %client,
                    method = %method,
                    uri = %uri,
                    status = status.as_u16(),
                    duration_ms = duration.as_millis(),
                    request_id = ?request_id,
                    "{message}"
                );
            } else if status.is_client_error() {
                tracing::warn!(
                    client = %client,
                    method = %method,
                    uri = %uri,
                    status = status.as_u16(),
                    duration_ms = duration.as_millis(),
                    request_id = ?request_id,
                    "{message}"
                );
            } else {
                tracing::info!(
                    client = %client,
                    method = %method,
                    uri = %uri,
                    status = status.as_u16(),
                    duration_ms = duration.as_millis(),
                    request_id = ?request_id,
                    "{message}"
                );
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};
    use std::convert::Infallible;
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    #[tokio::test]
    async fn test_response_passes_through_unchanged() {
        let svc = ServiceBuilder::new()
            .layer(RequestLogLayer::new())
            .service(service_fn(|_req: Request| async {
                Ok::<_, Infallible>((StatusCode::CREATED, "made").into_response())
            }));

        let response = svc
            .oneshot(Request::new(Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_make_request_uuid_produces_parseable_ids() {
        let mut make = MakeRequestUuid;
        let request = axum::http::Request::new(());
        let id = make.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
