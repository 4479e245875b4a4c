//! Deadline enforcement.
//!
//! If the inner chain has not produced a response by the configured
//! deadline, the client receives the fixed `timeout` envelope (503) and the
//! inner future is dropped. A hang anywhere below this layer is bounded.
//!
//! Dropping the inner future also drops the request-logging layer before it
//! can fire, so the per-request log record for a timed-out request is
//! emitted here instead, with the same fields the logging layer writes.

use crate::{context::RequestContext, error::ApiError};
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::time::{Duration, Instant};
use tower::{Layer, Service};

/// Tower layer enforcing a per-request deadline
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    duration: Duration,
}

impl TimeoutLayer {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            duration: self.duration,
        }
    }
}

/// Tower service enforcing a per-request deadline
#[derive(Clone)]
pub struct TimeoutService<S> {
    inner: S,
    duration: Duration,
}

impl<S> Service<Request> for TimeoutService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let duration = self.duration;
        let method = req.method().clone();
        let uri = req.uri().clone();
        let client = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.client_ip().to_string())
            .unwrap_or_default();
        let start = Instant::now();
        let fut = self.inner.call(req);

        Box::pin(async move {
            match tokio::time::timeout(duration, fut).await {
                Ok(result) => result,
                Err(_) => {
                    let response = ApiError::TIMEOUT.into_response();
                    let status = response.status();
                    let elapsed = start.elapsed();

                    let message = format!(
                        "[{}] {} {} {} {}ms (deadline exceeded)",
                        client,
                        method,
                        uri,
                        status.as_u16(),
                        elapsed.as_millis()
                    );
                    tracing::error!(
                        client = %client,
                        method = %method,
                        uri = %uri,
                        status = status.as_u16(),
                        duration_ms = elapsed.as_millis(),
                        timeout_ms = duration.as_millis(),
                        "{message}"
                    );

                    Ok(response)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};
    use tower::{ServiceBuilder, ServiceExt, service_fn};

    async fn slow_ok(_req: Request) -> Result<Response, Infallible> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(StatusCode::OK.into_response())
    }

    async fn fast_ok(_req: Request) -> Result<Response, Infallible> {
        Ok(StatusCode::OK.into_response())
    }

    #[derive(Clone, Default)]
    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl CaptureWriter {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for CaptureWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_inner_gets_timeout_envelope() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(1)))
            .service(service_fn(slow_ok));

        let response = svc
            .oneshot(Request::new(axum::body::Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["errors"][0]["code"], "timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_request_is_logged_with_client_and_status() {
        let writer = CaptureWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(1)))
            .service(service_fn(slow_ok));

        let mut request = Request::new(axum::body::Body::empty());
        request
            .extensions_mut()
            .insert(RequestContext::new("1.2.3.4".to_string()));

        let response = svc.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let output = writer.contents();
        assert!(
            output.contains("1.2.3.4"),
            "log record missing client identity: {output}"
        );
        assert!(
            output.contains("503"),
            "log record missing response status: {output}"
        );
        assert!(
            output.contains("duration_ms"),
            "log record missing elapsed time: {output}"
        );
    }

    #[tokio::test]
    async fn test_fast_inner_passes_through() {
        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(Duration::from_secs(1)))
            .service(service_fn(fast_ok));

        let response = svc
            .oneshot(Request::new(axum::body::Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
