//! Route table and server.
//!
//! Routes are registered against a plain router; the middleware stack is
//! applied once, in a fixed order, when the router is finalized. Both the
//! route table and the stack are immutable for the process lifetime.

use crate::{
    config::Config,
    context,
    error::{ApiError, Result, SeawallError},
    ratelimit::RateLimitLayer,
    recover::build_recover_layer,
    request_logging::{MakeRequestUuid, RequestLogLayer},
    timeout::TimeoutLayer,
};
use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{self, MethodRouter},
};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// An API server wrapping every registered route with the middleware stack.
pub struct Server {
    router: Router,
    config: Config,
    rate_limit: RateLimitLayer,
}

impl Server {
    /// Create a server from a validated configuration.
    ///
    /// The rate limiter is constructed here so an invalid quota or capacity
    /// fails before any socket is bound.
    pub fn new(config: Config) -> Result<Self> {
        let rate_limit = RateLimitLayer::new(&config.rate_limit)?;
        let router = Router::new().fallback(not_found);

        Ok(Self {
            router,
            config,
            rate_limit,
        })
    }

    /// Register a GET handler for a path pattern.
    ///
    /// Patterns may capture named parameters (`/users/{id}`); captures are
    /// available to the handler through `Extension<RequestContext>`.
    /// Registering two overlapping patterns for one method panics at
    /// startup, so dispatch is never ambiguous at runtime.
    pub fn get<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.router = self.router.route(path, routing::get(handler));
        self
    }

    /// Register a POST handler for a path pattern.
    pub fn post<H, T>(mut self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.router = self.router.route(path, routing::post(handler));
        self
    }

    /// Register an arbitrary method router for a path pattern.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Apply the middleware stack.
    ///
    /// Outermost to innermost: context seeding, timeout, request id,
    /// trace, request logging, panic recovery, rate limiting, handler.
    /// Recovery sits inside logging so failures are still timed and logged,
    /// and outside rate limiting so a fault in the limiter itself is caught;
    /// the timeout bounds a hang anywhere below it. With `Router::layer`
    /// the last layer added is the outermost.
    fn with_middleware(self) -> Router {
        self.router
            .layer(self.rate_limit)
            .layer(build_recover_layer())
            .layer(RequestLogLayer::new())
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TimeoutLayer::new(self.config.timeout.duration()))
            .layer(middleware::from_fn(context::seed_request_context))
    }

    /// Finalize the router with the full middleware stack applied.
    ///
    /// Useful for in-process testing with `tower::ServiceExt::oneshot`
    /// without binding a socket.
    pub fn into_router(self) -> Router {
        self.with_middleware()
    }

    /// Bind the listen address and serve until shutdown.
    ///
    /// Binding failure is fatal; no request is ever handled by a server
    /// that could not fully start.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.addr()?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| SeawallError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        tracing::info!("server listening on http://{addr}");

        let router = self.with_middleware();

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

async fn not_found() -> ApiError {
    ApiError::NOT_FOUND
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            tracing::info!("received terminate signal, shutting down");
        },
    }
}
