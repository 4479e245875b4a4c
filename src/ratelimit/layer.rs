//! Rate limiting layer backed by governor and moka.
//!
//! Admission is a per-client GCRA check: each client identity has a virtual
//! token bucket refilling at `per_minute` tokens per minute, capped at
//! `burst`, implemented as an O(1) theoretical-arrival-time comparison
//! rather than a ticked bucket. Per-client limiter state lives in a
//! fixed-capacity moka cache with LRU eviction, so the store never grows
//! past `max_clients` no matter how many distinct identities arrive.
//! Nothing outside this module touches the store.

use super::config::RateLimitConfig;
use crate::{
    context::RequestContext,
    error::{ApiError, SeawallError},
};
use axum::{
    extract::Request,
    http::header,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use moka::{policy::EvictionPolicy, sync::Cache};
use std::{num::NonZeroU32, sync::Arc};
use tower::{Layer, Service};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Concurrency-safe, per-client GCRA admission with a bounded client store.
#[derive(Clone)]
pub struct ClientRateLimiter {
    clients: Cache<String, Arc<DirectLimiter>>,
    quota: Quota,
}

impl ClientRateLimiter {
    /// Construct the limiter, validating the quota.
    ///
    /// A non-positive rate, burst, or capacity is a fatal startup error; the
    /// server must refuse to start rather than serve with a broken limiter.
    pub fn new(config: &RateLimitConfig) -> Result<Self, SeawallError> {
        let per_minute = NonZeroU32::new(config.per_minute).ok_or_else(|| {
            SeawallError::invalid_config("rate limit per_minute must be greater than 0")
        })?;
        let burst = NonZeroU32::new(config.burst)
            .ok_or_else(|| SeawallError::invalid_config("rate limit burst must be greater than 0"))?;
        if config.max_clients == 0 {
            return Err(SeawallError::invalid_config(
                "rate limit max_clients must be greater than 0",
            ));
        }

        let clients = Cache::builder()
            .max_capacity(config.max_clients as u64)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Ok(Self {
            clients,
            quota: Quota::per_minute(per_minute).allow_burst(burst),
        })
    }

    /// Admit or deny one request for `client`.
    ///
    /// On denial returns the whole seconds until the next token refills,
    /// suitable for a `Retry-After` header.
    ///
    /// When the store is at capacity, admitting a new identity evicts the
    /// least recently used one; the evicted client's burst allowance resets
    /// on its next request, trading rare accuracy loss for bounded memory.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        let limiter = self
            .clients
            .get_with(client.to_string(), || Arc::new(RateLimiter::direct(self.quota)));

        match limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Err(wait.as_secs().max(1))
            }
        }
    }

    /// Number of distinct client identities currently tracked.
    ///
    /// Runs pending cache maintenance first, so the count reflects
    /// completed evictions.
    pub fn tracked_clients(&self) -> usize {
        self.clients.run_pending_tasks();
        self.clients.entry_count() as usize
    }
}

/// Tower layer for per-client rate limiting
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: ClientRateLimiter,
}

impl RateLimitLayer {
    pub fn new(config: &RateLimitConfig) -> Result<Self, SeawallError> {
        Ok(Self {
            limiter: ClientRateLimiter::new(config)?,
        })
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Tower service for per-client rate limiting
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: ClientRateLimiter,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Response: IntoResponse,
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
        // Identity was resolved once by the context middleware. A missing
        // context resolves to the empty identity: one shared bucket.
        let client = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.client_ip().to_string())
            .unwrap_or_default();

        match self.limiter.check(&client) {
            Ok(()) => {
                let mut svc = self.inner.clone();
                Box::pin(async move {
                    let response = svc.call(req).await?;
                    Ok(response.into_response())
                })
            }
            Err(retry_after) => {
                tracing::warn!(client = %client, retry_after, "rate limit exceeded");
                Box::pin(async move {
                    let mut response = ApiError::LIMIT_EXCEEDED.into_response();
                    if let Ok(value) = retry_after.to_string().parse() {
                        response.headers_mut().insert(header::RETRY_AFTER, value);
                    }
                    Ok(response)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limiter(per_minute: u32, burst: u32) -> ClientRateLimiter {
        let config = RateLimitConfig::builder()
            .per_minute(per_minute)
            .burst(burst)
            .max_clients(1024)
            .build();
        ClientRateLimiter::new(&config).unwrap()
    }

    #[test]
    fn test_burst_admitted_then_denied() {
        let limiter = limiter(60, 5);

        for i in 0..5 {
            assert!(
                limiter.check("192.168.1.1").is_ok(),
                "request {} should be admitted",
                i + 1
            );
        }
        assert!(
            limiter.check("192.168.1.1").is_err(),
            "request after burst should be denied"
        );
    }

    #[test]
    fn test_denied_client_readmitted_after_refill() {
        // 60/min refills one token per second.
        let limiter = limiter(60, 5);

        for _ in 0..5 {
            limiter.check("192.168.1.1").unwrap();
        }
        assert!(limiter.check("192.168.1.1").is_err());

        std::thread::sleep(Duration::from_millis(1100));
        assert!(
            limiter.check("192.168.1.1").is_ok(),
            "one token should have refilled after a second"
        );
    }

    #[test]
    fn test_clients_do_not_contend() {
        let limiter = limiter(60, 5);

        for _ in 0..5 {
            limiter.check("192.168.1.1").unwrap();
        }
        assert!(limiter.check("192.168.1.1").is_err());
        assert!(
            limiter.check("192.168.1.2").is_ok(),
            "a different client has its own bucket"
        );
    }

    #[test]
    fn test_denial_reports_wait_seconds() {
        let limiter = limiter(60, 1);

        limiter.check("192.168.1.1").unwrap();
        let retry_after = limiter.check("192.168.1.1").unwrap_err();
        assert!(retry_after >= 1);
        assert!(retry_after <= 60);
    }

    #[test]
    fn test_tracked_clients_counts_distinct_keys() {
        let limiter = limiter(60, 5);

        for i in 0..10 {
            limiter.check(&format!("10.0.0.{i}")).unwrap();
        }
        assert_eq!(limiter.tracked_clients(), 10);
    }

    #[test]
    fn test_store_never_exceeds_max_clients() {
        // A flood of distinct identities (e.g. forged X-Forwarded-For values)
        // must not grow the store past its configured capacity.
        let config = RateLimitConfig::builder()
            .per_minute(60)
            .burst(5)
            .max_clients(8)
            .build();
        let limiter = ClientRateLimiter::new(&config).unwrap();

        for i in 0..1000 {
            let client = format!("10.{}.{}.{}", i / 65536, (i / 256) % 256, i % 256);
            let _ = limiter.check(&client);
        }

        let tracked = limiter.tracked_clients();
        assert!(
            tracked <= 8,
            "store exceeded max_clients=8: tracking {tracked} keys"
        );
    }

    #[test]
    fn test_evicted_client_is_readmitted_with_fresh_state() {
        // Capacity 1: each new identity evicts the previous one, whose burst
        // resets on return.
        let config = RateLimitConfig::builder()
            .per_minute(60)
            .burst(1)
            .max_clients(1)
            .build();
        let limiter = ClientRateLimiter::new(&config).unwrap();

        limiter.check("192.168.1.1").unwrap();
        assert!(limiter.check("192.168.1.1").is_err());

        for i in 0..100 {
            let _ = limiter.check(&format!("10.0.0.{i}"));
        }
        limiter.clients.run_pending_tasks();

        assert!(
            limiter.check("192.168.1.1").is_ok(),
            "evicted client should start over with a full burst"
        );
    }

    #[test]
    fn test_invalid_quota_is_fatal() {
        let zero_rate = RateLimitConfig::builder().per_minute(0).build();
        assert!(ClientRateLimiter::new(&zero_rate).is_err());

        let zero_burst = RateLimitConfig::builder().burst(0).build();
        assert!(ClientRateLimiter::new(&zero_burst).is_err());

        let zero_capacity = RateLimitConfig::builder().max_clients(0).build();
        assert!(ClientRateLimiter::new(&zero_capacity).is_err());
    }

    #[test]
    fn test_concurrent_checks() {
        use std::thread;

        let limiter = limiter(6000, 100);

        let mut handles = vec![];
        for i in 0..8 {
            let limiter = limiter.clone();
            handles.push(thread::spawn(move || {
                for j in 0..50 {
                    let client = format!("192.168.{i}.{j}");
                    let _ = limiter.check(&client);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(limiter.check("10.0.0.1").is_ok());
    }
}
