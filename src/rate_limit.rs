//! Fixed-window rate limiting keyed by client IP.
//!
//! Counters live in process memory and reset on restart; separate instances
//! do not share them.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

pub const LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
static X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Counter state for one client.
#[derive(Debug, Clone, Copy)]
struct Window {
    hits: usize,
    reset_at: Instant,
}

#[derive(Debug)]
struct Inner {
    windows: HashMap<IpAddr, Window>,
    next_prune: Instant,
}

/// Where a client stands after a counted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: usize,
    pub remaining: usize,
    pub reset_in: Duration,
    pub exceeded: bool,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    inner: Arc<Mutex<Inner>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let next_prune = Instant::now() + config.window;
        Self {
            config,
            inner: Arc::new(Mutex::new(Inner {
                windows: HashMap::new(),
                next_prune,
            })),
        }
    }

    /// Count a request from `ip`.
    pub fn check(&self, ip: IpAddr) -> RateLimitStatus {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitStatus {
        let window_len = self.config.window;
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if now >= inner.next_prune {
            inner.windows.retain(|_, w| now < w.reset_at);
            inner.next_prune = now + window_len;
        }

        let window = inner.windows.entry(ip).or_insert(Window {
            hits: 0,
            reset_at: now + window_len,
        });
        if now >= window.reset_at {
            *window = Window {
                hits: 0,
                reset_at: now + window_len,
            };
        }
        window.hits += 1;

        RateLimitStatus {
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(window.hits),
            reset_in: window.reset_at.saturating_duration_since(now),
            exceeded: window.hits > self.config.max_requests,
        }
    }

    /// Number of clients currently tracked.
    pub fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .windows
            .len()
    }
}

fn set_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    let reset_at = OffsetDateTime::now_utc() + status.reset_in;
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(status.limit));
    headers.insert(
        X_RATELIMIT_REMAINING.clone(),
        HeaderValue::from(status.remaining),
    );
    headers.insert(
        X_RATELIMIT_RESET.clone(),
        HeaderValue::from(reset_at.unix_timestamp()),
    );
}

/// Rejects clients over their quota with 429.
///
/// Requests without connection info (e.g. in-process tests) share one bucket.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let status = limiter.check(ip);

    if status.exceeded {
        warn!(ip = %ip, limit = status.limit, "rate limit exceeded");
        let mut response = (StatusCode::TOO_MANY_REQUESTS, LIMIT_MESSAGE).into_response();
        set_headers(response.headers_mut(), &status);
        let retry_after = status.reset_in.as_secs() + u64::from(status.reset_in.subsec_nanos() > 0);
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    debug!(ip = %ip, remaining = status.remaining, "rate limit check passed");
    let mut response = next.run(request).await;
    set_headers(response.headers_mut(), &status);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window: Duration::from_secs(window_secs),
            max_requests,
        })
    }

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = limiter(100, 900);
        let now = Instant::now();
        for i in 0..100 {
            let status = limiter.check_at(ip(1), now);
            assert!(!status.exceeded, "request {} should pass", i + 1);
            assert_eq!(status.remaining, 99 - i);
        }
        let status = limiter.check_at(ip(1), now);
        assert!(status.exceeded);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn clients_are_counted_separately() {
        let limiter = limiter(1, 900);
        let now = Instant::now();
        assert!(!limiter.check_at(ip(1), now).exceeded);
        assert!(limiter.check_at(ip(1), now).exceeded);
        assert!(!limiter.check_at(ip(2), now).exceeded);
    }

    #[test]
    fn window_resets_after_its_length() {
        let limiter = limiter(1, 900);
        let start = Instant::now();
        assert!(!limiter.check_at(ip(1), start).exceeded);
        assert!(limiter.check_at(ip(1), start + Duration::from_secs(899)).exceeded);

        let status = limiter.check_at(ip(1), start + Duration::from_secs(900));
        assert!(!status.exceeded);
        assert_eq!(status.reset_in, Duration::from_secs(900));
    }

    #[test]
    fn window_is_fixed_from_first_hit() {
        let limiter = limiter(5, 900);
        let start = Instant::now();
        limiter.check_at(ip(1), start);
        let status = limiter.check_at(ip(1), start + Duration::from_secs(600));
        assert_eq!(status.reset_in, Duration::from_secs(300));
    }

    #[test]
    fn expired_windows_are_pruned() {
        let limiter = limiter(5, 900);
        let start = Instant::now();
        limiter.check_at(ip(1), start);
        limiter.check_at(ip(2), start);
        assert_eq!(limiter.tracked(), 2);

        limiter.check_at(ip(3), start + Duration::from_secs(2000));
        assert_eq!(limiter.tracked(), 1);
    }

    #[test]
    fn keeps_counting_after_a_panicking_holder() {
        let limiter = limiter(1, 900);
        let now = Instant::now();
        limiter.check_at(ip(1), now);

        let poisoner = limiter.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(limiter.inner.is_poisoned());

        assert!(limiter.check_at(ip(1), now).exceeded);
        assert!(!limiter.check_at(ip(2), now).exceeded);
        assert_eq!(limiter.tracked(), 2);
    }
}
