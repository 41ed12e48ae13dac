//! Per-client request throttling.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;

use super::AppState;
use crate::config::Config;
use crate::error::ApiError;

/// Expired windows are dropped once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_requests: config.rate_limit_max,
            window: Duration::from_secs(config.rate_limit_window_secs),
        }
    }
}

#[cfg(test)]
impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client address.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request for `key`. When the window is used up, returns how
    /// long until it resets.
    pub async fn allow(&self, key: &str) -> Result<(), Duration> {
        self.allow_at(key, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let window = self.config.window;
        let mut windows = self.windows.lock().await;

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, w| now.saturating_duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(entry.started) >= window {
            entry.started = now;
            entry.count = 0;
        }

        if entry.count >= self.config.max_requests {
            return Err(window.saturating_sub(now.saturating_duration_since(entry.started)));
        }
        entry.count += 1;
        Ok(())
    }
}

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rejects clients that exceeded their request budget with 429.
pub async fn rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);

    if let Err(retry_after) = state.limiter.allow(&key).await {
        tracing::warn!(client = %key, "rate limit exceeded");
        return Err(ApiError::TooManyRequests {
            retry_after_secs: retry_after.as_secs().max(1),
        });
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn budget_is_per_client() {
        let limiter = limiter(2);
        let now = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", now).await.is_ok());
        assert!(limiter.allow_at("10.0.0.1", now).await.is_ok());
        assert!(limiter.allow_at("10.0.0.1", now).await.is_err());
        assert!(limiter.allow_at("10.0.0.2", now).await.is_ok());
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = limiter(1);
        let start = Instant::now();

        assert!(limiter.allow_at("a", start).await.is_ok());
        let wait = limiter.allow_at("a", start + Duration::from_secs(20)).await.unwrap_err();
        assert_eq!(wait, Duration::from_secs(40));

        assert!(limiter.allow_at("a", start + Duration::from_secs(60)).await.is_ok());
    }

    #[test]
    fn connect_info_identifies_the_client() {
        let mut req = Request::new(axum::body::Body::empty());
        assert_eq!(client_key(&req), "unknown");

        let addr: SocketAddr = "192.168.1.20:51000".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_key(&req), "192.168.1.20");
    }
}
