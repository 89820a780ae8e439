//! Per-IP fixed-window rate limiting.
//!
//! Applied to every route ahead of authentication. Requests without a known
//! peer address share one bucket.

use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tracing::warn;

use crate::{config::RateLimitConfig, error::AppError};

#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

struct Window {
    count: u32,
    started: Instant,
}

#[derive(Debug, PartialEq, Eq)]
enum Decision {
    Allowed,
    Exceeded { retry_after: Duration },
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn check(&self, ip: IpAddr) -> Decision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Decision {
        let window = self.config.window();
        let mut state = self.state.lock();
        let entry = state.entry(ip).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= window {
            entry.count = 0;
            entry.started = now;
        }
        entry.count = entry.count.saturating_add(1);

        if entry.count > self.config.max_requests {
            Decision::Exceeded {
                retry_after: entry
                    .started
                    .checked_add(window)
                    .map_or(window, |end| end.saturating_duration_since(now)),
            }
        } else {
            Decision::Allowed
        }
    }

    /// Drops windows that have already expired.
    pub fn sweep(&self) {
        let window = self.config.window();
        let now = Instant::now();
        self.state
            .lock()
            .retain(|_, entry| now.duration_since(entry.started) < window);
    }

    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.state.lock().len()
    }

    /// Periodic sweeper for the lifetime of the process.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        let period = self
            .config
            .window()
            .clamp(Duration::from_secs(1), Duration::from_secs(3600));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limiter.check(ip) {
        Decision::Allowed => next.run(request).await,
        Decision::Exceeded { retry_after } => {
            let secs = retry_after.as_secs().max(1);
            warn!(%ip, retry_after_secs = secs, "rate limit exceeded");
            let mut res = AppError::RateLimited.into_response();
            if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(RETRY_AFTER, v);
            }
            res
        }
    }
}
