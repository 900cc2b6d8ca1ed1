use actix_web::HttpRequest;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::{FailMode, RateLimitSettings};
use crate::db::CounterStore;
use crate::error::{AppError, AuthError};

const KEY_PREFIX: &str = "rate_limit:";
const EDGE_PROXY_HEADER: &str = "CF-Connecting-IP";
const FORWARDED_FOR_HEADER: &str = "X-Forwarded-For";

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub limit: u32,
    pub window_size: Duration,
    pub fail_mode: FailMode,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window_size: Duration::seconds(60),
            fail_mode: FailMode::Open,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            limit: settings.requests,
            window_size: Duration::seconds(settings.period_seconds as i64),
            fail_mode: settings.fail_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Rejected,
}

#[derive(Debug)]
struct RequestWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl RequestWindow {
    fn new(timestamps: Vec<DateTime<Utc>>) -> Self {
        Self { timestamps }
    }

    fn cleanup_old_requests(&mut self, now: DateTime<Utc>, window_size: Duration) {
        let cutoff = now - window_size;
        self.timestamps.retain(|ts| *ts > cutoff);
    }

    fn add_request(&mut self, now: DateTime<Utc>) {
        self.timestamps.push(now);
    }

    fn request_count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Sliding-window limiter over a shared [`CounterStore`].
///
/// The fetch/filter/append/store sequence is not atomic: concurrent requests
/// from one client can each read the same window and all get through. This is
/// a soft limit, overshooting by at most the number of overlapping requests.
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub async fn check_and_record(
        &self,
        client_id: &str,
        limit: u32,
        window_size: Duration,
    ) -> RateLimitDecision {
        self.check_and_record_at(client_id, limit, window_size, Utc::now()).await
    }

    pub async fn check_and_record_at(
        &self,
        client_id: &str,
        limit: u32,
        window_size: Duration,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        match self.try_check_and_record(client_id, limit, window_size, now).await {
            Ok(decision) => decision,
            Err(e) => {
                let decision = match self.config.fail_mode {
                    FailMode::Open => RateLimitDecision::Allowed,
                    FailMode::Closed => RateLimitDecision::Rejected,
                };
                error!(
                    "Counter store unavailable for {} ({:?}, failing {:?}): {}",
                    client_id, decision, self.config.fail_mode, e
                );
                decision
            }
        }
    }

    async fn try_check_and_record(
        &self,
        client_id: &str,
        limit: u32,
        window_size: Duration,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, AppError> {
        let key = format!("{}{}", KEY_PREFIX, client_id);
        let mut window = RequestWindow::new(self.store.get(&key).await?.unwrap_or_default());

        window.cleanup_old_requests(now, window_size);

        if window.request_count() >= limit as usize {
            return Ok(RateLimitDecision::Rejected);
        }

        window.add_request(now);
        self.store.set(&key, &window.timestamps, window_size).await?;
        Ok(RateLimitDecision::Allowed)
    }

    /// Gates an HTTP request with the configured limit, keyed on the caller.
    pub async fn check(&self, req: &HttpRequest) -> Result<(), AppError> {
        let client_id = client_identity(req);
        let decision = self
            .check_and_record(&client_id, self.config.limit, self.config.window_size)
            .await;

        match decision {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::Rejected => {
                warn!("Rate limit exceeded for client {}", client_id);
                Err(AuthError::RateLimited {
                    limit: self.config.limit,
                    period: self.config.window_size.num_seconds() as u64,
                }
                .into())
            }
        }
    }

    pub async fn cleanup(&self) -> Result<u64, AppError> {
        self.store.purge_expired().await
    }
}

/// Edge-proxy header, then the first `X-Forwarded-For` hop, then the peer
/// address. The first non-empty value wins.
pub fn client_identity(req: &HttpRequest) -> String {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    header(EDGE_PROXY_HEADER)
        .or_else(|| {
            header(FORWARDED_FOR_HEADER).and_then(|v| {
                v.split(',')
                    .next()
                    .map(str::trim)
                    .filter(|first| !first.is_empty())
                    .map(str::to_string)
            })
        })
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
