//! Wait-and-retry-once handling of GitHub rate limiting

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::info;

use crate::api::GitHubApi;
use crate::error::ApiError;

/// Time to wait for a quota reset at `reset_at`, plus `margin`.
///
/// A reset time that already passed yields just whatever is left of the margin.
pub fn wait_until_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>, margin: Duration) -> Duration {
    let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
    (reset_at - now + margin).to_std().unwrap_or(Duration::ZERO)
}

/// Runs a fetch and, if GitHub reports the rate limit as exceeded, sleeps until
/// the quota resets and runs it exactly once more.
///
/// A second rate-limit error is returned to the caller.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitGuard {
    margin: Duration,
}

impl RateLimitGuard {
    pub fn new(margin: Duration) -> Self {
        Self { margin }
    }

    pub async fn run<T, E, F, Fut>(&self, api: &dyn GitHubApi, mut fetch: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ApiError> + AsRateLimited,
    {
        match fetch().await {
            Err(e) if e.is_rate_limited() => {
                let rate_limit = api.rate_limit().await?;
                info!("Rate limit remaining: {}.", rate_limit.remaining);

                let wait = wait_until_reset(rate_limit.reset_at, Utc::now(), self.margin);
                let secs = wait.as_secs();
                info!(
                    "Waiting {}min(s) {}sec(s) until rate limit resets.",
                    secs / 60,
                    secs % 60
                );
                tokio::time::sleep(wait).await;

                fetch().await
            }
            result => result,
        }
    }
}

/// Errors that can carry a rate-limit signal
pub trait AsRateLimited {
    fn is_rate_limited(&self) -> bool;
}

impl AsRateLimited for ApiError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited(_))
    }
}

impl AsRateLimited for crate::error::AuditError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, crate::error::AuditError::Api(e) if e.is_rate_limited())
    }
}
