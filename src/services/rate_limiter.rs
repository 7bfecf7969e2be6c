//! Rate limiting and retry logic for upstream catalog calls
//!
//! Provides a rate-limited HTTP client and a bounded fixed-wait retry
//! helper for throttling and transient failures.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::config::RetryConfig;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst capacity (allows short bursts above the rate)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2,
            burst_size: 5,
        }
    }
}

/// A rate-limited HTTP client wrapper
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    pub fn new(name: &str, config: RateLimitConfig) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        let limiter = Arc::new(RateLimiter::direct(quota));

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            limiter,
            name: name.to_string(),
        }
    }

    /// Client tuned for the upstream catalog service.
    /// The catalog allows ~20 requests per 10 seconds, so ~2/sec with burst of 5.
    pub fn for_catalog() -> Self {
        Self::new(
            "catalog",
            RateLimitConfig {
                requests_per_second: 2,
                burst_size: 5,
            },
        )
    }

    /// Wait for rate limit and make a GET request
    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request");

        self.client.get(url).send().await
    }

    /// Wait for a rate limit permit
    pub async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

impl RetryExt for RetryConfig {
    fn to_backoff(&self) -> Constant {
        Constant::new(self.wait)
    }
}

/// Conversion from the configured retry policy to a backoff strategy
pub trait RetryExt {
    fn to_backoff(&self) -> Constant;
}

/// Execute an HTTP operation, retrying throttled and transient outcomes.
///
/// Retried outcomes are network-level errors and responses whose status is
/// transient (429, 408, 5xx). The policy is bounded: after `max_retries`
/// retries the last outcome is returned as-is, so an exhausted 429 surfaces
/// to the caller as a normal non-success response.
pub async fn retry_transient<F, Fut>(
    operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> reqwest::Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = reqwest::Result<Response>>,
{
    let mut tries = 0u32;
    let mut backoff = config.to_backoff();

    loop {
        let outcome = operation().await;
        tries += 1;

        let transient = match &outcome {
            Ok(response) => response.is_transient_error(),
            // Network-level failures are always worth another try.
            Err(_) => true,
        };

        if !transient || tries > config.max_retries {
            return outcome;
        }

        if let Some(wait) = backoff.next_backoff() {
            warn!(
                operation = %operation_name,
                attempt = tries,
                retry_in_ms = wait.as_millis() as u64,
                "Transient upstream failure, retrying"
            );
            tokio::time::sleep(wait).await;
        } else {
            return outcome;
        }
    }
}

/// Helper trait for classifying HTTP responses that should be retried
pub trait ResponseExt {
    /// Check if the response indicates rate limiting (429)
    fn is_rate_limited(&self) -> bool;

    /// Check if the response indicates a transient error that should be retried
    fn is_transient_error(&self) -> bool;
}

impl ResponseExt for Response {
    fn is_rate_limited(&self) -> bool {
        self.status().as_u16() == 429
    }

    fn is_transient_error(&self) -> bool {
        let status = self.status().as_u16();
        // 429 (rate limit), 500-599 (server errors), 408 (timeout)
        status == 429 || status == 408 || (500..600).contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.requests_per_second, 2);
        assert_eq!(config.burst_size, 5);
    }

    #[test]
    fn constant_backoff_keeps_fixed_wait() {
        let config = RetryConfig {
            max_retries: 2,
            wait: Duration::from_secs(7),
        };
        let mut backoff = config.to_backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(7)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(7)));
    }
}
