//! Application configuration management

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

/// Cadence at which previously-ingested shows are re-checked against the
/// upstream `since` delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalePeriod {
    /// Test-only value: sleeps briefly instead of a real period.
    None,
    Day,
    Week,
    Month,
}

impl StalePeriod {
    /// Query value for the upstream `updates/shows?since=` endpoint.
    ///
    /// `None` has no incremental equivalent upstream and falls back to the
    /// full catalog.
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            StalePeriod::None => None,
            StalePeriod::Day => Some("day"),
            StalePeriod::Week => Some("week"),
            StalePeriod::Month => Some("month"),
        }
    }

    /// Wall-clock hours to sleep between stale-refresh passes.
    ///
    /// Returns `None` for the test-only [`StalePeriod::None`], which sleeps
    /// a fixed minimal interval instead.
    pub fn sleep_hours(self) -> Option<u32> {
        match self {
            StalePeriod::None => None,
            StalePeriod::Day => Some(24),
            StalePeriod::Week => Some(168),
            StalePeriod::Month => Some(730),
        }
    }
}

impl FromStr for StalePeriod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(StalePeriod::None),
            "day" => Ok(StalePeriod::Day),
            "week" => Ok(StalePeriod::Week),
            "month" => Ok(StalePeriod::Month),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StalePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StalePeriod::None => "none",
            StalePeriod::Day => "day",
            StalePeriod::Week => "week",
            StalePeriod::Month => "month",
        };
        f.write_str(s)
    }
}

/// Bounded fixed-wait retry policy for upstream catalog calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Fixed wait between attempts.
    pub wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            wait: Duration::from_secs(10),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Database URL (PostgreSQL)
    pub database_url: String,

    /// Base URL of the upstream catalog service
    pub catalog_base_url: String,

    /// Maximum pending fetches enqueued (and popped) per cycle
    pub fetch_batch_limit: usize,

    /// Stale-refresh cadence
    pub stale_refresh_period: StalePeriod,

    /// Retry policy for throttled/transient upstream responses
    pub retry: RetryConfig,

    /// Page size cap for the read-only shows API
    pub max_entries_per_page: i64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required")?;

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3100".to_string())
                .parse()
                .context("Invalid PORT")?,

            database_url,

            catalog_base_url: env::var("CATALOG_BASE_URL")
                .unwrap_or_else(|_| "https://api.tvmaze.com".to_string()),

            fetch_batch_limit: setting_or_default("FETCH_BATCH_LIMIT", 10),

            stale_refresh_period: setting_or_default("STALE_REFRESH_PERIOD", StalePeriod::Day),

            retry: RetryConfig {
                max_retries: setting_or_default("RETRY_MAX_ATTEMPTS", 3),
                wait: Duration::from_secs(setting_or_default("RETRY_WAIT_SECS", 10)),
            },

            max_entries_per_page: setting_or_default("MAX_ENTRIES_PER_PAGE", 25),
        })
    }
}

/// Read an optional setting, recovering to `default` with a warning when the
/// variable is missing or unparseable. Never fatal.
fn setting_or_default<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    match env::var(key).ok().and_then(|v| v.parse().ok()) {
        Some(value) => value,
        None => {
            warn!(
                "Setting {} not found, using default value {}.",
                key, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_period_parses_case_insensitively() {
        assert_eq!("Day".parse(), Ok(StalePeriod::Day));
        assert_eq!("WEEK".parse(), Ok(StalePeriod::Week));
        assert_eq!("month".parse(), Ok(StalePeriod::Month));
        assert_eq!("none".parse(), Ok(StalePeriod::None));
        assert_eq!("fortnight".parse::<StalePeriod>(), Err(()));
    }

    #[test]
    fn stale_period_sleep_table() {
        assert_eq!(StalePeriod::Day.sleep_hours(), Some(24));
        assert_eq!(StalePeriod::Week.sleep_hours(), Some(168));
        assert_eq!(StalePeriod::Month.sleep_hours(), Some(730));
        assert_eq!(StalePeriod::None.sleep_hours(), None);
    }

    #[test]
    fn stale_period_query_values() {
        assert_eq!(StalePeriod::Day.as_query(), Some("day"));
        assert_eq!(StalePeriod::None.as_query(), None);
    }

    #[test]
    fn unrecognized_setting_falls_back_to_default() {
        // set_var is unsafe on edition 2024; this key is private to this test.
        unsafe { env::set_var("TEST_STALE_FALLBACK", "SomeRandomValue") };
        let period: StalePeriod = setting_or_default("TEST_STALE_FALLBACK", StalePeriod::Day);
        assert_eq!(period, StalePeriod::Day);
    }

    #[test]
    fn missing_setting_falls_back_to_default() {
        let limit: usize = setting_or_default("TEST_MISSING_LIMIT", 10);
        assert_eq!(limit, 10);
    }

    #[test]
    fn retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.wait, Duration::from_secs(10));
    }
}
