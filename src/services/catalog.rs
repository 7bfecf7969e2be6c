//! Upstream catalog client
//!
//! Issues HTTP requests against the external TV-show catalog service and
//! returns parsed responses or transport/status errors. All calls go through
//! the bounded retry policy in [`crate::services::rate_limiter`].

use async_trait::async_trait;
pub use reqwest::StatusCode;
use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;

use crate::config::{RetryConfig, StalePeriod};
use crate::services::rate_limiter::{RateLimitedClient, retry_transient};

/// Failure of a single upstream catalog call, after retries.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Non-2xx response. Transient statuses only appear here once the retry
    /// policy is exhausted.
    #[error("catalog responded with status {0}")]
    Status(StatusCode),

    /// Network-level failure after retries.
    #[error("catalog request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to decode catalog response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// One `(show id, upstream update timestamp)` pair reported as new or changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogDeltaEntry {
    pub show_id: i64,
    /// Upstream last-updated time, Unix epoch milliseconds.
    pub updated_at_ms: i64,
}

/// Set of shows the upstream reports as new or changed, in received order.
///
/// The wire format is a JSON object mapping show-id keys to epoch-millis
/// values; key order is preserved so candidates are served first-seen-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogDelta(pub Vec<CatalogDeltaEntry>);

impl CatalogDelta {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[CatalogDeltaEntry] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for CatalogDelta {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DeltaVisitor;

        impl<'de> Visitor<'de> for DeltaVisitor {
            type Value = CatalogDelta;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of show ids to update timestamps")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, updated_at_ms)) = map.next_entry::<String, i64>()? {
                    let show_id = key.parse::<i64>().map_err(|_| {
                        serde::de::Error::custom(format!("non-numeric show id key: {key:?}"))
                    })?;
                    entries.push(CatalogDeltaEntry {
                        show_id,
                        updated_at_ms,
                    });
                }
                Ok(CatalogDelta(entries))
            }
        }

        deserializer.deserialize_map(DeltaVisitor)
    }
}

/// Show detail from the upstream catalog
#[derive(Debug, Clone, Deserialize)]
pub struct ShowDetail {
    pub id: i64,
    pub name: String,
}

/// One cast credit from the upstream catalog, ordered by relevance upstream
#[derive(Debug, Clone, Deserialize)]
pub struct CastEntry {
    pub person: Person,
}

/// Person nested inside a cast credit
#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    pub id: i64,
    pub name: String,
    pub birthday: Option<String>,
}

impl Person {
    /// Parse the upstream `yyyy-MM-dd` birthday, if present and well-formed
    pub fn birthday_date(&self) -> Option<chrono::NaiveDate> {
        self.birthday
            .as_ref()
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// Read side of the upstream catalog service, as the scheduler consumes it.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Full catalog delta (`since` = `None`) or incremental `since` delta.
    async fn show_updates(&self, since: Option<StalePeriod>)
    -> Result<CatalogDelta, CatalogError>;

    /// Detail for one show.
    async fn show_detail(&self, show_id: i64) -> Result<ShowDetail, CatalogError>;

    /// Cast credits for one show, in upstream relevance order.
    async fn show_cast(&self, show_id: i64) -> Result<Vec<CastEntry>, CatalogError>;
}

/// HTTP client for the upstream catalog service
pub struct CatalogClient {
    http: RateLimitedClient,
    base_url: String,
    retry: RetryConfig,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, retry: RetryConfig) -> Self {
        let base_url = base_url.into();
        Self {
            http: RateLimitedClient::for_catalog(),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = retry_transient(|| self.http.get(&url), &self.retry, path)
            .await
            .map_err(CatalogError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }

        let body = response.text().await.map_err(CatalogError::Transport)?;
        serde_json::from_str(&body).map_err(CatalogError::Decode)
    }
}

#[async_trait]
impl CatalogSource for CatalogClient {
    async fn show_updates(
        &self,
        since: Option<StalePeriod>,
    ) -> Result<CatalogDelta, CatalogError> {
        let path = match since.and_then(StalePeriod::as_query) {
            Some(period) => format!("updates/shows?since={period}"),
            None => "updates/shows".to_string(),
        };

        let delta: CatalogDelta = self.get_json(&path).await?;
        debug!(entries = delta.entries().len(), since = ?since, "Fetched catalog delta");
        Ok(delta)
    }

    async fn show_detail(&self, show_id: i64) -> Result<ShowDetail, CatalogError> {
        self.get_json(&format!("shows/{show_id}")).await
    }

    async fn show_cast(&self, show_id: i64) -> Result<Vec<CastEntry>, CatalogError> {
        self.get_json(&format!("shows/{show_id}/cast")).await
    }
}
