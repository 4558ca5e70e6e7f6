//! HTTP client for the published spreadsheet CSV feed.

use std::time::Duration;

use reqwest::Client;
use vitrine_core::FeedSettings;

use crate::error::CatalogError;
use crate::retry::retry_with_backoff;

/// Seconds to report when a 429 response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Downloads the CSV feed as text.
///
/// Transient errors (429, network failures, 5xx) are retried with
/// exponential backoff up to `max_retries` additional attempts.
pub struct FeedClient {
    client: Client,
    url: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl std::fmt::Debug for FeedClient {
    // The published feed URL acts as a bearer secret.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedClient")
            .field("url", &"[redacted]")
            .field("max_retries", &self.max_retries)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .finish_non_exhaustive()
    }
}

impl FeedClient {
    /// Creates a client with the given timeout, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a client from feed settings. Returns `Ok(None)` when no URL is
    /// configured.
    ///
    /// # Errors
    ///
    /// Same as [`FeedClient::new`].
    pub fn from_settings(settings: &FeedSettings) -> Result<Option<Self>, CatalogError> {
        settings
            .url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    settings.request_timeout_secs,
                    &settings.user_agent,
                    settings.max_retries,
                    settings.retry_backoff_base_secs,
                )
            })
            .transpose()
    }

    /// Fetches the feed body.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::RateLimited`]: HTTP 429 after all retries.
    /// - [`CatalogError::UnexpectedStatus`]: any other non-2xx status (5xx retried).
    /// - [`CatalogError::Http`]: network or TLS failure after all retries.
    pub async fn fetch_csv(&self) -> Result<String, CatalogError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, move || async move {
            let response = self
                .client
                .get(&self.url)
                .header(reqwest::header::ACCEPT, "text/csv,text/plain;q=0.9,*/*;q=0.5")
                .header(reqwest::header::CACHE_CONTROL, "no-cache")
                .send()
                .await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                return Err(CatalogError::RateLimited { retry_after_secs });
            }

            if !status.is_success() {
                return Err(CatalogError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: redact_query(&self.url),
                });
            }

            Ok(response.text().await?)
        })
        .await
    }
}

/// Drops the query string so feed tokens never reach logs or error bodies.
fn redact_query(url: &str) -> String {
    url.split_once('?')
        .map_or_else(|| url.to_owned(), |(base, _)| base.to_owned())
}
