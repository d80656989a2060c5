//! Rate-limited HTTP fetcher
//!
//! This module handles all plain-HTTP requests for the pipeline, including:
//! - Building a browser-like HTTP client shared by all fetches
//! - Enforcing a minimum interval between issued requests
//! - Bounded exponential-backoff retries on transient failures
//! - Absence-not-fault results: a terminal failure yields `None`
//!
//! Only GET is exposed, so automatic retries stay confined to an
//! idempotent method.

use crate::config::FetcherConfig;
use crate::ShelfrankError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// HTTP statuses retried with backoff before giving up
const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Builds the shared HTTP client with browser-like default headers
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(ShelfrankError)` - Failed to build the client or its headers
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, ShelfrankError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    if let Ok(referer) = HeaderValue::from_str(&config.referer) {
        headers.insert(REFERER, referer);
    }

    let client = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// HTTP fetcher enforcing a minimum inter-request interval
///
/// The interval is measured against the issue time of the previous request,
/// whichever logical caller issued it: there is a single shared clock, and
/// every attempt (retries included) advances it. Requests therefore also
/// serialize across concurrent callers.
pub struct RateLimitedFetcher {
    client: Client,
    min_interval: Duration,
    max_retries: u32,
    backoff_base: Duration,
    last_issue: Mutex<Option<Instant>>,
}

impl RateLimitedFetcher {
    /// Creates a fetcher from configuration, building its HTTP client
    pub fn new(config: &FetcherConfig) -> Result<Self, ShelfrankError> {
        Ok(Self {
            client: build_http_client(config)?,
            min_interval: config.rate_limit(),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
            last_issue: Mutex::new(None),
        })
    }

    /// Blocks until the rate-limit slot opens, then claims it
    ///
    /// The clock is held across the sleep so a second caller cannot slip
    /// in between the wait and the claim.
    async fn wait_for_slot(&self) {
        let mut last = self.last_issue.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Issues a rate-limited GET with bounded retries
    ///
    /// Retryable statuses (429, 500, 502, 503, 504) and connection errors
    /// back off exponentially up to the retry bound; other non-2xx
    /// statuses and timeouts give up immediately. Exhausted retries and
    /// terminal failures all yield `None`; no fault propagates past this
    /// boundary.
    pub async fn get(
        &self,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Option<Response> {
        for attempt in 0..=self.max_retries {
            self.wait_for_slot().await;

            let result = self
                .client
                .get(url)
                .query(params)
                .timeout(timeout)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Some(response);
                    }

                    if RETRYABLE_STATUSES.contains(&status) && attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            "HTTP {} from {}, retrying in {:?} (attempt {}/{})",
                            status.as_u16(),
                            url,
                            delay,
                            attempt + 1,
                            self.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    tracing::warn!("GET {} failed with terminal status {}", url, status.as_u16());
                    return None;
                }
                Err(e) => {
                    if e.is_connect() && attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        tracing::warn!(
                            "Connection error for {}: {}, retrying in {:?}",
                            url,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    if e.is_timeout() {
                        tracing::warn!("GET {} timed out", url);
                    } else {
                        tracing::warn!("GET {} failed: {}", url, e);
                    }
                    return None;
                }
            }
        }

        None
    }

    /// Rate-limited GET returning the response body as text
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(String, String)],
        timeout: Duration,
    ) -> Option<String> {
        let response = self.get(url, params, timeout).await?;
        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!("Failed to read body from {}: {}", url, e);
                None
            }
        }
    }

    /// Rate-limited GET returning the response body as bytes
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Option<Vec<u8>> {
        let response = self.get(url, &[], timeout).await?;
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                tracing::warn!("Failed to read bytes from {}: {}", url, e);
                None
            }
        }
    }

    /// Plain GET that bypasses the rate-limit clock (no retries)
    ///
    /// Used for image downloads when `output.rate-limit-images` is off.
    pub async fn get_bytes_unlimited(&self, url: &str, timeout: Duration) -> Option<Vec<u8>> {
        let result = self.client.get(url).timeout(timeout).send().await;
        match result {
            Ok(response) if response.status().is_success() => response.bytes().await.ok().map(|b| b.to_vec()),
            Ok(response) => {
                tracing::warn!("GET {} failed with status {}", url, response.status().as_u16());
                None
            }
            Err(e) => {
                tracing::warn!("GET {} failed: {}", url, e);
                None
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}
