//! HTTP transport shared by the indexer and chain RPC clients, with
//! bounded retries and exponential backoff for idempotent reads.

use crate::config::ClientConfig;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Ceiling for a single retry delay.
const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("api error: status {0} body {1}")]
    Api(u16, String),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("url: {0}")]
    Url(#[from] url::ParseError),
}

impl FetchError {
    /// Network failures, throttling and server-side errors are worth another
    /// attempt; everything else will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Request(e) => !e.is_builder() && !e.is_decode(),
            FetchError::Api(status, _) => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            _ => false,
        }
    }
}

pub(crate) struct Fetcher {
    client: reqwest::Client,
    max_attempts: u32,
    retry_backoff_ms: u64,
    request_count: AtomicU64,
}

impl Fetcher {
    pub(crate) fn new(config: &ClientConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            max_attempts: config.max_attempts.max(1),
            retry_backoff_ms: config.retry_backoff_ms,
            request_count: AtomicU64::new(0),
        })
    }

    /// GET that treats 404 as absence rather than failure.
    pub(crate) async fn get_optional(&self, url: &Url) -> Result<Option<String>, FetchError> {
        self.request(url, None, true).await
    }

    pub(crate) async fn post_json(&self, url: &Url, body: &Value) -> Result<String, FetchError> {
        match self.request(url, Some(body), false).await? {
            Some(text) => Ok(text),
            None => Err(FetchError::Api(StatusCode::NOT_FOUND.as_u16(), String::new())),
        }
    }

    async fn request(
        &self,
        url: &Url,
        body: Option<&Value>,
        missing_ok: bool,
    ) -> Result<Option<String>, FetchError> {
        let mut last_err = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let ms = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(attempt, ms, %url, "retry after error");
                tokio::time::sleep(Duration::from_millis(ms)).await;
            }
            self.request_count.fetch_add(1, Ordering::Relaxed);
            let res = match body {
                Some(b) => self.client.post(url.clone()).json(b).send().await,
                None => self.client.get(url.clone()).send().await,
            };
            let err = match res {
                Ok(r) => {
                    let status = r.status();
                    if status == StatusCode::NOT_FOUND && missing_ok {
                        debug!(%url, "not found");
                        return Ok(None);
                    }
                    match r.text().await {
                        Ok(text) if status.is_success() => return Ok(Some(text)),
                        Ok(text) => FetchError::Api(status.as_u16(), text),
                        Err(e) => FetchError::Request(e),
                    }
                }
                Err(e) => FetchError::Request(e),
            };
            if !err.is_retryable() {
                return Err(err);
            }
            last_err = Some(err);
        }
        Err(last_err.unwrap_or(FetchError::Api(0, "unknown".to_string())))
    }

    pub(crate) fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt - 1)`,
/// saturating and capped at [`MAX_BACKOFF_MS`].
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Append path segments to an endpoint, keeping any base path it carries.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, FetchError> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}
