//! HTTP implementation of [`RangeFetcher`].
//!
//! A thin wrapper around a blocking `reqwest` client. Session handling is
//! left to the caller, who can pass default headers (for example a cookie
//! header from an existing login).

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_RANGE, RANGE};

use super::error::{FetchError, FetchResult};
use super::fetch::{parse_content_range, FetchResponse, RangeFetcher};
use crate::integrity::ByteRange;

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// HTTP-based range fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    pub(crate) timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> FetchResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a fetcher with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> FetchResult<Self> {
        Self::with_headers(timeout, HeaderMap::new())
    }

    /// Create a fetcher that sends `headers` with every request.
    pub fn with_headers(timeout: Duration, headers: HeaderMap) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("shelfsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn request_error(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl RangeFetcher for HttpFetcher {
    fn fetch(&self, url: &str, range: Option<ByteRange>) -> FetchResult<FetchResponse> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range.to_header());
        }

        let response = request.send().map_err(|e| self.request_error(url, e))?;

        let content_range = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        Ok(FetchResponse {
            status: response.status().as_u16(),
            content_range,
            content_length: response.content_length(),
            final_url: response.url().to_string(),
            body: Box::new(response),
        })
    }

    fn resolve(&self, url: &str) -> FetchResult<String> {
        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| self.request_error(url, e))?;

        if !response.status().is_success() {
            return Err(FetchError::Request {
                url: url.to_string(),
                reason: format!("HEAD request failed with status {}", response.status()),
            });
        }

        Ok(response.url().to_string())
    }
}
