//! The authenticated fetch capability.
//!
//! How a session is established is not this crate's business; it only needs
//! something that can GET a URL, optionally restricted to a byte range, and
//! describe what the server actually served.

use std::fmt;
use std::io::Read;

use super::error::{FetchError, FetchResult};
use crate::integrity::ByteRange;

/// A parsed `Content-Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub range: ByteRange,
    /// Complete length, if the server stated it.
    pub total: Option<u64>,
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "bytes {}/{}", self.range, total),
            None => write!(f, "bytes {}/*", self.range),
        }
    }
}

/// Parse a `Content-Range` header such as `bytes 0-99/1000`.
pub fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    if end < start {
        return None;
    }
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some(ContentRange {
        range: ByteRange::new(start, end),
        total,
    })
}

/// Response to a fetch.
pub struct FetchResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Range the server says it served.
    pub content_range: Option<ContentRange>,
    /// Body length the server announced.
    pub content_length: Option<u64>,
    /// URL after redirects.
    pub final_url: String,
    /// Response body.
    pub body: Box<dyn Read + Send>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_range", &self.content_range)
            .field("content_length", &self.content_length)
            .field("final_url", &self.final_url)
            .finish()
    }
}

/// Capability to perform authenticated GETs.
pub trait RangeFetcher: Send + Sync {
    /// GET `url`, restricted to `range` when given.
    fn fetch(&self, url: &str, range: Option<ByteRange>) -> FetchResult<FetchResponse>;

    /// Follow redirects for `url` and return the final URL.
    fn resolve(&self, url: &str) -> FetchResult<String> {
        let response = self.fetch(url, Some(ByteRange::new(0, 0)))?;
        if !response.is_success() {
            return Err(FetchError::Request {
                url: url.to_string(),
                reason: format!("status {}", response.status),
            });
        }
        Ok(response.final_url)
    }
}

/// Last path segment of a URL, without query or fragment.
///
/// Used to recover a file name when the catalog only has a redirecting
/// download link.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let without_fragment = url.split('#').next()?;
    let path = without_fragment.split('?').next()?;
    let path = path.split_once("://").map(|(_, rest)| rest).unwrap_or(path);
    let (_, tail) = path.split_once('/')?;
    let name = tail.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}
