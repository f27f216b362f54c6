//! In-memory [`RangeFetcher`] for tests, behind the `test-util` feature.
//!
//! Serves byte ranges of registered blobs and can be told to misbehave for
//! particular URLs.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{FetchError, FetchResult};
use super::fetch::{ContentRange, FetchResponse, RangeFetcher};
use crate::integrity::ByteRange;

/// Misbehaviour injected for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Answer every request with this status and an empty body.
    Status(u16),
    /// The request never produces a response.
    Unreachable,
    /// Ignore the `Range` header and serve the whole blob with 200.
    IgnoreRange,
    /// Announce the requested range but send only half of it.
    ShortBody,
    /// Send one byte more than the requested range.
    ExtraByte,
}

/// Fetcher backed by a map of URL to contents.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    blobs: HashMap<String, Arc<Vec<u8>>>,
    redirects: HashMap<String, String>,
    faults: Mutex<HashMap<String, Fault>>,
    requests: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` at `url`.
    pub fn with_blob(mut self, url: impl Into<String>, data: Vec<u8>) -> Self {
        self.blobs.insert(url.into(), Arc::new(data));
        self
    }

    /// Redirect `from` to `to`.
    pub fn with_redirect(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.redirects.insert(from.into(), to.into());
        self
    }

    /// Misbehave for `url` until [`clear_fault`](Self::clear_fault).
    pub fn with_fault(self, url: impl Into<String>, fault: Fault) -> Self {
        self.faults.lock().insert(url.into(), fault);
        self
    }

    pub fn clear_fault(&self, url: &str) {
        self.faults.lock().remove(url);
    }

    /// Number of fetches served so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn respond(status: u16, final_url: &str, body: Vec<u8>, range: Option<ContentRange>) -> FetchResponse {
        FetchResponse {
            status,
            content_range: range,
            content_length: Some(body.len() as u64),
            final_url: final_url.to_string(),
            body: Box::new(Cursor::new(body)),
        }
    }
}

impl RangeFetcher for MemoryFetcher {
    fn fetch(&self, url: &str, range: Option<ByteRange>) -> FetchResult<FetchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let target = self.redirects.get(url).map(String::as_str).unwrap_or(url);
        let fault = self.faults.lock().get(url).copied();

        match fault {
            Some(Fault::Unreachable) => {
                return Err(FetchError::Request {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
            }
            Some(Fault::Status(status)) => return Ok(Self::respond(status, target, Vec::new(), None)),
            _ => {}
        }

        let Some(blob) = self.blobs.get(target) else {
            return Ok(Self::respond(404, target, Vec::new(), None));
        };
        let total = blob.len() as u64;

        let range = match (range, fault) {
            (None, _) | (_, Some(Fault::IgnoreRange)) => {
                return Ok(Self::respond(200, target, blob.to_vec(), None));
            }
            (Some(range), _) => range,
        };

        if range.start >= total {
            return Ok(Self::respond(416, target, Vec::new(), None));
        }
        let served = ByteRange::new(range.start, range.end.min(total - 1));
        let mut body = blob[served.start as usize..=served.end as usize].to_vec();
        let content_range = Some(ContentRange {
            range: served,
            total: Some(total),
        });

        let mut response = match fault {
            Some(Fault::ShortBody) => {
                body.truncate(body.len() / 2);
                Self::respond(206, target, body, content_range)
            }
            Some(Fault::ExtraByte) => {
                body.push(0);
                Self::respond(206, target, body, content_range)
            }
            _ => Self::respond(206, target, body, content_range),
        };
        if matches!(fault, Some(Fault::ShortBody | Fault::ExtraByte)) {
            response.content_length = None;
        }
        Ok(response)
    }
}
