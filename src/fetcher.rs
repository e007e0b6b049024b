//! Rate-limited page fetcher.
//!
//! Drives one logical query across all of its pages. The first request
//! carries the query parameters; every later page is requested verbatim from
//! the `Link: <...>; rel="next"` header, since the server may paginate
//! differently after page one.
//!
//! # Rate limiting
//!
//! Every response is checked for `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset` (epoch seconds). When the remaining quota hits zero
//! the fetcher waits until the reset instant before going on. The response
//! that reported the exhaustion is still consumed; only the next request is
//! delayed. The wait is capped and ends early on cancellation.
//!
//! # Failures
//!
//! A non-success status or an unparseable body ends the sequence with an
//! error. There is no retry; the caller decides what to do next.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::traits::PageStream;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota information from one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: Option<u64>,
    /// Unix epoch seconds at which the quota refills.
    pub reset: Option<i64>,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            remaining: header_number(headers, REMAINING_HEADER),
            reset: header_number(headers, RESET_HEADER),
        }
    }

    /// Only an explicit zero counts; a missing header means "unknown".
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// How long to wait at `now` (epoch seconds), clamped to `[0, cap]`.
    pub fn wait_duration(&self, now: i64, cap: Duration) -> Duration {
        if !self.is_exhausted() {
            return Duration::ZERO;
        }
        let secs = self.reset.map(|reset| reset - now).unwrap_or(0).max(0) as u64;
        Duration::from_secs(secs).min(cap)
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Extract the `rel="next"` target from an RFC 8288 `Link` header value.
pub fn parse_next_link(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let target = segments.next()?.trim();
        let is_next = segments.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        let start = target.find('<')? + 1;
        let end = target.rfind('>')?;
        (start < end).then(|| target[start..end].to_string())
    })
}

/// Pull the item list out of a page body.
///
/// Search endpoints wrap results as `{"items": [...]}`; list endpoints
/// return a bare array. An object without `items` is an empty page.
pub fn page_items(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => bail!("'items' is not an array (got {})", json_kind(&other)),
            None => Ok(Vec::new()),
        },
        other => bail!("page body is not an object or array (got {})", json_kind(&other)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Shared HTTP client plus the rate-limit policy.
#[derive(Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    cancel: CancellationToken,
    max_wait: Duration,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client, cancel: CancellationToken, max_wait: Duration) -> Self {
        Self {
            client,
            cancel,
            max_wait,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Start paging through `url`. `params` go on the first request only.
    pub fn pages(&self, url: &str, params: Vec<(String, String)>) -> Pages<'_> {
        Pages {
            fetcher: self,
            next_url: Some(url.to_string()),
            params: Some(params),
            page: 0,
        }
    }

    /// Wait out an exhausted quota. Returns once the reset instant passes,
    /// the cap elapses, or the run is cancelled.
    ///
    /// Returns the wait that was scheduled (zero when none was needed).
    pub async fn honor(&self, limit: RateLimit) -> Duration {
        if !limit.is_exhausted() {
            return Duration::ZERO;
        }
        let wait = limit.wait_duration(chrono::Utc::now().timestamp(), self.max_wait);
        if wait.is_zero() {
            tracing::debug!(reset = ?limit.reset, "rate limit exhausted, reset already passed");
            return wait;
        }

        tracing::info!(
            wait_secs = wait.as_secs(),
            reset = ?limit.reset,
            "rate limit exhausted, waiting for reset"
        );
        if !self.cancel.sleep(wait).await {
            tracing::info!("rate limit wait interrupted by stop request");
        }
        wait
    }
}

/// The page sequence of one query. See [`PageStream`].
pub struct Pages<'a> {
    fetcher: &'a PageFetcher,
    next_url: Option<String>,
    params: Option<Vec<(String, String)>>,
    page: u32,
}

#[async_trait]
impl PageStream for Pages<'_> {
    async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        // Taken up front so any error below also ends the sequence.
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        self.page += 1;

        let mut request = self.fetcher.client.get(&url);
        if let Some(params) = self.params.take() {
            request = request.query(&params);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;

        self.fetcher
            .honor(RateLimit::from_headers(response.headers()))
            .await;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "HTTP {} for {}: {}",
                status,
                url,
                body.chars().take(500).collect::<String>()
            );
        }

        let next_url = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);

        let body: Value = response
            .json()
            .await
            .with_context(|| format!("Malformed JSON body from {}", url))?;
        let items =
            page_items(body).with_context(|| format!("Unexpected page shape from {}", url))?;

        tracing::debug!(
            page = self.page,
            items = items.len(),
            has_next = next_url.is_some(),
            "fetched page"
        );
        self.next_url = next_url;
        Ok(Some(items))
    }
}
