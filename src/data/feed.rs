//! Feed API integration: paginated download with retry/backoff.
//!
//! The remote store caps every response at `limit` records, so a window with
//! minute-level samples spans several pages. Rate limits (429) and gateway
//! hiccups are common enough that a single failed request must not lose the
//! whole channel. Anything that goes wrong here degrades to "fewer records"
//! plus a note in `FetchOutcome::degraded`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::ValueEnum;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, DataError, ErrorKind};

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_BASE_URL: &str = "https://io.adafruit.com/api/v2";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const BODY_SNIPPET_CHARS: usize = 120;

/// Query parameters for one page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub start_time: String,
    pub end_time: String,
    pub limit: usize,
    /// 1-based.
    pub page: u32,
}

/// Raw HTTP answer: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced an HTTP status (DNS, TLS, timeout, reset...).
#[derive(Debug, Clone)]
pub struct TransportError(pub String);

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport error: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Where pages come from. Implemented over HTTP in production and by scripted
/// fakes in tests.
pub trait FeedSource: Send + Sync {
    fn get_page(&self, feed_key: &str, query: &PageQuery) -> Result<PageResponse, TransportError>;
}

/// Backoff sleep, behind a trait so tests do not wait.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling worker thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Statuses worth retrying: rate limiting and transient server/gateway errors.
pub fn default_retryable(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Retry/backoff parameters for one page request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per page, including the first.
    pub max_attempts: u32,
    /// Exponential base; the wait after failed attempt `i` (0-based) is `base^i` seconds.
    pub base: f64,
    pub retryable: fn(u16) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base: 1.5,
            retryable: default_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        let secs = self.base.powi(attempt as i32);
        if secs.is_nan() || secs < 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        (self.retryable)(status)
    }
}

/// How the window bounds are encoded in `start_time` / `end_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RangeEncoding {
    /// RFC 3339 in UTC (`...+00:00`).
    Utc,
    /// RFC 3339 with the station zone's offset.
    Local,
}

impl RangeEncoding {
    pub fn encode(self, instant: &DateTime<Tz>) -> String {
        match self {
            RangeEncoding::Utc => instant.with_timezone(&Utc).to_rfc3339(),
            RangeEncoding::Local => instant.to_rfc3339(),
        }
    }
}

/// Knobs shared by every channel's fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchSettings {
    pub page_size: usize,
    pub policy: RetryPolicy,
    pub encoding: RangeEncoding,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            policy: RetryPolicy::default(),
            encoding: RangeEncoding::Utc,
        }
    }
}

/// All records collected for one channel.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Page elements concatenated in request order (not yet sorted or parsed).
    pub records: Vec<Value>,
    /// Page requests issued (each counted once, however many attempts it took).
    pub pages: u32,
    /// Why paging stopped early, if it did. `records` may then be partial.
    pub degraded: Option<DataError>,
}

enum PageOutcome {
    Records(Vec<Value>),
    Stopped(DataError),
}

pub struct FeedFetcher<S, C = ThreadSleeper> {
    source: S,
    sleeper: C,
    settings: FetchSettings,
}

impl<S: FeedSource, C: Sleeper> FeedFetcher<S, C> {
    pub fn new(source: S, sleeper: C, settings: FetchSettings) -> Self {
        Self {
            source,
            sleeper,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Download every record of `feed_key` between `start` and `end`.
    ///
    /// Transient and non-retryable HTTP failures never produce `Err`; they end
    /// paging and are reported through `FetchOutcome::degraded`. `Err` means a
    /// successful response carried a body that is not a JSON array. Elements
    /// are not inspected here; bad ones are dropped later, one by one.
    pub fn fetch(
        &self,
        feed_key: &str,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<FetchOutcome, DataError> {
        let page_size = self.settings.page_size.max(1);
        let start_time = self.settings.encoding.encode(start);
        let end_time = self.settings.encoding.encode(end);

        let mut records = Vec::new();
        let mut degraded = None;
        let mut page = 1u32;

        loop {
            let query = PageQuery {
                start_time: start_time.clone(),
                end_time: end_time.clone(),
                limit: page_size,
                page,
            };

            let batch = match self.fetch_page(feed_key, &query)? {
                PageOutcome::Records(batch) => batch,
                PageOutcome::Stopped(reason) => {
                    log::warn!("{feed_key}: stopping at page {page}: {reason}");
                    degraded = Some(reason);
                    Vec::new()
                }
            };
            log::debug!("{feed_key} page={page} -> {}", batch.len());

            let len = batch.len();
            records.extend(batch);
            if len < page_size {
                break;
            }
            page += 1;
        }

        Ok(FetchOutcome {
            records,
            pages: page,
            degraded,
        })
    }

    fn fetch_page(&self, feed_key: &str, query: &PageQuery) -> Result<PageOutcome, DataError> {
        let policy = &self.settings.policy;
        let attempts = policy.max_attempts.max(1);
        let mut last_failure = String::new();

        for attempt in 0..attempts {
            match self.source.get_page(feed_key, query) {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    let batch: Vec<Value> = serde_json::from_str(&resp.body).map_err(|e| {
                        DataError::new(
                            ErrorKind::ChannelPipelineFailure,
                            format!("page {} is not a JSON array: {e}", query.page),
                        )
                    })?;
                    return Ok(PageOutcome::Records(batch));
                }
                Ok(resp) if policy.is_retryable(resp.status) => {
                    last_failure = format!("HTTP {}", resp.status);
                }
                Ok(resp) => {
                    return Ok(PageOutcome::Stopped(DataError::new(
                        ErrorKind::NonRetryableFetchFailure,
                        format!("HTTP {} on page {}: {}", resp.status, query.page, snippet(&resp.body)),
                    )));
                }
                Err(e) => {
                    last_failure = e.to_string();
                }
            }

            if attempt + 1 < attempts {
                let delay = policy.delay(attempt);
                log::warn!(
                    "{feed_key}: {last_failure}, retry {}/{} in {:.1}s",
                    attempt + 1,
                    attempts - 1,
                    delay.as_secs_f64()
                );
                self.sleeper.sleep(delay);
            }
        }

        Ok(PageOutcome::Stopped(DataError::new(
            ErrorKind::TransientFetchFailure,
            format!(
                "page {} failed after {attempts} attempts ({last_failure})",
                query.page
            ),
        )))
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_CHARS).collect()
}

/// Blocking HTTP source for the Adafruit IO v2 data endpoint.
pub struct HttpFeedSource {
    client: Client,
    feeds_url: String,
    api_key: String,
}

impl HttpFeedSource {
    pub fn new(base_url: &str, username: &str, api_key: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            feeds_url: format!("{}/{username}/feeds", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }
}

impl FeedSource for HttpFeedSource {
    fn get_page(&self, feed_key: &str, query: &PageQuery) -> Result<PageResponse, TransportError> {
        let url = format!("{}/{feed_key}/data", self.feeds_url);
        let limit = query.limit.to_string();
        let page = query.page.to_string();

        let resp = self
            .client
            .get(&url)
            .header("X-AIO-Key", &self.api_key)
            .query(&[
                ("start_time", query.start_time.as_str()),
                ("end_time", query.end_time.as_str()),
                ("limit", limit.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| TransportError(e.to_string()))?;
        Ok(PageResponse { status, body })
    }
}
