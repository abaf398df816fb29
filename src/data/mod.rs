//! Feed retrieval and record parsing.
//!
//! - paginated download with retry/backoff (`feed`)
//! - raw record -> `Sample` conversion (`records`)
//! - `created_at` normalization into the station zone (`timestamp`)

pub mod feed;
pub mod records;
pub mod timestamp;

pub use feed::{
    FeedFetcher, FeedSource, FetchOutcome, FetchSettings, HttpFeedSource, PageQuery, PageResponse,
    RangeEncoding, RetryPolicy, Sleeper, ThreadSleeper, TransportError,
};
pub use records::{ParsedSeries, RawRecord, RecordError, parse_records};
