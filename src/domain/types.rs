//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the fetch, align and stats stages without conversion
//! - exported to JSON for inspection after a run

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::DataError;

/// One parsed telemetry record, already in the canonical zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub instant: DateTime<Tz>,
    pub value: f64,
}

impl Sample {
    pub fn new(instant: DateTime<Tz>, value: f64) -> Self {
        Self { instant, value }
    }
}

/// Samples sorted ascending by instant.
pub type Series = Vec<Sample>;

/// A slot on the half-hour grid that matched a sample.
///
/// `slot` is the grid instant, never the source sample's instant, so aligned
/// series from different channels share timestamps exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedPoint {
    pub slot: DateTime<Tz>,
    pub value: f64,
}

/// Anything the stats engine can read a value from.
pub trait Valued {
    fn value(&self) -> f64;
}

impl Valued for Sample {
    fn value(&self) -> f64 {
        self.value
    }
}

impl Valued for AlignedPoint {
    fn value(&self) -> f64 {
        self.value
    }
}

impl Valued for f64 {
    fn value(&self) -> f64 {
        *self
    }
}

/// Reporting window: both bounds sit on the local anchor hour.
///
/// The slot grid includes `end`; the window never extends past the `now` it
/// was planned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub span_days: u32,
}

impl ReportingWindow {
    pub fn span_hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

/// Descriptive statistics over one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub n: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation (divisor `n`).
    pub stddev: f64,
    pub first: f64,
    pub last: f64,
}

/// Direction of change between the first and last value of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Positive,
    Negative,
    Neutral,
}

impl Trend {
    pub fn symbol(self) -> &'static str {
        match self {
            Trend::Positive => "↑",
            Trend::Negative => "↓",
            Trend::Neutral => "→",
        }
    }
}

/// How a channel's values are read in the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Continuous measurement: summarized with stats and trend.
    Analog,
    /// ON/OFF actuator state (e.g. irrigation relay): summarized by its last value.
    Binary,
}

/// One configured telemetry feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSpec {
    /// Remote feed key, e.g. `estacion.temperatura`.
    pub key: String,
    /// Human-readable name, e.g. `Temperatura`.
    pub title: String,
    /// Unit suffix; `None` when the key is missing from the unit map.
    pub unit: Option<String>,
    pub kind: ChannelKind,
}

impl ChannelSpec {
    pub fn unit_label(&self) -> &str {
        self.unit.as_deref().unwrap_or("no unit")
    }

    pub fn unit_suffix(&self) -> &str {
        self.unit.as_deref().unwrap_or("")
    }
}

/// Output of one channel's pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelResult {
    pub channel: ChannelSpec,
    /// `None` means no aligned data in the window (not an error).
    pub stats: Option<Stats>,
    pub trend: Trend,
    pub aligned: Vec<AlignedPoint>,
    /// Records returned by the feed before parsing.
    pub raw_count: usize,
    /// Records dropped for a malformed timestamp or value.
    pub rejected: usize,
    /// Set when paging stopped early; the data present may be partial.
    pub degraded: Option<DataError>,
    /// Set when the pipeline failed for this channel.
    pub error: Option<DataError>,
}

impl ChannelResult {
    pub fn failed(channel: ChannelSpec, error: DataError) -> Self {
        Self {
            channel,
            stats: None,
            trend: Trend::Neutral,
            aligned: Vec::new(),
            raw_count: 0,
            rejected: 0,
            degraded: None,
            error: Some(error),
        }
    }
}

/// Everything a single run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub window: ReportingWindow,
    pub generated_at: DateTime<Tz>,
    /// One entry per configured channel, in configured order.
    pub results: Vec<ChannelResult>,
}
