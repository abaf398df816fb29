//! Per-channel pipeline: fetch -> parse -> align -> stats.
//!
//! Keeping this in one place lets the assembler treat a channel as a single
//! fallible unit of work, and lets tests drive it with fake sources.

use chrono_tz::Tz;

use crate::data::{FeedFetcher, FeedSource, Sleeper, parse_records};
use crate::domain::{ChannelResult, ChannelSpec, ReportingWindow};
use crate::error::DataError;
use crate::grid::GridAligner;
use crate::stats;

pub struct Pipeline<S, C> {
    pub fetcher: FeedFetcher<S, C>,
    pub aligner: GridAligner,
    pub zone: Tz,
    pub trend_threshold: f64,
}

impl<S: FeedSource, C: Sleeper> Pipeline<S, C> {
    /// Run one channel end to end.
    ///
    /// A degraded fetch is not an error: the result carries whatever arrived
    /// plus the `degraded` note. `Err` is reserved for failures that leave
    /// nothing usable (e.g. an undecodable page).
    pub fn run_channel(&self, channel: &ChannelSpec, window: &ReportingWindow) -> Result<ChannelResult, DataError> {
        let fetched = self.fetcher.fetch(&channel.key, &window.start, &window.end)?;
        let parsed = parse_records(&fetched.records, self.zone);

        if !parsed.rejected.is_empty() {
            log::info!(
                "{}: dropped {} of {} records",
                channel.key,
                parsed.rejected.len(),
                fetched.records.len()
            );
            for r in parsed.rejected.iter().take(5) {
                log::debug!("{}: record #{}: {}", channel.key, r.index, r.error);
            }
        }
        if !parsed.encodings.is_empty() {
            log::debug!("{}: created_at encodings {:?}", channel.key, parsed.encodings);
        }
        if let (Some(first), Some(last)) = (parsed.samples.first(), parsed.samples.last()) {
            log::info!(
                "{}: raw {} → {} (n={}, pages={})",
                channel.key,
                first.instant.format("%d-%b %H:%M"),
                last.instant.format("%d-%b %H:%M"),
                parsed.samples.len(),
                fetched.pages
            );
        }

        let aligned = self.aligner.align(&parsed.samples, window.start, window.end);
        let summary = stats::compute(&aligned);
        let trend = stats::trend(
            summary.map(|s| s.first),
            summary.map(|s| s.last),
            self.trend_threshold,
        );

        Ok(ChannelResult {
            channel: channel.clone(),
            stats: summary,
            trend,
            aligned,
            raw_count: fetched.records.len(),
            rejected: parsed.rejected.len(),
            degraded: fetched.degraded,
            error: None,
        })
    }
}
