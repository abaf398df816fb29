//! Chart rendering.
//!
//! - `SvgRenderer`: SVG file per channel (plotters), sent along with the summary
//! - `TextRenderer`: fixed-size character chart for dry runs and terminals

use std::path::PathBuf;

use chrono::{DateTime, Days};
use chrono_tz::Tz;

use crate::data::timestamp::attach_zone;
use crate::domain::{AlignedPoint, ChannelSpec, ReportingWindow};
use crate::error::AppError;

pub mod ascii;
pub mod svg;

pub use ascii::TextRenderer;
pub use svg::SvgRenderer;

/// One channel's chart input.
#[derive(Debug, Clone, Copy)]
pub struct ChartRequest<'a> {
    pub channel: &'a ChannelSpec,
    pub points: &'a [AlignedPoint],
    pub window: &'a ReportingWindow,
}

/// What a renderer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    File(PathBuf),
    Text(String),
}

pub trait Renderer {
    fn render(&self, request: &ChartRequest<'_>) -> Result<Artifact, AppError>;
}

/// Hours from the window start, the x coordinate of every chart.
pub(crate) fn hours_since(window: &ReportingWindow, t: DateTime<Tz>) -> f64 {
    (t - window.start).num_seconds() as f64 / 3600.0
}

/// Anchor-hour boundaries between days, as x coordinates (both ends included).
pub(crate) fn day_boundaries(window: &ReportingWindow) -> Vec<f64> {
    let zone = window.start.timezone();
    let first = window.start.naive_local();
    (0..=u64::from(window.span_days))
        .filter_map(|k| first.checked_add_days(Days::new(k)))
        .map(|naive| hours_since(window, attach_zone(naive, zone)))
        .collect()
}
