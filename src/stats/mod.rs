//! Descriptive statistics and trend classification.
//!
//! Values are treated as a plain sample: the mean is unweighted even when the
//! aligned series has gaps, and the standard deviation is the population one.

use statrs::statistics::Statistics;

use crate::domain::{Stats, Trend, Valued};

/// Minimum `|last − first|` for a trend to count as a move.
///
/// One threshold for all channels is a coarse heuristic: 0.1 is a lot for air
/// density in kg/m³ and nothing for light in lux.
pub const DEFAULT_TREND_THRESHOLD: f64 = 0.1;

/// Statistics over `series`, or `None` when it is empty.
pub fn compute<T: Valued>(series: &[T]) -> Option<Stats> {
    let first = series.first()?.value();
    let last = series.last()?.value();

    let values: Vec<f64> = series.iter().map(Valued::value).collect();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let mean = values.iter().mean();
    let stddev = if values.len() > 1 {
        values.iter().population_std_dev()
    } else {
        0.0
    };

    Some(Stats {
        n: values.len(),
        min,
        max,
        mean,
        stddev,
        first,
        last,
    })
}

/// Classify the change from `first` to `last`.
pub fn trend(first: Option<f64>, last: Option<f64>, threshold: f64) -> Trend {
    let (Some(first), Some(last)) = (first, last) else {
        return Trend::Neutral;
    };
    let delta = last - first;
    if delta.abs() < threshold {
        Trend::Neutral
    } else if delta > 0.0 {
        Trend::Positive
    } else {
        Trend::Negative
    }
}

impl Stats {
    pub fn trend(&self, threshold: f64) -> Trend {
        trend(Some(self.first), Some(self.last), threshold)
    }
}
