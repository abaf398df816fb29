//! Nearest-sample alignment onto a fixed-cadence slot grid.
//!
//! Each slot takes the value of the sample closest to it, provided that sample
//! lies within `tolerance`. Slots without such a sample are left out: the
//! result is sparse, never interpolated or carried forward.
//!
//! Both the slots and the series are sorted, so a single forward cursor over
//! the series serves every slot and the whole pass is `O(n + m)`.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::domain::{AlignedPoint, Sample};
use crate::error::AppError;

pub const SLOT_CADENCE_MINUTES: i64 = 30;
pub const DEFAULT_TOLERANCE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy)]
pub struct GridAligner {
    cadence: Duration,
    tolerance: Duration,
}

impl GridAligner {
    /// Build an aligner; `tolerance` may not exceed half the cadence, or one
    /// sample could serve two neighbouring slots.
    pub fn new(cadence: Duration, tolerance: Duration) -> Result<Self, AppError> {
        if cadence <= Duration::zero() {
            return Err(AppError::new(2, "Slot cadence must be > 0."));
        }
        if tolerance < Duration::zero() {
            return Err(AppError::new(2, "Alignment tolerance must be >= 0."));
        }
        if tolerance * 2 > cadence {
            return Err(AppError::new(
                2,
                format!(
                    "Alignment tolerance {}min exceeds half the {}min slot cadence.",
                    tolerance.num_minutes(),
                    cadence.num_minutes()
                ),
            ));
        }
        Ok(Self { cadence, tolerance })
    }

    /// Half-hour grid with the given tolerance in minutes.
    pub fn half_hourly(tolerance_minutes: i64) -> Result<Self, AppError> {
        Self::new(
            Duration::minutes(SLOT_CADENCE_MINUTES),
            Duration::minutes(tolerance_minutes),
        )
    }

    /// Slots `start + k·cadence` for `k ≥ 0`, up to and including `end`.
    pub fn slots(&self, start: DateTime<Tz>, end: DateTime<Tz>) -> Vec<DateTime<Tz>> {
        let mut out = Vec::new();
        let mut slot = start;
        while slot <= end {
            out.push(slot);
            slot += self.cadence;
        }
        out
    }

    /// Reduce `series` onto the slot grid of `[start, end]`.
    ///
    /// `series` must be sorted ascending by instant; this is not checked.
    /// Among eligible samples the strictly closest wins, so on an exact tie the
    /// earlier sample is kept. Emitted points carry the slot instant.
    pub fn align(&self, series: &[Sample], start: DateTime<Tz>, end: DateTime<Tz>) -> Vec<AlignedPoint> {
        let mut out = Vec::new();
        let mut cursor = 0usize;

        for slot in self.slots(start, end) {
            let lower = slot - self.tolerance;
            let upper = slot + self.tolerance;

            // Samples before `lower` are too early for this slot and every later one.
            while cursor < series.len() && series[cursor].instant < lower {
                cursor += 1;
            }

            let mut best: Option<(Duration, f64)> = None;
            for sample in series[cursor..].iter().take_while(|s| s.instant <= upper) {
                let delta = (sample.instant - slot).abs();
                if best.is_none_or(|(best_delta, _)| delta < best_delta) {
                    best = Some((delta, sample.value));
                }
            }

            if let Some((_, value)) = best {
                out.push(AlignedPoint { slot, value });
            }
        }

        out
    }
}
