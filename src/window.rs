//! Reporting window planning.
//!
//! A report always covers whole days that have already finished, ending on the
//! local anchor hour (08:00 → 08:00 for the station's daily report). Runs
//! before today's anchor report on the previous finished block.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::data::timestamp::attach_zone;
use crate::domain::ReportingWindow;
use crate::error::AppError;

pub const DEFAULT_ANCHOR_HOUR: u32 = 8;
pub const DEFAULT_SPAN_DAYS: u32 = 1;

/// Current time in `zone`.
pub fn now_in(zone: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&zone)
}

/// Most recent fully elapsed `span_days` block ending on `anchor_hour`.
///
/// Day arithmetic is done on local calendar dates, so both bounds land on the
/// anchor hour even when a DST change falls inside the window (the window is
/// then 23 or 25 hours per changed day).
pub fn plan(now: DateTime<Tz>, anchor_hour: u32, span_days: u32) -> Result<ReportingWindow, AppError> {
    if anchor_hour > 23 {
        return Err(AppError::new(2, format!("Anchor hour must be 0..=23 (got {anchor_hour}).")));
    }
    if span_days == 0 {
        return Err(AppError::new(2, "Window span must be at least one day."));
    }

    let zone = now.timezone();
    let today = now.date_naive();
    let today_anchor = anchor_on(zone, today, anchor_hour)?;

    let end_date = if now >= today_anchor {
        today
    } else {
        shift_days(today, 1)?
    };
    let start_date = shift_days(end_date, span_days)?;

    Ok(ReportingWindow {
        start: anchor_on(zone, start_date, anchor_hour)?,
        end: anchor_on(zone, end_date, anchor_hour)?,
        span_days,
    })
}

fn shift_days(date: NaiveDate, days: u32) -> Result<NaiveDate, AppError> {
    date.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| AppError::new(2, format!("Window start out of range ({date} - {days} days).")))
}

fn anchor_on(zone: Tz, date: NaiveDate, hour: u32) -> Result<DateTime<Tz>, AppError> {
    let naive = date
        .and_hms_opt(hour, 0, 0)
        .ok_or_else(|| AppError::new(2, format!("Invalid anchor hour {hour}.")))?;
    Ok(attach_zone(naive, zone))
}
