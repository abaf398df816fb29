//! `created_at` normalization.
//!
//! Feeds are not consistent about how they encode timestamps. Depending on the
//! device firmware and API version we see:
//!
//! - local wall-clock time with the zone's offset (`2025-01-10T09:00:00-03:00`)
//! - UTC (`2025-01-10T12:00:00Z` or `...+00:00`)
//! - no marker at all (`2025-01-10 09:00:00`), which is local time
//!
//! All three end up as a `DateTime<Tz>` in the station's zone.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{DataError, ErrorKind};

const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Which of the three encodings a timestamp used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Encoding {
    /// Explicit offset equal to the zone's offset at that instant.
    ZoneOffset,
    /// `Z` or `+00:00`.
    Utc,
    /// Some other explicit offset; honored as an absolute instant.
    ForeignOffset,
    /// No offset marker; read as local wall-clock time.
    Naive,
}

/// Parse `raw` into an instant in `zone`.
pub fn normalize(raw: &str, zone: Tz) -> Result<DateTime<Tz>, DataError> {
    normalize_with_encoding(raw, zone).map(|(instant, _)| instant)
}

/// Like [`normalize`], also reporting which encoding was detected.
pub fn normalize_with_encoding(raw: &str, zone: Tz) -> Result<(DateTime<Tz>, Encoding), DataError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(malformed(raw));
    }

    if let Some(fixed) = parse_with_offset(trimmed) {
        let instant = fixed.with_timezone(&zone);
        let offset = fixed.offset().local_minus_utc();
        let encoding = if offset == 0 && !has_zone_offset(&instant, 0) {
            Encoding::Utc
        } else if has_zone_offset(&instant, offset) {
            // Same wall clock as the source string; nothing to convert.
            Encoding::ZoneOffset
        } else {
            Encoding::ForeignOffset
        };
        return Ok((instant, encoding));
    }

    let naive = parse_naive(trimmed).ok_or_else(|| malformed(raw))?;
    Ok((attach_zone(naive, zone), Encoding::Naive))
}

fn has_zone_offset(instant: &DateTime<Tz>, offset_seconds: i32) -> bool {
    instant.offset().fix().local_minus_utc() == offset_seconds
}

fn parse_with_offset(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Some(stripped) = s.strip_suffix(['Z', 'z']) {
        return parse_naive(stripped).map(|naive| Utc.from_utc_datetime(&naive).fixed_offset());
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Attach `zone` to a wall-clock time.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times inside a
/// DST gap are read with the offset in force at the corresponding UTC moment.
pub fn attach_zone(naive: NaiveDateTime, zone: Tz) -> DateTime<Tz> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let offset = zone.offset_from_utc_datetime(&naive).fix();
            zone.from_utc_datetime(&(naive - offset))
        }
    }
}

fn malformed(raw: &str) -> DataError {
    DataError::new(
        ErrorKind::MalformedTimestamp,
        format!("unrecognized timestamp '{raw}'"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use chrono_tz::America::Santiago;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn zone_offset_keeps_wall_clock() {
        // January: Santiago observes -03:00.
        let (t, enc) = normalize_with_encoding("2025-01-10T09:00:00-03:00", Santiago).unwrap();
        assert_eq!(enc, Encoding::ZoneOffset);
        assert_eq!(t.naive_local(), local(2025, 1, 10, 9, 0, 0));
    }

    #[test]
    fn utc_is_converted() {
        let (t, enc) = normalize_with_encoding("2025-01-10T12:00:00Z", Santiago).unwrap();
        assert_eq!(enc, Encoding::Utc);
        assert_eq!(t.naive_local(), local(2025, 1, 10, 9, 0, 0));

        let (t2, enc2) = normalize_with_encoding("2025-01-10T12:00:00+00:00", Santiago).unwrap();
        assert_eq!(enc2, Encoding::Utc);
        assert_eq!(t, t2);
    }

    #[test]
    fn utc_with_fraction_and_space_separator() {
        let t = normalize("2025-01-10 12:00:30.250Z", Santiago).unwrap();
        assert_eq!(t.naive_local().time().second(), 30);
        assert_eq!(t.naive_local().time().nanosecond(), 250_000_000);
    }

    #[test]
    fn naive_is_attached_as_local() {
        let (t, enc) = normalize_with_encoding("2025-01-10 09:00:00", Santiago).unwrap();
        assert_eq!(enc, Encoding::Naive);
        assert_eq!(t.naive_local(), local(2025, 1, 10, 9, 0, 0));

        let t2 = normalize("2025-01-10T09:00:00", Santiago).unwrap();
        assert_eq!(t, t2);
    }

    #[test]
    fn all_encodings_agree_on_the_instant() {
        let a = normalize("2025-01-10T09:00:00-03:00", Santiago).unwrap();
        let b = normalize("2025-01-10T12:00:00Z", Santiago).unwrap();
        let c = normalize("2025-01-10T09:00:00", Santiago).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn foreign_offset_is_absolute() {
        let (t, enc) = normalize_with_encoding("2025-01-10T14:00:00+0200", Santiago).unwrap();
        assert_eq!(enc, Encoding::ForeignOffset);
        assert_eq!(t.naive_local(), local(2025, 1, 10, 9, 0, 0));
    }

    #[test]
    fn winter_offset_matches_zone() {
        // July: Santiago observes -04:00.
        let (t, enc) = normalize_with_encoding("2025-07-10T09:00:00-04:00", Santiago).unwrap();
        assert_eq!(enc, Encoding::ZoneOffset);
        assert_eq!(t.naive_local(), local(2025, 7, 10, 9, 0, 0));
    }

    #[test]
    fn garbage_is_malformed() {
        for raw in ["", "   ", "yesterday", "2025-13-40T99:00:00Z", "2025-01-10"] {
            let err = normalize(raw, Santiago).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedTimestamp, "input {raw:?}");
        }
    }

    #[test]
    fn gap_time_is_shifted_forward() {
        // 2025-09-07 00:00 does not exist in Santiago: clocks jump to 01:00.
        let t = attach_zone(local(2025, 9, 7, 0, 30, 0), Santiago);
        assert_eq!(t.naive_local(), local(2025, 9, 7, 1, 30, 0));
        assert_eq!(t.offset().fix().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn ambiguous_time_takes_the_earlier_instant() {
        // 2025-04-05 23:00..24:00 happens twice in Santiago (-03:00, then -04:00).
        let t = attach_zone(local(2025, 4, 5, 23, 30, 0), Santiago);
        assert_eq!(t.naive_local(), local(2025, 4, 5, 23, 30, 0));
        assert_eq!(t.offset().fix().local_minus_utc(), -3 * 3600);

        let later = Santiago.from_utc_datetime(&local(2025, 4, 6, 3, 30, 0));
        assert_eq!(later.naive_local(), t.naive_local());
        assert!(t < later);
    }

    #[test]
    fn naive_strings_in_transitions_use_the_same_rules() {
        let gap = normalize("2025-09-07 00:30:00", Santiago).unwrap();
        assert_eq!(gap.naive_local(), local(2025, 9, 7, 1, 30, 0));
        let overlap = normalize("2025-04-05T23:30:00", Santiago).unwrap();
        assert_eq!(overlap.with_timezone(&Utc).naive_utc(), local(2025, 4, 6, 2, 30, 0));
    }
}
