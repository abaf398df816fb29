//! Raw feed records -> sorted `Series`.
//!
//! Parsing is record-tolerant: a page element that is not an object, or has a
//! bad `value` or `created_at`, drops that record and is reported in
//! `ParsedSeries::rejected`, but never fails the channel.

use std::collections::BTreeMap;

use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;

use crate::data::timestamp::{self, Encoding};
use crate::domain::{Sample, Series};
use crate::error::{DataError, ErrorKind};

/// One record as returned by the feed API. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub created_at: Value,
}

impl RawRecord {
    /// Read one page element. Anything but a JSON object is a malformed record.
    pub fn from_element(element: &Value) -> Result<Self, DataError> {
        if !element.is_object() {
            return Err(DataError::new(
                ErrorKind::MalformedValue,
                format!("record is not an object: {element}"),
            ));
        }
        RawRecord::deserialize(element)
            .map_err(|e| DataError::new(ErrorKind::MalformedValue, format!("unreadable record: {e}")))
    }
}

/// A record that was dropped during parsing.
#[derive(Debug, Clone)]
pub struct RecordError {
    /// Position in the concatenated page output.
    pub index: usize,
    pub error: DataError,
}

/// Parser output: the sorted series plus what was dropped.
#[derive(Debug, Clone)]
pub struct ParsedSeries {
    pub samples: Series,
    pub rejected: Vec<RecordError>,
    /// How many accepted records used each `created_at` encoding.
    pub encodings: BTreeMap<Encoding, usize>,
}

/// Parse page elements into a series sorted ascending by instant.
///
/// The sort is stable, so records sharing a timestamp keep their feed order.
pub fn parse_records(elements: &[Value], zone: Tz) -> ParsedSeries {
    let mut samples = Vec::with_capacity(elements.len());
    let mut rejected = Vec::new();
    let mut encodings = BTreeMap::new();

    for (index, element) in elements.iter().enumerate() {
        match RawRecord::from_element(element).and_then(|record| parse_record(&record, zone)) {
            Ok((sample, encoding)) => {
                samples.push(sample);
                *encodings.entry(encoding).or_insert(0) += 1;
            }
            Err(error) => rejected.push(RecordError { index, error }),
        }
    }

    samples.sort_by_key(|s| s.instant);

    ParsedSeries {
        samples,
        rejected,
        encodings,
    }
}

fn parse_record(record: &RawRecord, zone: Tz) -> Result<(Sample, Encoding), DataError> {
    let value = parse_value(&record.value)?;
    let raw_ts = record.created_at.as_str().ok_or_else(|| {
        DataError::new(
            ErrorKind::MalformedTimestamp,
            format!("created_at is not a string: {}", record.created_at),
        )
    })?;
    let (instant, encoding) = timestamp::normalize_with_encoding(raw_ts, zone)?;
    Ok((Sample::new(instant, value), encoding))
}

/// Read a finite `f64` from a JSON number or numeric string.
pub fn parse_value(raw: &Value) -> Result<f64, DataError> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(DataError::new(
            ErrorKind::MalformedValue,
            format!("not a finite number: {raw}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::Santiago;
    use serde_json::json;

    #[test]
    fn parses_numbers_and_numeric_strings() {
        assert_eq!(parse_value(&json!(21.5)).unwrap(), 21.5);
        assert_eq!(parse_value(&json!(" 21.5 ")).unwrap(), 21.5);
        assert_eq!(parse_value(&json!("-3")).unwrap(), -3.0);
    }

    #[test]
    fn rejects_non_numeric_values() {
        for raw in [json!(null), json!("ON"), json!(""), json!("NaN"), json!("inf"), json!([1])] {
            let err = parse_value(&raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedValue, "input {raw}");
        }
    }

    #[test]
    fn drops_bad_records_and_sorts_the_rest() {
        let records = vec![
            json!({"value": "20.0", "created_at": "2025-01-10T12:30:00Z"}),
            json!({"value": "oops", "created_at": "2025-01-10T12:00:00Z"}),
            json!({"value": 19.0, "created_at": "2025-01-10T09:00:00-03:00"}),
            json!({"value": "18.0", "created_at": "not a time"}),
            json!({"value": "17.0", "created_at": 12345}),
        ];

        let parsed = parse_records(&records, Santiago);

        assert_eq!(parsed.samples.len(), 2);
        assert_eq!(parsed.samples[0].value, 19.0);
        assert_eq!(parsed.samples[0].instant.hour(), 9);
        assert_eq!(parsed.samples[1].value, 20.0);
        assert_eq!(parsed.samples[1].instant.minute(), 30);

        let kinds: Vec<(usize, ErrorKind)> = parsed
            .rejected
            .iter()
            .map(|r| (r.index, r.error.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (1, ErrorKind::MalformedValue),
                (3, ErrorKind::MalformedTimestamp),
                (4, ErrorKind::MalformedTimestamp),
            ]
        );
    }

    #[test]
    fn deserializes_api_records_with_extra_fields() {
        let body = r#"[{"id":"0F1","value":"21.4","feed_id":7,"created_at":"2025-01-10T12:00:00Z"},{"value":3}]"#;
        let records: Vec<Value> = serde_json::from_str(body).unwrap();
        assert_eq!(records.len(), 2);
        let second = RawRecord::from_element(&records[1]).unwrap();
        assert_eq!(second.value, json!(3));
        assert_eq!(second.created_at, Value::Null);

        let parsed = parse_records(&records, Santiago);
        assert_eq!(parsed.samples.len(), 1);
        assert_eq!(parsed.rejected.len(), 1);
    }

    #[test]
    fn non_object_elements_are_rejected_by_index() {
        let records = vec![
            json!({"value": "20.1", "created_at": "2025-01-10T12:00:00Z"}),
            json!({"value": "20.3", "created_at": "2025-01-10T12:30:00Z"}),
            json!(null),
            json!("21.0"),
            json!(7),
        ];

        let parsed = parse_records(&records, Santiago);

        assert_eq!(parsed.samples.len(), 2);
        let rejected: Vec<(usize, ErrorKind)> = parsed
            .rejected
            .iter()
            .map(|r| (r.index, r.error.kind()))
            .collect();
        assert_eq!(
            rejected,
            vec![
                (2, ErrorKind::MalformedValue),
                (3, ErrorKind::MalformedValue),
                (4, ErrorKind::MalformedValue),
            ]
        );
    }

    #[test]
    fn counts_encodings_of_accepted_records() {
        let records = vec![
            json!({"value": 1, "created_at": "2025-01-10T09:00:00-03:00"}),
            json!({"value": 2, "created_at": "2025-01-10T12:30:00Z"}),
            json!({"value": 3, "created_at": "2025-01-10 10:00:00"}),
            json!({"value": 4, "created_at": "2025-01-10 10:30:00"}),
            json!({"value": "x", "created_at": "2025-01-10T14:00:00+02:00"}),
        ];

        let parsed = parse_records(&records, Santiago);

        let counts: Vec<(Encoding, usize)> = parsed.encodings.into_iter().collect();
        assert_eq!(
            counts,
            vec![(Encoding::ZoneOffset, 1), (Encoding::Utc, 1), (Encoding::Naive, 2)]
        );
    }
}
