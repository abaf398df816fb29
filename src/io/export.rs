//! Export a finished report to JSON.
//!
//! The file carries every channel's aligned series next to its stats, so a
//! run can be inspected or re-plotted without hitting the feed API again.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::domain::Report;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct ReportFile<'a> {
    tool: &'static str,
    version: &'static str,
    zone: &'a str,
    tolerance_minutes: i64,
    #[serde(flatten)]
    report: &'a Report,
}

/// Write `report` as pretty-printed JSON.
pub fn write_report_json(path: &Path, report: &Report, tolerance_minutes: i64) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create report JSON '{}': {e}", path.display())))?;

    let doc = ReportFile {
        tool: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        zone: report.window.start.timezone().name(),
        tolerance_minutes,
        report,
    };

    serde_json::to_writer_pretty(BufWriter::new(file), &doc)
        .map_err(|e| AppError::new(4, format!("Failed to write report JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Santiago;

    use crate::config::channel_spec;
    use crate::domain::{AlignedPoint, ChannelResult, ReportingWindow, Stats, Trend};
    use crate::error::{DataError, ErrorKind};

    #[test]
    fn export_contains_window_results_and_errors() {
        let start = Santiago.with_ymd_and_hms(2025, 1, 9, 8, 0, 0).unwrap();
        let end = Santiago.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap();
        let ok = ChannelResult {
            channel: channel_spec("estacion.temperatura"),
            stats: Some(Stats { n: 1, min: 20.0, max: 20.0, mean: 20.0, stddev: 0.0, first: 20.0, last: 20.0 }),
            trend: Trend::Neutral,
            aligned: vec![AlignedPoint { slot: start, value: 20.0 }],
            raw_count: 3,
            rejected: 1,
            degraded: None,
            error: None,
        };
        let failed = ChannelResult::failed(
            channel_spec("estacion.luz"),
            DataError::new(ErrorKind::ChannelPipelineFailure, "panic: boom"),
        );
        let report = Report {
            window: ReportingWindow { start, end, span_days: 1 },
            generated_at: end,
            results: vec![ok, failed],
        };

        let path = std::env::temp_dir().join(format!("station-report-export-{}.json", std::process::id()));
        write_report_json(&path, &report, 15).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["zone"], "America/Santiago");
        assert_eq!(v["tolerance_minutes"], 15);
        assert_eq!(v["window"]["start"], "2025-01-09T08:00:00-03:00");
        assert_eq!(v["results"][0]["trend"], "neutral");
        assert_eq!(v["results"][0]["aligned"][0]["value"], 20.0);
        assert_eq!(v["results"][1]["error"]["kind"], "channel_pipeline_failure");
        assert_eq!(v["results"][1]["channel"]["unit"], "lux");
    }

    #[test]
    fn unwritable_path_is_an_io_error() {
        let report = Report {
            window: ReportingWindow {
                start: Santiago.with_ymd_and_hms(2025, 1, 9, 8, 0, 0).unwrap(),
                end: Santiago.with_ymd_and_hms(2025, 1, 10, 8, 0, 0).unwrap(),
                span_days: 1,
            },
            generated_at: Santiago.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
            results: Vec::new(),
        };
        let err = write_report_json(Path::new("/nonexistent-dir/x/report.json"), &report, 15).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
