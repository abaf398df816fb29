//! Plain-text rendering of a report.
//!
//! All user-facing text lives here so the pipeline code stays free of
//! formatting and output changes stay localized (golden tests below).

use crate::domain::{ChannelKind, ChannelResult, ChannelSpec, Report, ReportingWindow};

const HEADER_FORMAT: &str = "%Y-%m-%d %H:%M";
const INTERVAL_FORMAT: &str = "%d-%b %H:%M";

/// Title line plus interval line.
pub fn format_header(window: &ReportingWindow) -> String {
    format!(
        "📊 Station report {}h ({})\n🕗 Interval: {} → {}",
        window.span_hours(),
        window.end.format(HEADER_FORMAT),
        window.start.format(INTERVAL_FORMAT),
        window.end.format(INTERVAL_FORMAT),
    )
}

/// Relay-style channels are ON when their last aligned value is at least 1.
pub fn binary_state(result: &ChannelResult) -> Option<bool> {
    result.stats.map(|s| s.last >= 1.0)
}

/// Exactly one line per channel, whatever happened to it.
pub fn format_channel_line(result: &ChannelResult) -> String {
    let ch = &result.channel;
    if let Some(err) = &result.error {
        return format!("• {}: error {}", ch.title, err.message());
    }

    let body = match (ch.kind, result.stats) {
        (_, None) => format!("• {}: no data", ch.title),
        (ChannelKind::Binary, Some(_)) => {
            let state = if binary_state(result) == Some(true) { "ON" } else { "OFF" };
            format!("• {} → {state}", ch.title)
        }
        (ChannelKind::Analog, Some(s)) => {
            let u = ch.unit_suffix();
            format!(
                "• {} → n={}, min={:.2}{u}, max={:.2}{u}, mean={:.2}{u}, σ={:.2}, trend {}",
                ch.title,
                s.n,
                s.min,
                s.max,
                s.mean,
                s.stddev,
                result.trend.symbol()
            )
        }
    };

    if result.degraded.is_some() {
        format!("{body} (partial)")
    } else {
        body
    }
}

/// Full summary message: header, blank line, one line per channel.
pub fn format_summary(report: &Report) -> String {
    let mut out = format_header(&report.window);
    out.push_str("\n\n");
    let lines: Vec<String> = report.results.iter().map(format_channel_line).collect();
    out.push_str(&lines.join("\n"));
    out
}

/// Chart caption: `<Title> <span>h (<unit>)`.
pub fn format_caption(channel: &ChannelSpec, window: &ReportingWindow) -> String {
    format!("{} {}h ({})", channel.title, window.span_hours(), channel.unit_label())
}
