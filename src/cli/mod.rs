//! Command-line parsing for the station report.
//!
//! Credentials and station settings come from the environment (see `config`);
//! flags only carry the run's tunables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::DEFAULT_CONCURRENCY;
use crate::data::RangeEncoding;
use crate::data::feed::DEFAULT_PAGE_SIZE;
use crate::grid::DEFAULT_TOLERANCE_MINUTES;
use crate::stats::DEFAULT_TREND_THRESHOLD;
use crate::window::{DEFAULT_ANCHOR_HOUR, DEFAULT_SPAN_DAYS};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "station-report",
    version,
    about = "Daily weather-station telemetry report (fetch, align, summarize, deliver)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the report for the last finished window and deliver it.
    Report(ReportArgs),
    /// Print the window a report run at `--now` would cover.
    Window(WindowArgs),
}

/// Which window to report on.
#[derive(Debug, Args, Clone)]
pub struct WindowArgs {
    /// Local hour both window bounds sit on.
    #[arg(long, default_value_t = DEFAULT_ANCHOR_HOUR)]
    pub anchor_hour: u32,

    /// Window length in days.
    #[arg(long, default_value_t = DEFAULT_SPAN_DAYS)]
    pub span_days: u32,

    /// Pretend the run happens at this time (RFC 3339, or local `YYYY-MM-DD HH:MM:SS`).
    #[arg(long, value_name = "TIME")]
    pub now: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub window: WindowArgs,

    /// Max distance (minutes) between a slot and the sample it takes.
    #[arg(long = "tolerance-min", default_value_t = DEFAULT_TOLERANCE_MINUTES)]
    pub tolerance_min: i64,

    /// Records per page request.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Attempts per page request, including the first.
    #[arg(long, default_value_t = 4)]
    pub retries: u32,

    /// Exponential backoff base in seconds.
    #[arg(long, default_value_t = 1.5)]
    pub backoff: f64,

    /// Channels fetched at the same time.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Minimum first→last change reported as a trend.
    #[arg(long, default_value_t = DEFAULT_TREND_THRESHOLD)]
    pub trend_threshold: f64,

    /// How window bounds are sent to the feed API.
    #[arg(long, value_enum, default_value_t = RangeEncoding::Utc)]
    pub range_encoding: RangeEncoding,

    /// Print to stdout instead of sending to Telegram (charts as text).
    #[arg(long)]
    pub dry_run: bool,

    /// Directory for SVG charts (default: `<tmp>/station-report`).
    #[arg(long, value_name = "DIR")]
    pub chart_dir: Option<PathBuf>,

    /// Skip charts entirely.
    #[arg(long)]
    pub no_charts: bool,

    /// Also write the full report (including aligned series) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_defaults() {
        let cli = Cli::parse_from(["station-report", "report"]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.window.anchor_hour, 8);
        assert_eq!(args.window.span_days, 1);
        assert_eq!(args.tolerance_min, 15);
        assert_eq!(args.page_size, 1000);
        assert_eq!(args.retries, 4);
        assert_eq!(args.backoff, 1.5);
        assert_eq!(args.concurrency, 5);
        assert_eq!(args.trend_threshold, 0.1);
        assert_eq!(args.range_encoding, RangeEncoding::Utc);
        assert!(!args.dry_run && !args.no_charts);
    }

    #[test]
    fn report_overrides() {
        let cli = Cli::parse_from([
            "station-report",
            "report",
            "--span-days",
            "2",
            "--range-encoding",
            "local",
            "--dry-run",
            "--now",
            "2025-01-10T09:00:00-03:00",
        ]);
        let Command::Report(args) = cli.command else {
            panic!("expected report");
        };
        assert_eq!(args.window.span_days, 2);
        assert_eq!(args.range_encoding, RangeEncoding::Local);
        assert!(args.dry_run);
        assert_eq!(args.window.now.as_deref(), Some("2025-01-10T09:00:00-03:00"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
