//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads the environment
//! - plans the reporting window
//! - runs every channel's pipeline on the worker pool
//! - formats, renders and delivers the report
//! - writes the optional JSON export

use chrono::DateTime;
use clap::Parser;
use chrono_tz::Tz;

use crate::cli::{Command, ReportArgs, WindowArgs};
use crate::config::{AppConfig, EnvSettings};
use crate::data::timestamp::normalize;
use crate::data::{FeedFetcher, FeedSource, FetchSettings, HttpFeedSource, RetryPolicy, Sleeper, ThreadSleeper};
use crate::domain::{ChannelResult, Report, ReportingWindow};
use crate::error::AppError;
use crate::grid::GridAligner;
use crate::notify::{NotificationSink, StdoutSink, TelegramSink};
use crate::plot::{Artifact, ChartRequest, Renderer, SvgRenderer, TextRenderer};
use crate::report::{ReportAssembler, format_caption, format_summary};
use crate::window;

pub mod pipeline;

use pipeline::Pipeline;

/// Entry point for the `station-report` binary.
pub fn run() -> Result<(), AppError> {
    // `station-report` and `station-report --dry-run` mean `station-report report ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Report(args) => handle_report(args),
        Command::Window(args) => handle_window(args),
    }
}

fn handle_window(args: WindowArgs) -> Result<(), AppError> {
    let zone = crate::config::zone_from_env()?;
    let now = resolve_now(args.now.as_deref(), zone)?.unwrap_or_else(|| window::now_in(zone));
    let w = window::plan(now, args.anchor_hour, args.span_days)?;
    println!("{}", crate::report::format_header(&w));
    println!("start={} end={} hours={}", w.start.to_rfc3339(), w.end.to_rfc3339(), w.span_hours());
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let env = EnvSettings::from_env(!args.dry_run)?;
    let config = config_from_args(&args, env)?;
    let report = build_report(&config)?;
    publish(&config, &report)
}

/// Largest accepted `--backoff`; four attempts then wait at most 1 + 10 + 100 s.
const MAX_BACKOFF_BASE: f64 = 10.0;

pub fn config_from_args(args: &ReportArgs, env: EnvSettings) -> Result<AppConfig, AppError> {
    if !(args.backoff.is_finite() && (0.0..=MAX_BACKOFF_BASE).contains(&args.backoff)) {
        return Err(AppError::new(
            2,
            format!("Backoff base must be between 0 and {MAX_BACKOFF_BASE} (got {}).", args.backoff),
        ));
    }
    if !(args.trend_threshold.is_finite() && args.trend_threshold >= 0.0) {
        return Err(AppError::new(
            2,
            format!("Trend threshold must be >= 0 (got {}).", args.trend_threshold),
        ));
    }
    // Validates tolerance against the cadence before any network work.
    GridAligner::half_hourly(args.tolerance_min)?;

    let now = resolve_now(args.window.now.as_deref(), env.zone)?;
    let chart_dir = if args.no_charts {
        None
    } else {
        Some(
            args.chart_dir
                .clone()
                .unwrap_or_else(|| std::env::temp_dir().join("station-report")),
        )
    };

    Ok(AppConfig {
        anchor_hour: args.window.anchor_hour,
        span_days: args.window.span_days,
        tolerance_minutes: args.tolerance_min,
        fetch: FetchSettings {
            page_size: args.page_size.max(1),
            policy: RetryPolicy {
                max_attempts: args.retries.max(1),
                base: args.backoff,
                ..RetryPolicy::default()
            },
            encoding: args.range_encoding,
        },
        concurrency: args.concurrency.max(1),
        trend_threshold: args.trend_threshold,
        now,
        dry_run: args.dry_run,
        chart_dir,
        export_json: args.export_json.clone(),
        env,
    })
}

fn resolve_now(raw: Option<&str>, zone: Tz) -> Result<Option<DateTime<Tz>>, AppError> {
    raw.map(|s| normalize(s, zone).map_err(|e| AppError::new(2, format!("Invalid --now '{s}': {e}"))))
        .transpose()
}

/// Plan the window, fetch every channel over HTTP and collect the results.
pub fn build_report(config: &AppConfig) -> Result<Report, AppError> {
    let zone = config.zone();
    let now = config.now.unwrap_or_else(|| window::now_in(zone));
    let window = window::plan(now, config.anchor_hour, config.span_days)?;
    log::info!(
        "window {} → {} ({}h, {} channels)",
        window.start.format("%Y-%m-%d %H:%M"),
        window.end.format("%Y-%m-%d %H:%M"),
        window.span_hours(),
        config.channels().len()
    );

    let source = HttpFeedSource::new(&config.env.base_url, &config.env.io_username, &config.env.io_key)?;
    let results = assemble_with(source, ThreadSleeper, config, &window)?;

    Ok(Report {
        window,
        generated_at: window::now_in(zone),
        results,
    })
}

/// Run all configured channels against any feed source.
pub fn assemble_with<S: FeedSource, C: Sleeper>(
    source: S,
    sleeper: C,
    config: &AppConfig,
    window: &ReportingWindow,
) -> Result<Vec<ChannelResult>, AppError> {
    let pipeline = Pipeline {
        fetcher: FeedFetcher::new(source, sleeper, config.fetch),
        aligner: GridAligner::half_hourly(config.tolerance_minutes)?,
        zone: config.zone(),
        trend_threshold: config.trend_threshold,
    };
    ReportAssembler::new(pipeline, config.concurrency).assemble(config.channels(), window)
}

fn publish(config: &AppConfig, report: &Report) -> Result<(), AppError> {
    let summary = format_summary(report);
    let charts = render_charts(config, report);

    let sink: Box<dyn NotificationSink> = match (&config.env.telegram, config.dry_run) {
        (Some(credentials), false) => Box::new(TelegramSink::new(credentials)?),
        _ => Box::new(StdoutSink),
    };
    let failures = crate::notify::deliver(sink.as_ref(), &summary, &charts);
    if failures > 0 {
        log::warn!("{failures} message(s) could not be delivered");
    }

    if let Some(path) = &config.export_json {
        crate::io::write_report_json(path, report, config.tolerance_minutes)?;
        log::info!("report written to {}", path.display());
    }

    let failed = report.results.iter().filter(|r| r.error.is_some()).count();
    log::info!(
        "report done: {} channels, {failed} failed, {} charts",
        report.results.len(),
        charts.len()
    );
    Ok(())
}

/// One chart per channel with aligned data; render failures are logged and skipped.
fn render_charts(config: &AppConfig, report: &Report) -> Vec<(Artifact, String)> {
    let Some(dir) = &config.chart_dir else {
        return Vec::new();
    };
    let renderer: Box<dyn Renderer> = if config.dry_run {
        Box::new(TextRenderer::default())
    } else {
        Box::new(SvgRenderer::new(dir.clone()))
    };

    report
        .results
        .iter()
        .filter(|r| !r.aligned.is_empty())
        .filter_map(|r| {
            let request = ChartRequest {
                channel: &r.channel,
                points: &r.aligned,
                window: &report.window,
            };
            match renderer.render(&request) {
                Ok(artifact) => Some((artifact, format_caption(&r.channel, &report.window))),
                Err(e) => {
                    log::warn!("{}: chart skipped: {e}", r.channel.key);
                    None
                }
            }
        })
        .collect()
}

/// Rewrite argv so the bare binary defaults to `report`.
///
/// Rules:
/// - `station-report`                   -> `station-report report`
/// - `station-report --dry-run ...`     -> `station-report report --dry-run ...`
/// - `station-report --help/--version`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("report".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "report".to_string());
    }
    argv
}
