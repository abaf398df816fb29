//! Report delivery.
//!
//! Sinks return errors so callers can log them; a failed delivery never stops
//! the remaining messages from being attempted.

use std::io::Write;

use crate::error::AppError;
use crate::plot::Artifact;

pub mod telegram;

pub use telegram::TelegramSink;

pub trait NotificationSink {
    fn send_text(&self, text: &str) -> Result<(), AppError>;
    fn send_artifact(&self, artifact: &Artifact, caption: &str) -> Result<(), AppError>;
}

/// Prints everything to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn send_text(&self, text: &str) -> Result<(), AppError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{text}").map_err(|e| AppError::new(4, format!("Failed to write to stdout: {e}")))
    }

    fn send_artifact(&self, artifact: &Artifact, caption: &str) -> Result<(), AppError> {
        match artifact {
            Artifact::File(path) => self.send_text(&format!("[{caption}] {}", path.display())),
            Artifact::Text(chart) => self.send_text(chart.trim_end()),
        }
    }
}

/// Send the summary, then each chart. Returns how many messages failed.
pub fn deliver(sink: &dyn NotificationSink, summary: &str, charts: &[(Artifact, String)]) -> usize {
    let mut failures = 0;
    if let Err(e) = sink.send_text(summary) {
        log::error!("summary delivery failed: {e}");
        failures += 1;
    }
    for (artifact, caption) in charts {
        if let Err(e) = sink.send_artifact(artifact, caption) {
            log::error!("chart '{caption}' delivery failed: {e}");
            failures += 1;
        }
    }
    failures
}
