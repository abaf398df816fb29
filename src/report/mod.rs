//! Report assembly: run every channel's pipeline on a bounded pool.
//!
//! Each channel is an isolated unit of work:
//! - a pipeline error becomes that channel's `error`
//! - a panic inside a channel is caught and recorded the same way
//! - siblings are never affected
//!
//! Results come back in configured order (rayon's indexed collect keeps input
//! order), so formatting needs no sort.

use std::panic::{AssertUnwindSafe, catch_unwind};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::app::pipeline::Pipeline;
use crate::data::{FeedSource, Sleeper};
use crate::domain::{ChannelResult, ChannelSpec, ReportingWindow};
use crate::error::{AppError, DataError, ErrorKind};

pub mod format;

pub use format::*;

pub struct ReportAssembler<S, C> {
    pipeline: Pipeline<S, C>,
    concurrency: usize,
}

impl<S: FeedSource, C: Sleeper> ReportAssembler<S, C> {
    pub fn new(pipeline: Pipeline<S, C>, concurrency: usize) -> Self {
        Self {
            pipeline,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// One result per channel, in the order given.
    ///
    /// Only failing to build the worker pool is an `Err`; per-channel problems
    /// are carried inside the results.
    pub fn assemble(
        &self,
        channels: &[ChannelSpec],
        window: &ReportingWindow,
    ) -> Result<Vec<ChannelResult>, AppError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("channel-{i}"))
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build worker pool: {e}")))?;

        log::info!(
            "assembling {} channels with {} workers",
            channels.len(),
            self.concurrency
        );

        let results = pool.install(|| {
            channels
                .par_iter()
                .map(|ch| self.run_isolated(ch, window))
                .collect::<Vec<_>>()
        });
        Ok(results)
    }

    fn run_isolated(&self, channel: &ChannelSpec, window: &ReportingWindow) -> ChannelResult {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.pipeline.run_channel(channel, window)));
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                log::error!("{}: {err}", channel.key);
                ChannelResult::failed(channel.clone(), as_channel_failure(err))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!("{}: pipeline panicked: {msg}", channel.key);
                ChannelResult::failed(
                    channel.clone(),
                    DataError::new(ErrorKind::ChannelPipelineFailure, format!("panic: {msg}")),
                )
            }
        }
    }
}

fn as_channel_failure(err: DataError) -> DataError {
    if err.kind() == ErrorKind::ChannelPipelineFailure {
        err
    } else {
        DataError::new(ErrorKind::ChannelPipelineFailure, err.to_string())
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
