//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parsed samples and aligned grid points (`Sample`, `AlignedPoint`)
//! - the reporting window (`ReportingWindow`)
//! - per-channel outputs (`Stats`, `Trend`, `ChannelResult`, `Report`)

pub mod types;

pub use types::*;
