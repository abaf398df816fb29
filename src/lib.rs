//! `station-report` library crate.
//!
//! The binary is a thin wrapper around this library so that:
//!
//! - the fetch/align/stats core is testable without spawning processes or
//!   touching the network
//! - delivery (Telegram, stdout) and rendering stay swappable behind traits

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod grid;
pub mod io;
pub mod notify;
pub mod plot;
pub mod report;
pub mod stats;
pub mod window;
