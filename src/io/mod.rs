//! Input/output helpers.
//!
//! - JSON export of a finished report (`export`)

pub mod export;

pub use export::*;
