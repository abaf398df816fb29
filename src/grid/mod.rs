//! Half-hour slot grid.
//!
//! Responsibilities:
//!
//! - generate the slot instants of a reporting window
//! - reduce an irregular series to at most one point per slot

pub mod align;

pub use align::*;
