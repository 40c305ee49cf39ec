//! Mock filesystem implementations for testing.
//!
//! This module provides `MockFs` and pre-built scenarios for exercising
//! counters without requiring actual Linux `/proc` filesystem access.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::{TYPICAL_DISKSTATS, TYPICAL_STAT};
