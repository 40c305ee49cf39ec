//! Conversion of raw counter readings into sampled values.

use std::time::Instant;

/// One raw reading taken from the counter subsystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Raw counter value (cumulative for delta kinds).
    pub value: f64,
    /// Denominator for `Ratio` counters, ignored otherwise.
    pub base: f64,
    pub taken_at: Instant,
}

impl RawSample {
    pub fn new(value: f64, taken_at: Instant) -> Self {
        Self {
            value,
            base: 0.0,
            taken_at,
        }
    }

    pub fn with_base(mut self, base: f64) -> Self {
        self.base = base;
        self
    }
}

/// How raw readings of a counter become a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    /// Instantaneous value, reported as read.
    Gauge,
    /// Delta of a cumulative value per elapsed second.
    RatePerSecond,
    /// Delta of the value over delta of the base, as a percentage.
    Ratio,
    /// Delta of busy milliseconds over elapsed wall-clock milliseconds, as a percentage.
    ElapsedPercent,
}

impl CounterKind {
    /// Computes the value from the current and (optional) previous reading.
    ///
    /// Delta kinds yield `0.0` without a previous reading, when the counter
    /// went backwards, or when no time (or base) elapsed.
    pub fn compute(self, previous: Option<&RawSample>, current: &RawSample) -> f32 {
        if self == CounterKind::Gauge {
            return current.value as f32;
        }
        let Some(previous) = previous else {
            return 0.0;
        };

        let delta = current.value - previous.value;
        if delta < 0.0 {
            return 0.0;
        }
        let elapsed = current
            .taken_at
            .saturating_duration_since(previous.taken_at)
            .as_secs_f64();

        let value = match self {
            CounterKind::Gauge => unreachable!("handled above"),
            CounterKind::RatePerSecond => {
                if elapsed <= 0.0 {
                    return 0.0;
                }
                delta / elapsed
            }
            CounterKind::Ratio => {
                let base = current.base - previous.base;
                if base <= 0.0 {
                    return 0.0;
                }
                (delta / base * 100.0).clamp(0.0, 100.0)
            }
            CounterKind::ElapsedPercent => {
                if elapsed <= 0.0 {
                    return 0.0;
                }
                (delta / (elapsed * 1000.0) * 100.0).clamp(0.0, 100.0)
            }
        };

        value as f32
    }
}
