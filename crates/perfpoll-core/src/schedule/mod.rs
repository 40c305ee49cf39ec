//! Drivers that run a [`SamplingCollector`] on a fixed period.
//!
//! A [`Driver`] owns the collector and delegates the periodic trigger to a
//! [`Ticker`]. Two tickers are provided:
//!
//! - [`ThreadTimer`] - a dedicated timer thread ([`IntervalTimerDriver`])
//! - [`TokioInterval`] - a tokio interval stream ([`ReactiveIntervalDriver`],
//!   `reactive` feature)
//!
//! Both share the same policy: the first sweep runs one full period after
//! `start()` and sweeps never overlap. Ticks keep a fixed rate while sweeps
//! fit into the period. A sweep that overruns it pushes the next tick to one
//! full period after the sweep ended, so there are no back-to-back catch-up
//! sweeps.

#[cfg(feature = "reactive")]
mod reactive;
mod timer;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::collector::SamplingCollector;
use crate::error::Error;

#[cfg(feature = "reactive")]
pub use reactive::TokioInterval;
pub use timer::ThreadTimer;

/// Collector shared between a driver and its active schedule.
pub type SharedCollector = Arc<Mutex<SamplingCollector>>;

/// Driver running its collector on a dedicated timer thread.
pub type IntervalTimerDriver = Driver<ThreadTimer>;

/// Driver running its collector from a tokio interval stream.
#[cfg(feature = "reactive")]
pub type ReactiveIntervalDriver = Driver<TokioInterval>;

/// A periodic trigger mechanism.
pub trait Ticker: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Installs a trigger sweeping `collector` every `period`, first after one period.
    ///
    /// Fails with [`Error::InvalidArgument`] if `period` is zero.
    fn schedule(
        &self,
        period: Duration,
        collector: SharedCollector,
    ) -> Result<Box<dyn ActiveSchedule>, Error>;
}

/// A running schedule installed by a [`Ticker`].
pub trait ActiveSchedule: Send {
    /// Stops future ticks.
    ///
    /// A sweep already in progress runs to completion before this returns;
    /// no sweep starts afterwards.
    fn cancel(self: Box<Self>);
}

/// Rejects a zero period; every ticker needs time to pass between ticks.
pub(crate) fn check_period(period: Duration) -> Result<(), Error> {
    if period.is_zero() {
        return Err(Error::invalid("interval", "must be greater than zero"));
    }
    Ok(())
}

/// Runs one sweep of a shared collector.
pub(crate) fn sweep(collector: &SharedCollector) {
    collector
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .collect();
}

/// Owns a collector and sweeps it periodically once started.
///
/// `start()` restarts: any previous schedule is cancelled before a new one
/// is installed. `dispose()` cancels the schedule and disposes the
/// collector; after that, `start()` is ignored. Dropping the driver disposes it.
pub struct Driver<T: Ticker> {
    collector: SharedCollector,
    period: Duration,
    ticker: T,
    active: Option<Box<dyn ActiveSchedule>>,
    disposed: bool,
}

impl<T: Ticker> Driver<T> {
    /// Creates a driver with an explicit ticker.
    ///
    /// Fails if `period` is zero.
    pub fn with_ticker(
        collector: SamplingCollector,
        period: Duration,
        ticker: T,
    ) -> Result<Self, Error> {
        check_period(period)?;

        Ok(Self {
            collector: Arc::new(Mutex::new(collector)),
            period,
            ticker,
            active: None,
            disposed: false,
        })
    }

    /// Starts (or restarts) periodic sampling.
    pub fn start(&mut self) -> Result<(), Error> {
        if self.disposed {
            warn!(ticker = self.ticker.name(), "start called on disposed driver, ignoring");
            return Ok(());
        }

        self.cancel_active();
        let schedule = self
            .ticker
            .schedule(self.period, Arc::clone(&self.collector))?;
        self.active = Some(schedule);

        info!(
            ticker = self.ticker.name(),
            period_ms = self.period.as_millis() as u64,
            "sampling started"
        );
        Ok(())
    }

    /// Stops periodic sampling, keeping the collector for a later `start()`.
    pub fn stop(&mut self) {
        if self.cancel_active() {
            info!(ticker = self.ticker.name(), "sampling stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Cancels the schedule and disposes the collector. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        self.cancel_active();
        self.collector
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .dispose();
        debug!(ticker = self.ticker.name(), "driver disposed");
    }

    fn cancel_active(&mut self) -> bool {
        match self.active.take() {
            Some(schedule) => {
                schedule.cancel();
                true
            }
            None => false,
        }
    }
}

impl Driver<ThreadTimer> {
    /// Creates a driver backed by a timer thread.
    pub fn new(collector: SamplingCollector, period: Duration) -> Result<Self, Error> {
        Self::with_ticker(collector, period, ThreadTimer::new())
    }
}

#[cfg(feature = "reactive")]
impl Driver<TokioInterval> {
    /// Creates a driver backed by an interval stream on the current tokio runtime.
    ///
    /// Fails with [`Error::NoRuntime`] outside a runtime context.
    pub fn new(collector: SamplingCollector, period: Duration) -> Result<Self, Error> {
        Self::with_ticker(collector, period, TokioInterval::current()?)
    }
}

impl<T: Ticker> Drop for Driver<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}
