//! Interval-stream ticker on a tokio runtime.

use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use super::{ActiveSchedule, SharedCollector, Ticker, check_period};
use crate::error::Error;

/// Ticker subscribing each schedule to a periodic tick stream.
///
/// Every tick runs the sweep with `spawn_blocking` and waits for it before
/// pulling the next tick, so sweeps never overlap.
#[derive(Debug, Clone)]
pub struct TokioInterval {
    runtime: Handle,
}

impl TokioInterval {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime of the calling context.
    pub fn current() -> Result<Self, Error> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| Error::NoRuntime)
    }
}

/// Stream yielding the tick number every `period`, first after one period.
///
/// The consumer's work between two pulls counts against the period. If it
/// ran past the following deadline, the interval restarts one full period
/// from now instead of firing the missed tick right away.
fn ticks(period: Duration) -> impl Stream<Item = u64> {
    async_stream::stream! {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick: u64 = 0;
        loop {
            let scheduled = interval.tick().await;
            tick += 1;
            yield tick;

            if tokio::time::Instant::now() >= scheduled + period {
                interval.reset();
            }
        }
    }
}

impl Ticker for TokioInterval {
    fn name(&self) -> &'static str {
        "reactive"
    }

    fn schedule(
        &self,
        period: Duration,
        collector: SharedCollector,
    ) -> Result<Box<dyn ActiveSchedule>, Error> {
        check_period(period)?;

        let cancelled = Arc::new(AtomicBool::new(false));
        let task = {
            let collector = Arc::clone(&collector);
            let cancelled = Arc::clone(&cancelled);
            self.runtime.spawn(async move {
                let mut stream = pin!(ticks(period));
                while let Some(tick) = stream.next().await {
                    let collector = Arc::clone(&collector);
                    let cancelled = Arc::clone(&cancelled);
                    let started = Instant::now();
                    let result = tokio::task::spawn_blocking(move || {
                        let mut collector = collector.lock().unwrap_or_else(PoisonError::into_inner);
                        // checked under the lock so cancel() cannot slip in between
                        if !cancelled.load(Ordering::SeqCst) {
                            collector.collect();
                        }
                    })
                    .await;

                    match result {
                        Ok(()) => debug!(
                            tick,
                            duration_ms = started.elapsed().as_millis() as u64,
                            "sweep completed"
                        ),
                        Err(e) if e.is_panic() => {
                            error!(tick, error = %e, "sampling sweep panicked")
                        }
                        Err(_) => break,
                    }
                }
            })
        };

        Ok(Box::new(Subscription {
            task,
            cancelled,
            collector,
        }))
    }
}

struct Subscription {
    task: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
    collector: SharedCollector,
}

impl ActiveSchedule for Subscription {
    fn cancel(self: Box<Self>) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();

        // A blocking sweep outlives the aborted task; taking the lock waits
        // for one in flight, and any still queued sees the flag and skips.
        drop(
            self.collector
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
    }
}
