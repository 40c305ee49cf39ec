//! Timer-thread ticker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, trace};

use super::{ActiveSchedule, SharedCollector, Ticker, check_period, sweep};
use crate::error::Error;

/// Ticker running each schedule on its own named thread.
///
/// The thread waits on a cancellation channel with a deadline, so
/// cancelling wakes it immediately instead of after the current period.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadTimer;

impl ThreadTimer {
    pub fn new() -> Self {
        Self
    }
}

impl Ticker for ThreadTimer {
    fn name(&self) -> &'static str {
        "timer"
    }

    fn schedule(
        &self,
        period: Duration,
        collector: SharedCollector,
    ) -> Result<Box<dyn ActiveSchedule>, Error> {
        check_period(period)?;

        let (cancel, cancelled) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("perfpoll-timer".to_string())
            .spawn(move || run(period, &collector, &cancelled))
            .map_err(Error::Spawn)?;

        Ok(Box::new(TimerSchedule {
            cancel: Some(cancel),
            thread: Some(thread),
        }))
    }
}

fn run(period: Duration, collector: &SharedCollector, cancelled: &Receiver<()>) {
    let mut deadline = Instant::now() + period;
    let mut tick: u64 = 0;

    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match cancelled.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        tick += 1;
        let started = Instant::now();
        if panic::catch_unwind(AssertUnwindSafe(|| sweep(collector))).is_err() {
            error!(tick, "sampling sweep panicked");
        }
        trace!(
            tick,
            duration_ms = started.elapsed().as_millis() as u64,
            "sweep completed"
        );

        // An overrun delays the schedule rather than bunching up ticks.
        deadline += period;
        let now = Instant::now();
        if deadline < now {
            deadline = now + period;
        }
    }

    debug!(ticks = tick, "timer thread exiting");
}

struct TimerSchedule {
    cancel: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ActiveSchedule for TimerSchedule {
    fn cancel(mut self: Box<Self>) {
        // Dropping the sender disconnects the channel and wakes the thread.
        drop(self.cancel.take());

        if let Some(thread) = self.thread.take() {
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                error!("timer thread panicked");
            }
        }
    }
}
