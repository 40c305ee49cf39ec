//! The sampling collector: one synchronous sweep over a fixed set of counters.

use std::fmt;

use tracing::{debug, trace, warn};

use crate::counter::CounterHandle;
use crate::error::{Error, SampleError};

/// Receives every successfully sampled value.
pub type ValueHandler = Box<dyn FnMut(&CounterHandle, f32) + Send>;

/// Receives every sampling failure.
pub type ErrorHandler = Box<dyn FnMut(&CounterHandle, &SampleError) + Send>;

/// Samples a fixed set of counters and hands each result to a callback.
///
/// Failures are isolated per counter: a counter that cannot be sampled is
/// reported to the error handler (or dropped if none is set) and the sweep
/// continues with the next counter.
///
/// The collector owns its handles and releases them once, on
/// [`dispose`](Self::dispose) or drop. Calling [`collect`](Self::collect)
/// after disposal does nothing.
pub struct SamplingCollector {
    handles: Vec<CounterHandle>,
    on_value: ValueHandler,
    on_error: Option<ErrorHandler>,
    disposed: bool,
}

impl SamplingCollector {
    pub fn builder() -> CollectorBuilder {
        CollectorBuilder::default()
    }

    /// Creates a collector without an error handler.
    pub fn new<I, V>(handles: I, on_value: V) -> Result<Self, Error>
    where
        I: IntoIterator<Item = CounterHandle>,
        V: FnMut(&CounterHandle, f32) + Send + 'static,
    {
        Self::builder().handles(handles).on_value(on_value).build()
    }

    /// Samples every counter once, in construction order.
    pub fn collect(&mut self) {
        if self.disposed {
            debug!("collect called on disposed collector, ignoring");
            return;
        }

        for handle in &mut self.handles {
            match handle.next_value() {
                Ok(value) => (self.on_value)(handle, value),
                Err(e) => match self.on_error.as_mut() {
                    Some(on_error) => on_error(handle, &e),
                    None => trace!(counter = %handle.id(), error = %e, "sampling failed, no error handler"),
                },
            }
        }
    }

    /// Releases every counter. Later calls are no-ops.
    ///
    /// Release failures are logged; every counter is attempted regardless.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for handle in &mut self.handles {
            if let Err(e) = handle.release() {
                warn!(counter = %handle.id(), error = %e, "failed to release counter");
            }
        }
        debug!(counters = self.handles.len(), "collector disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn handles(&self) -> &[CounterHandle] {
        &self.handles
    }
}

impl fmt::Debug for SamplingCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingCollector")
            .field("handles", &self.handles)
            .field("has_error_handler", &self.on_error.is_some())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Drop for SamplingCollector {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Builder for [`SamplingCollector`].
///
/// At least one counter handle and a value handler are required.
#[derive(Default)]
pub struct CollectorBuilder {
    handles: Vec<CounterHandle>,
    on_value: Option<ValueHandler>,
    on_error: Option<ErrorHandler>,
}

impl CollectorBuilder {
    /// Adds one counter.
    pub fn handle(mut self, handle: CounterHandle) -> Self {
        self.handles.push(handle);
        self
    }

    /// Adds several counters, keeping their order.
    pub fn handles(mut self, handles: impl IntoIterator<Item = CounterHandle>) -> Self {
        self.handles.extend(handles);
        self
    }

    pub fn on_value<V>(mut self, on_value: V) -> Self
    where
        V: FnMut(&CounterHandle, f32) + Send + 'static,
    {
        self.on_value = Some(Box::new(on_value));
        self
    }

    pub fn on_error<E>(mut self, on_error: E) -> Self
    where
        E: FnMut(&CounterHandle, &SampleError) + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn build(self) -> Result<SamplingCollector, Error> {
        if self.handles.is_empty() {
            return Err(Error::invalid(
                "handles",
                "at least one counter handle is required",
            ));
        }
        let on_value = self
            .on_value
            .ok_or_else(|| Error::invalid("on_value", "a value handler is required"))?;

        Ok(SamplingCollector {
            handles: self.handles,
            on_value,
            on_error: self.on_error,
            disposed: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::testing::StubSource;
    use crate::counter::CounterId;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn open(source: &Arc<StubSource>, id: &CounterId) -> CounterHandle {
        CounterHandle::open(source.clone(), id.clone()).unwrap()
    }

    fn ids() -> [CounterId; 3] {
        [
            CounterId::new("Processor", "% Processor Time").with_instance("_Total"),
            CounterId::new("Memory", "Available Bytes"),
            CounterId::new("Processor", "% Idle Time").with_instance("0"),
        ]
    }

    fn recording(source: &Arc<StubSource>, log: &Log) -> SamplingCollector {
        let values = log.clone();
        let errors = log.clone();
        SamplingCollector::builder()
            .handles(ids().iter().map(|id| open(source, id)))
            .on_value(move |h, v| values.lock().unwrap().push(format!("value {} {}", h.id(), v)))
            .on_error(move |h, _| errors.lock().unwrap().push(format!("error {}", h.id())))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_handles() {
        let result = SamplingCollector::new(Vec::new(), |_, _| {});
        assert!(matches!(
            result,
            Err(Error::InvalidArgument { name: "handles", .. })
        ));
    }

    #[test]
    fn test_build_requires_value_handler() {
        let source = Arc::new(StubSource::new());
        let result = SamplingCollector::builder()
            .handle(open(&source, &ids()[1]))
            .on_error(|_, _| {})
            .build();
        assert!(matches!(
            result,
            Err(Error::InvalidArgument { name: "on_value", .. })
        ));
        // the rejected handle was still released
        assert_eq!(source.releases(), 1);
    }

    #[test]
    fn test_build_single_handle_with_and_without_error_handler() {
        let source = Arc::new(StubSource::new());
        let collector = SamplingCollector::new([open(&source, &ids()[0])], |_, _| {}).unwrap();
        assert_eq!(collector.handles().len(), 1);

        let collector = SamplingCollector::builder()
            .handle(open(&source, &ids()[0]))
            .on_value(|_, _| {})
            .on_error(|_, _| {})
            .build()
            .unwrap();
        assert!(!collector.is_disposed());
    }

    #[test]
    fn test_collect_reports_values_in_order() {
        let source = Arc::new(StubSource::new());
        let [a, b, c] = ids();
        source.set_value(&a, 12.5);
        source.set_value(&b, 2048.0);
        source.set_value(&c, 80.0);

        let log = Log::default();
        let mut collector = recording(&source, &log);
        collector.collect();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "value Processor/% Processor Time/_Total 12.5",
                "value Memory/Available Bytes/-- 2048",
                "value Processor/% Idle Time/0 80",
            ]
        );
    }

    #[test]
    fn test_failure_does_not_stop_sweep() {
        let source = Arc::new(StubSource::new());
        let [a, b, c] = ids();
        source.fail(&a);
        source.set_value(&c, 1.0);

        let log = Log::default();
        let mut collector = recording(&source, &log);
        collector.collect();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0], format!("error {}", a));
        assert_eq!(log[1], format!("value {} 0", b));
        assert_eq!(log[2], format!("value {} 1", c));
    }

    #[test]
    fn test_failure_without_error_handler_is_dropped() {
        let source = Arc::new(StubSource::new());
        let [a, b, _] = ids();
        source.fail(&a);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut collector = SamplingCollector::new(
            [open(&source, &a), open(&source, &b)],
            move |h, _| sink.lock().unwrap().push(h.id().clone()),
        )
        .unwrap();

        collector.collect();
        assert_eq!(*seen.lock().unwrap(), vec![b]);
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn test_dispose_releases_once() {
        let source = Arc::new(StubSource::new());
        let log = Log::default();
        let mut collector = recording(&source, &log);

        collector.dispose();
        collector.dispose();
        assert!(collector.is_disposed());
        assert_eq!(source.releases(), 3);

        drop(collector);
        assert_eq!(source.releases(), 3);
    }

    #[test]
    fn test_dispose_attempts_all_when_release_fails() {
        let source = Arc::new(StubSource::new());
        source.fail_releases();
        let log = Log::default();
        let mut collector = recording(&source, &log);

        collector.dispose();
        assert_eq!(source.releases(), 3);
    }

    #[test]
    fn test_collect_after_dispose_is_noop() {
        let source = Arc::new(StubSource::new());
        let log = Log::default();
        let mut collector = recording(&source, &log);

        collector.dispose();
        collector.collect();

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_drop_disposes() {
        let source = Arc::new(StubSource::new());
        let log = Log::default();
        drop(recording(&source, &log));
        assert_eq!(source.releases(), 3);
    }
}
