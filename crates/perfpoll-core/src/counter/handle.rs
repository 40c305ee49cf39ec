//! Open handle to one counter.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::counter::{CounterId, CounterKind, CounterSource, RawSample};
use crate::error::{LookupError, SampleError};

/// An open reference to one counter of a [`CounterSource`].
///
/// Keeps the previous raw reading so delta counters (rates, percentages)
/// can be computed on the next sample. The handle is released exactly once:
/// explicitly through [`release`](Self::release), or when dropped.
pub struct CounterHandle {
    id: CounterId,
    kind: CounterKind,
    source: Arc<dyn CounterSource>,
    last: Option<RawSample>,
    released: bool,
}

impl CounterHandle {
    /// Opens a counter in the given source.
    ///
    /// Fails if the source does not know the category or counter. Instance
    /// problems are only detected when sampling.
    pub fn open(source: Arc<dyn CounterSource>, id: CounterId) -> Result<Self, LookupError> {
        let kind = source.open(&id)?;
        debug!(counter = %id, ?kind, "counter opened");
        Ok(Self {
            id,
            kind,
            source,
            last: None,
            released: false,
        })
    }

    pub fn id(&self) -> &CounterId {
        &self.id
    }

    pub fn category(&self) -> &str {
        &self.id.category
    }

    pub fn counter(&self) -> &str {
        &self.id.counter
    }

    pub fn instance(&self) -> Option<&str> {
        self.id.instance.as_deref()
    }

    pub fn kind(&self) -> CounterKind {
        self.kind
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Samples the counter now and returns its value.
    ///
    /// The first sample of a delta counter returns `0.0`.
    pub fn next_value(&mut self) -> Result<f32, SampleError> {
        if self.released {
            return Err(SampleError::Released);
        }
        let current = self.source.read(&self.id)?;
        let value = self.kind.compute(self.last.as_ref(), &current);
        self.last = Some(current);
        trace!(counter = %self.id, value, "counter sampled");
        Ok(value)
    }

    /// Releases the counter in its source.
    ///
    /// Only the first call reaches the source; later calls return `Ok(())`.
    pub fn release(&mut self) -> Result<(), SampleError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.last = None;
        self.source.release(&self.id)
    }
}

impl fmt::Debug for CounterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterHandle")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for CounterHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            debug!(counter = %self.id, error = %e, "release on drop failed");
        }
    }
}
