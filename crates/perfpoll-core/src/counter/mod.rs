//! Named performance counters.
//!
//! A counter is addressed by category, counter name and an optional instance
//! (e.g. `Processor / % Processor Time / _Total`). Counters are served by a
//! [`CounterSource`], the abstraction over the OS counter subsystem, and
//! sampled through a [`CounterHandle`].
//!
//! ```text
//!   CounterFactory ──open──▶ CounterHandle ──next_value──▶ f32
//!         │                        │
//!         └──────────┬─────────────┘
//!             ┌──────▼──────┐
//!             │CounterSource│ (trait)
//!             └──────┬──────┘
//!             ┌──────▼──────┐
//!             │ProcfsSource │ /proc/stat, diskstats, meminfo, loadavg
//!             └─────────────┘
//! ```

mod factory;
mod handle;
pub mod procfs;
#[cfg(test)]
pub(crate) mod testing;
mod value;

use std::fmt;

use crate::error::{LookupError, SampleError};

pub use factory::CounterFactory;
pub use handle::CounterHandle;
pub use procfs::ProcfsSource;
pub use value::{CounterKind, RawSample};

/// Identity of one counter: category, counter name and optional instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterId {
    pub category: String,
    pub counter: String,
    /// `None` addresses the single, unnamed instance.
    pub instance: Option<String>,
}

impl CounterId {
    pub fn new(category: impl Into<String>, counter: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            counter: counter.into(),
            instance: None,
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.category,
            self.counter,
            self.instance.as_deref().unwrap_or("--")
        )
    }
}

/// The OS counter subsystem.
///
/// Implementations resolve names, produce raw readings and track open
/// counters. `ProcfsSource` reads Linux `/proc`; tests plug in stubs.
pub trait CounterSource: Send + Sync {
    /// Lists the registered category names.
    fn categories(&self) -> Result<Vec<String>, LookupError>;

    /// Lists instance names of a category.
    ///
    /// An empty list means the category is single-instance.
    fn instances(&self, category: &str) -> Result<Vec<String>, LookupError>;

    /// Lists counter names registered under a category (and instance, if given).
    fn counters(&self, category: &str, instance: Option<&str>) -> Result<Vec<String>, LookupError>;

    /// Opens a counter, returning how its raw readings are turned into values.
    fn open(&self, id: &CounterId) -> Result<CounterKind, LookupError>;

    /// Takes a raw reading of an open counter.
    fn read(&self, id: &CounterId) -> Result<RawSample, SampleError>;

    /// Releases an open counter.
    fn release(&self, _id: &CounterId) -> Result<(), SampleError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_id_display() {
        let id = CounterId::new("Processor", "% Processor Time").with_instance("_Total");
        assert_eq!(id.to_string(), "Processor/% Processor Time/_Total");

        let id = CounterId::new("Memory", "Available Bytes");
        assert_eq!(id.to_string(), "Memory/Available Bytes/--");
    }
}
