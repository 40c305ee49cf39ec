//! perfpoll-core - periodic sampling of named system performance counters.
//!
//! Provides:
//! - `counter` - counter identity, handles, the `CounterSource` abstraction,
//!   the `/proc` backed source and the `CounterFactory`
//! - `collector` - the `SamplingCollector` sweep engine, filesystem
//!   abstraction and mock `/proc` for tests
//! - `schedule` - drivers that run a collector on a fixed period
//! - `error` - error types shared by the modules above
//!
//! With `reactive` feature (default):
//! - `schedule::ReactiveIntervalDriver` - tokio interval stream driver

pub mod collector;
pub mod counter;
pub mod error;
pub mod schedule;

pub use collector::{CollectorBuilder, SamplingCollector};
pub use counter::{CounterFactory, CounterHandle, CounterId, CounterKind, CounterSource};
pub use error::{Error, LookupError, SampleError};
#[cfg(feature = "reactive")]
pub use schedule::ReactiveIntervalDriver;
pub use schedule::{Driver, IntervalTimerDriver};
