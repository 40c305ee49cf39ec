//! Sampling of counters.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SamplingCollector                       │
//! │   handles: [CounterHandle, …]   on_value   on_error?        │
//! │                                                             │
//! │   collect(): for each handle → next_value()                 │
//! │                 Ok(v)  → on_value(handle, v)                │
//! │                 Err(e) → on_error(handle, e) | dropped      │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                │
//!                         ┌──────▼──────┐
//!                         │CounterSource│ (trait)
//!                         └──────┬──────┘
//!                         ┌──────▼──────┐
//!                         │ FileSystem  │ (trait)
//!                         └──────┬──────┘
//!                 ┌──────────────┼──────────────┐
//!          ┌──────▼──────┐ ┌─────▼───────┐ ┌────▼────────┐
//!          │   RealFs    │ │   MockFs    │ │  Scenarios  │
//!          │ (Linux)     │ │ (Testing)   │ │ (Fixtures)  │
//!          └─────────────┘ └─────────────┘ └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use perfpoll_core::collector::{MockFs, SamplingCollector};
//! use perfpoll_core::counter::{CounterFactory, ProcfsSource};
//!
//! let source = ProcfsSource::new(MockFs::typical_system(), "/proc");
//! let factory = CounterFactory::new(Arc::new(source));
//!
//! let mut collector = SamplingCollector::builder()
//!     .handles(factory.create_category("Memory").unwrap())
//!     .on_value(|counter, value| println!("{}: {}", counter.id(), value))
//!     .on_error(|counter, error| eprintln!("{}: {}", counter.id(), error))
//!     .build()
//!     .unwrap();
//!
//! collector.collect();
//! collector.dispose();
//! ```

pub mod mock;
mod sampling;
pub mod traits;

pub use mock::MockFs;
pub use sampling::{CollectorBuilder, ErrorHandler, SamplingCollector, ValueHandler};
pub use traits::{FileSystem, RealFs};
