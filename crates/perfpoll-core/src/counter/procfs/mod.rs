//! Counter source backed by the Linux `/proc` filesystem.
//!
//! Exposes four categories:
//!
//! | Category       | Instances                    | Backing files              |
//! |----------------|------------------------------|----------------------------|
//! | `Processor`    | `_Total`, `0`, `1`, …        | `stat`                     |
//! | `PhysicalDisk` | `_Total`, one per block dev  | `diskstats`                |
//! | `Memory`       | single                       | `meminfo`                  |
//! | `System`       | single                       | `loadavg`, `stat`          |

pub mod parser;
mod source;

pub use source::ProcfsSource;

use crate::counter::CounterKind;

/// Instance name aggregating all instances of a category.
pub const TOTAL_INSTANCE: &str = "_Total";

/// Bytes per sector in `/proc/diskstats`.
const SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Processor,
    PhysicalDisk,
    Memory,
    System,
}

impl Category {
    const ALL: [Category; 4] = [
        Category::Processor,
        Category::PhysicalDisk,
        Category::Memory,
        Category::System,
    ];

    fn name(self) -> &'static str {
        match self {
            Category::Processor => "Processor",
            Category::PhysicalDisk => "PhysicalDisk",
            Category::Memory => "Memory",
            Category::System => "System",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Files under the proc root that must exist for the category to be listed.
    fn files(self) -> &'static [&'static str] {
        match self {
            Category::Processor => &["stat"],
            Category::PhysicalDisk => &["diskstats"],
            Category::Memory => &["meminfo"],
            Category::System => &["loadavg", "stat"],
        }
    }

    fn is_multi_instance(self) -> bool {
        matches!(self, Category::Processor | Category::PhysicalDisk)
    }

    fn counters(self) -> &'static [(&'static str, CounterKind)] {
        match self {
            Category::Processor => &[
                ("% Processor Time", CounterKind::Ratio),
                ("% User Time", CounterKind::Ratio),
                ("% Privileged Time", CounterKind::Ratio),
                ("% Interrupt Time", CounterKind::Ratio),
                ("% Idle Time", CounterKind::Ratio),
            ],
            Category::PhysicalDisk => &[
                ("% Disk Time", CounterKind::ElapsedPercent),
                ("Disk Reads/sec", CounterKind::RatePerSecond),
                ("Disk Writes/sec", CounterKind::RatePerSecond),
                ("Disk Read Bytes/sec", CounterKind::RatePerSecond),
                ("Disk Write Bytes/sec", CounterKind::RatePerSecond),
                ("Current Disk Queue Length", CounterKind::Gauge),
            ],
            Category::Memory => &[
                ("Available Bytes", CounterKind::Gauge),
                ("Available MBytes", CounterKind::Gauge),
                ("Cache Bytes", CounterKind::Gauge),
                ("Swap Free Bytes", CounterKind::Gauge),
            ],
            Category::System => &[
                ("Processor Queue Length", CounterKind::Gauge),
                ("Threads", CounterKind::Gauge),
                ("Context Switches/sec", CounterKind::RatePerSecond),
            ],
        }
    }

    fn counter_kind(self, counter: &str) -> Option<CounterKind> {
        self.counters()
            .iter()
            .find(|(name, _)| *name == counter)
            .map(|(_, kind)| *kind)
    }
}
