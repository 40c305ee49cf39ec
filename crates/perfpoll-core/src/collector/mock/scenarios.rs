//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing the counter source and collectors.

use super::filesystem::MockFs;

/// `/proc/stat` of the typical system: aggregate line plus four CPUs.
pub const TYPICAL_STAT: &str = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
";

/// `/proc/diskstats` of the typical system: two disks, their partitions and a loop device.
pub const TYPICAL_DISKSTATS: &str = "\
   7       0 loop0 10 0 20 0 0 0 0 0 0 4 0 0 0 0 0
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
 259       1 nvme0n1p1 40000 150 1600000 9000 25000 100 1200000 7000 2 12000 16000 0 0 0 0
";

impl MockFs {
    /// Creates a typical 4-CPU system with two disks.
    ///
    /// Provides every file the `/proc` counter source reads:
    /// `stat`, `diskstats`, `meminfo` and `loadavg`.
    pub fn typical_system() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 3/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
",
        );
        fs.add_file("/proc/stat", TYPICAL_STAT);
        fs.add_file("/proc/diskstats", TYPICAL_DISKSTATS);

        fs
    }

    /// Creates a system exposing only `/proc/stat`.
    ///
    /// `Memory`, `PhysicalDisk` and `System` categories are unavailable here.
    pub fn cpu_only_system() -> Self {
        let fs = Self::new();
        fs.add_file("/proc/stat", TYPICAL_STAT);
        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn test_typical_system_has_all_sources() {
        let fs = MockFs::typical_system();
        for file in ["stat", "diskstats", "meminfo", "loadavg"] {
            assert!(fs.exists(&Path::new("/proc").join(file)), "{file}");
        }
    }

    #[test]
    fn test_cpu_only_system() {
        let fs = MockFs::cpu_only_system();
        assert!(fs.exists(Path::new("/proc/stat")));
        assert!(!fs.exists(Path::new("/proc/meminfo")));
    }
}
