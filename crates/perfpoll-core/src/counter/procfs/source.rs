//! `CounterSource` implementation over `/proc`.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use tracing::trace;

use super::parser::{
    DiskStats, GlobalStat, is_partition, parse_diskstats, parse_global_stat, parse_loadavg,
    parse_meminfo,
};
use super::{Category, SECTOR_SIZE, TOTAL_INSTANCE};
use crate::collector::traits::FileSystem;
use crate::counter::{CounterId, CounterKind, CounterSource, RawSample};
use crate::error::{LookupError, SampleError};

/// Serves `Processor`, `PhysicalDisk`, `Memory` and `System` counters from `/proc`.
///
/// Files are re-read on every sample; the source itself keeps no per-counter
/// state, so `release` has nothing to free.
pub struct ProcfsSource<F: FileSystem> {
    fs: F,
    proc_path: String,
}

impl<F: FileSystem> ProcfsSource<F> {
    /// Creates a new `/proc` counter source.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        PathBuf::from(&self.proc_path).join(file)
    }

    fn read_file(&self, file: &str) -> io::Result<String> {
        self.fs.read_to_string(&self.path(file))
    }

    fn is_available(&self, category: Category) -> bool {
        category
            .files()
            .iter()
            .all(|file| self.fs.exists(&self.path(file)))
    }

    fn category(&self, name: &str) -> Result<Category, LookupError> {
        Category::from_name(name)
            .filter(|category| self.is_available(*category))
            .ok_or_else(|| LookupError::CategoryNotFound(name.to_string()))
    }

    fn read_stat(&self) -> Result<GlobalStat, SampleError> {
        let content = self.read_file("stat")?;
        parse_global_stat(&content).map_err(|e| SampleError::Parse(e.message))
    }

    /// Block devices from `/proc/diskstats` without loop and ram devices.
    fn read_disks(&self) -> io::Result<Vec<DiskStats>> {
        let content = self.read_file("diskstats")?;
        Ok(parse_diskstats(&content)
            .into_iter()
            .filter(|disk| !disk.device.starts_with("loop") && !disk.device.starts_with("ram"))
            .collect())
    }

    fn instance_names(&self, category: Category) -> Result<Vec<String>, LookupError> {
        let mut names = vec![TOTAL_INSTANCE.to_string()];
        match category {
            Category::Processor => {
                let stat = self.read_stat().map_err(lookup_io)?;
                names.extend(
                    stat.cpus
                        .iter()
                        .filter_map(|cpu| cpu.cpu_id)
                        .map(|id| id.to_string()),
                );
            }
            Category::PhysicalDisk => {
                names.extend(self.read_disks()?.into_iter().map(|disk| disk.device));
            }
            Category::Memory | Category::System => return Ok(Vec::new()),
        }
        Ok(names)
    }

    fn read_processor(&self, id: &CounterId, now: Instant) -> Result<RawSample, SampleError> {
        let instance = required_instance(id)?;
        let cpu_id = if instance == TOTAL_INSTANCE {
            None
        } else {
            Some(
                instance
                    .parse::<u32>()
                    .map_err(|_| instance_not_found(id, instance))?,
            )
        };

        let stat = self.read_stat()?;
        let cpu = stat
            .cpu(cpu_id)
            .ok_or_else(|| instance_not_found(id, instance))?;

        let value = match id.counter.as_str() {
            "% Processor Time" => cpu.busy(),
            "% User Time" => cpu.user + cpu.nice,
            "% Privileged Time" => cpu.system,
            "% Interrupt Time" => cpu.irq + cpu.softirq,
            "% Idle Time" => cpu.idle_total(),
            _ => return Err(unknown_counter(id)),
        };

        Ok(RawSample::new(value as f64, now).with_base(cpu.total() as f64))
    }

    fn read_disk(&self, id: &CounterId, now: Instant) -> Result<RawSample, SampleError> {
        let instance = required_instance(id)?;
        let disks = self.read_disks()?;

        let disk = if instance == TOTAL_INSTANCE {
            disks
                .iter()
                .filter(|disk| !is_partition(&disk.device, &disks))
                .fold(DiskStats::default(), |mut total, disk| {
                    total.reads += disk.reads;
                    total.read_sectors += disk.read_sectors;
                    total.writes += disk.writes;
                    total.write_sectors += disk.write_sectors;
                    total.io_in_progress += disk.io_in_progress;
                    total.io_time += disk.io_time;
                    total
                })
        } else {
            disks
                .into_iter()
                .find(|disk| disk.device == instance)
                .ok_or_else(|| instance_not_found(id, instance))?
        };

        let value = match id.counter.as_str() {
            "% Disk Time" => disk.io_time,
            "Disk Reads/sec" => disk.reads,
            "Disk Writes/sec" => disk.writes,
            "Disk Read Bytes/sec" => disk.read_sectors * SECTOR_SIZE,
            "Disk Write Bytes/sec" => disk.write_sectors * SECTOR_SIZE,
            "Current Disk Queue Length" => disk.io_in_progress,
            _ => return Err(unknown_counter(id)),
        };

        Ok(RawSample::new(value as f64, now))
    }

    fn read_memory(&self, id: &CounterId, now: Instant) -> Result<RawSample, SampleError> {
        no_instance(id)?;
        let content = self.read_file("meminfo")?;
        let info = parse_meminfo(&content).map_err(|e| SampleError::Parse(e.message))?;

        let value = match id.counter.as_str() {
            "Available Bytes" => info.mem_available as f64,
            "Available MBytes" => (info.mem_available / (1024 * 1024)) as f64,
            "Cache Bytes" => info.cached as f64,
            "Swap Free Bytes" => info.swap_free as f64,
            _ => return Err(unknown_counter(id)),
        };

        Ok(RawSample::new(value, now))
    }

    fn read_system(&self, id: &CounterId, now: Instant) -> Result<RawSample, SampleError> {
        no_instance(id)?;

        let value = match id.counter.as_str() {
            "Processor Queue Length" | "Threads" => {
                let content = self.read_file("loadavg")?;
                let load = parse_loadavg(&content).map_err(|e| SampleError::Parse(e.message))?;
                let count = if id.counter == "Threads" {
                    load.total
                } else {
                    load.running
                };
                count as f64
            }
            "Context Switches/sec" => self.read_stat()?.ctxt as f64,
            _ => return Err(unknown_counter(id)),
        };

        Ok(RawSample::new(value, now))
    }
}

impl<F: FileSystem> CounterSource for ProcfsSource<F> {
    fn categories(&self) -> Result<Vec<String>, LookupError> {
        Ok(Category::ALL
            .into_iter()
            .filter(|category| self.is_available(*category))
            .map(|category| category.name().to_string())
            .collect())
    }

    fn instances(&self, category: &str) -> Result<Vec<String>, LookupError> {
        let category = self.category(category)?;
        self.instance_names(category)
    }

    fn counters(&self, category: &str, instance: Option<&str>) -> Result<Vec<String>, LookupError> {
        let resolved = self.category(category)?;
        if let Some(instance) = instance
            && !self.instance_names(resolved)?.iter().any(|name| name == instance)
        {
            return Err(LookupError::InstanceNotFound {
                category: category.to_string(),
                instance: instance.to_string(),
            });
        }
        Ok(resolved
            .counters()
            .iter()
            .map(|(name, _)| name.to_string())
            .collect())
    }

    fn open(&self, id: &CounterId) -> Result<CounterKind, LookupError> {
        let category = self.category(&id.category)?;
        category
            .counter_kind(&id.counter)
            .ok_or_else(|| LookupError::CounterNotFound {
                category: id.category.clone(),
                counter: id.counter.clone(),
            })
    }

    fn read(&self, id: &CounterId) -> Result<RawSample, SampleError> {
        let now = Instant::now();
        let sample = match Category::from_name(&id.category) {
            Some(Category::Processor) => self.read_processor(id, now),
            Some(Category::PhysicalDisk) => self.read_disk(id, now),
            Some(Category::Memory) => self.read_memory(id, now),
            Some(Category::System) => self.read_system(id, now),
            None => Err(unknown_counter(id)),
        }?;
        trace!(counter = %id, value = sample.value, base = sample.base, "raw sample");
        Ok(sample)
    }
}

fn required_instance(id: &CounterId) -> Result<&str, SampleError> {
    id.instance
        .as_deref()
        .ok_or_else(|| SampleError::InstanceRequired {
            category: id.category.clone(),
        })
}

fn no_instance(id: &CounterId) -> Result<(), SampleError> {
    match &id.instance {
        Some(instance) => Err(instance_not_found(id, instance)),
        None => Ok(()),
    }
}

fn instance_not_found(id: &CounterId, instance: &str) -> SampleError {
    SampleError::InstanceNotFound {
        category: id.category.clone(),
        instance: instance.to_string(),
    }
}

fn unknown_counter(id: &CounterId) -> SampleError {
    SampleError::Parse(format!("unknown counter {}", id))
}

fn lookup_io(e: SampleError) -> LookupError {
    match e {
        SampleError::Io(e) => LookupError::Io(e),
        other => LookupError::Io(io::Error::new(io::ErrorKind::InvalidData, other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use crate::counter::CounterHandle;
    use std::sync::Arc;

    fn source() -> (MockFs, Arc<ProcfsSource<MockFs>>) {
        let fs = MockFs::typical_system();
        (fs.clone(), Arc::new(ProcfsSource::new(fs, "/proc")))
    }

    fn handle(source: &Arc<ProcfsSource<MockFs>>, id: CounterId) -> CounterHandle {
        CounterHandle::open(source.clone(), id).unwrap()
    }

    #[test]
    fn test_categories_follow_available_files() {
        let (_, source) = source();
        assert_eq!(
            source.categories().unwrap(),
            vec!["Processor", "PhysicalDisk", "Memory", "System"]
        );

        let cpu_only = ProcfsSource::new(MockFs::cpu_only_system(), "/proc");
        assert_eq!(cpu_only.categories().unwrap(), vec!["Processor"]);
        assert!(matches!(
            cpu_only.instances("Memory"),
            Err(LookupError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_instances() {
        let (_, source) = source();
        assert_eq!(
            source.instances("Processor").unwrap(),
            vec!["_Total", "0", "1", "2", "3"]
        );
        assert_eq!(
            source.instances("PhysicalDisk").unwrap(),
            vec!["_Total", "sda", "sda1", "nvme0n1", "nvme0n1p1"]
        );
        assert!(source.instances("Memory").unwrap().is_empty());
        assert!(source.instances("System").unwrap().is_empty());
    }

    #[test]
    fn test_counters_validate_instance() {
        let (_, source) = source();
        assert_eq!(source.counters("Memory", None).unwrap().len(), 4);
        assert_eq!(source.counters("Processor", Some("2")).unwrap().len(), 5);
        assert!(matches!(
            source.counters("Processor", Some("9")),
            Err(LookupError::InstanceNotFound { .. })
        ));
        assert!(matches!(
            source.counters("Memory", Some("_Total")),
            Err(LookupError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_open_resolves_kind() {
        let (_, source) = source();
        let kind = source
            .open(&CounterId::new("PhysicalDisk", "% Disk Time").with_instance("sda"))
            .unwrap();
        assert_eq!(kind, CounterKind::ElapsedPercent);

        assert!(matches!(
            source.open(&CounterId::new("Processor", "Nope")),
            Err(LookupError::CounterNotFound { .. })
        ));
        assert!(matches!(
            source.open(&CounterId::new("GPU", "% Busy")),
            Err(LookupError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_processor_time_over_two_samples() {
        let (fs, source) = source();
        let mut cpu = handle(
            &source,
            CounterId::new("Processor", "% Processor Time").with_instance("_Total"),
        );

        assert_eq!(cpu.next_value().unwrap(), 0.0);

        // +100 user, +300 idle → 25% busy
        fs.add_file(
            "/proc/stat",
            "\
cpu  10100 500 3000 80300 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
ctxt 500100
procs_running 2
",
        );
        assert_eq!(cpu.next_value().unwrap(), 25.0);
    }

    #[test]
    fn test_processor_requires_known_instance() {
        let (_, source) = source();

        let mut missing = handle(&source, CounterId::new("Processor", "% Processor Time"));
        assert!(matches!(
            missing.next_value(),
            Err(SampleError::InstanceRequired { .. })
        ));

        let mut unknown = handle(
            &source,
            CounterId::new("Processor", "% Processor Time").with_instance("7"),
        );
        assert!(matches!(
            unknown.next_value(),
            Err(SampleError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_disk_total_skips_partitions() {
        let (_, source) = source();
        let raw = source
            .read(&CounterId::new("PhysicalDisk", "Disk Reads/sec").with_instance("_Total"))
            .unwrap();
        assert_eq!(raw.value, (12345 + 50000) as f64);

        let raw = source
            .read(&CounterId::new("PhysicalDisk", "Disk Write Bytes/sec").with_instance("sda"))
            .unwrap();
        assert_eq!(raw.value, (456789 * 512) as f64);
    }

    #[test]
    fn test_disk_total_keeps_numbered_whole_devices() {
        let (fs, source) = source();
        fs.add_file(
            "/proc/diskstats",
            "\
   9       1 md1 100 0 1 0 1 0 1 0 0 1 1 0 0 0 0
   9     127 md127 20 0 1 0 1 0 1 0 0 1 1 0 0 0 0
 253       1 dm-1 3 0 1 0 1 0 1 0 0 1 1 0 0 0 0
 253      10 dm-10 4000 0 1 0 1 0 1 0 0 1 1 0 0 0 0
",
        );

        let raw = source
            .read(&CounterId::new("PhysicalDisk", "Disk Reads/sec").with_instance("_Total"))
            .unwrap();
        assert_eq!(raw.value, (100 + 20 + 3 + 4000) as f64);
    }

    #[test]
    fn test_disk_vanishing_is_sample_error() {
        let (fs, source) = source();
        let mut disk = handle(
            &source,
            CounterId::new("PhysicalDisk", "Current Disk Queue Length").with_instance("nvme0n1"),
        );
        assert_eq!(disk.next_value().unwrap(), 5.0);

        fs.add_file(
            "/proc/diskstats",
            "   8       0 sda 1 0 1 0 1 0 1 0 0 1 1 0 0 0 0\n",
        );
        assert!(matches!(
            disk.next_value(),
            Err(SampleError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_memory_and_system_gauges() {
        let (_, source) = source();

        let mut available = handle(&source, CounterId::new("Memory", "Available MBytes"));
        assert_eq!(available.next_value().unwrap(), (12000000 / 1024) as f32);

        let mut queue = handle(&source, CounterId::new("System", "Processor Queue Length"));
        assert_eq!(queue.next_value().unwrap(), 3.0);

        let mut threads = handle(&source, CounterId::new("System", "Threads"));
        assert_eq!(threads.next_value().unwrap(), 150.0);

        let mut qualified = handle(
            &source,
            CounterId::new("Memory", "Available Bytes").with_instance("_Total"),
        );
        assert!(matches!(
            qualified.next_value(),
            Err(SampleError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let (fs, source) = source();
        let mut available = handle(&source, CounterId::new("Memory", "Cache Bytes"));
        fs.remove_file("/proc/meminfo");
        assert!(matches!(available.next_value(), Err(SampleError::Io(_))));
    }
}
