//! Parsers for `/proc` files backing the counters.
//!
//! Pure functions over file contents, easily testable with string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Single CPU line from `/proc/stat` (jiffies).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    pub cpu_id: Option<u32>, // None for aggregate "cpu" line
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// All jiffies accounted to the CPU (guest time is already part of user).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait
            + self.irq
            + self.softirq
            + self.steal
    }

    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    pub fn busy(&self) -> u64 {
        self.total().saturating_sub(self.idle_total())
    }
}

/// Global stats from `/proc/stat`.
#[derive(Debug, Clone, Default)]
pub struct GlobalStat {
    pub cpus: Vec<CpuStat>,
    pub ctxt: u64,
}

impl GlobalStat {
    /// Finds a CPU line; `None` selects the aggregate line.
    pub fn cpu(&self, cpu_id: Option<u32>) -> Option<&CpuStat> {
        self.cpus.iter().find(|cpu| cpu.cpu_id == cpu_id)
    }
}

/// Parses `/proc/stat` content.
pub fn parse_global_stat(content: &str) -> Result<GlobalStat, ParseError> {
    let mut stat = GlobalStat::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        if parts[0].starts_with("cpu") {
            let cpu_id = if parts[0] == "cpu" {
                None
            } else {
                Some(
                    parts[0]
                        .strip_prefix("cpu")
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| ParseError::new(format!("invalid cpu label {}", parts[0])))?,
                )
            };

            let get_val =
                |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

            stat.cpus.push(CpuStat {
                cpu_id,
                user: get_val(1),
                nice: get_val(2),
                system: get_val(3),
                idle: get_val(4),
                iowait: get_val(5),
                irq: get_val(6),
                softirq: get_val(7),
                steal: get_val(8),
            });
        } else if parts[0] == "ctxt" {
            stat.ctxt = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
        }
    }

    if stat.cpus.is_empty() {
        return Err(ParseError::new("no cpu lines in stat"));
    }

    Ok(stat)
}

/// Parsed data from `/proc/meminfo` (bytes).
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    pub mem_available: u64,
    pub cached: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo` content, converting kB values to bytes.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut seen_available = false;

    let parse_kb = |line: &str| -> u64 {
        line.split_whitespace()
            .nth(1)
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0)
            * 1024
    };

    for line in content.lines() {
        if line.starts_with("MemAvailable:") {
            info.mem_available = parse_kb(line);
            seen_available = true;
        } else if line.starts_with("Cached:") {
            info.cached = parse_kb(line);
        } else if line.starts_with("SwapFree:") {
            info.swap_free = parse_kb(line);
        }
    }

    if !seen_available {
        return Err(ParseError::new("MemAvailable missing in meminfo"));
    }

    Ok(info)
}

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Default)]
pub struct LoadAvg {
    pub running: u32,
    pub total: u32,
}

/// Parses `/proc/loadavg` content.
///
/// Format: `load1 load5 load15 running/total last_pid`.
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 5 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let (running, total) = parts[3]
        .split_once('/')
        .ok_or_else(|| ParseError::new("invalid running/total field"))?;

    Ok(LoadAvg {
        running: running
            .parse()
            .map_err(|_| ParseError::new("invalid running"))?,
        total: total.parse().map_err(|_| ParseError::new("invalid total"))?,
    })
}

/// One device line from `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    pub device: String,
    pub reads: u64,
    pub read_sectors: u64,
    pub writes: u64,
    pub write_sectors: u64,
    pub io_in_progress: u64,
    /// Milliseconds spent doing I/O.
    pub io_time: u64,
}

/// Parses `/proc/diskstats` content, skipping malformed lines.
pub fn parse_diskstats(content: &str) -> Vec<DiskStats> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue;
        }

        let get_val =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            reads: get_val(3),
            read_sectors: get_val(5),
            writes: get_val(7),
            write_sectors: get_val(9),
            io_in_progress: get_val(11),
            io_time: get_val(12),
        });
    }

    disks
}

/// Whether `name` is a partition of another listed device.
///
/// Follows the kernel naming rule: a parent ending in a digit gets
/// `<parent>p<N>` partitions (`nvme0n1p1`), any other parent gets
/// `<parent><N>` (`sda1`). So `dm-10` is not a partition of `dm-1`.
pub fn is_partition(name: &str, devices: &[DiskStats]) -> bool {
    devices.iter().any(|disk| {
        let parent = disk.device.as_str();
        let Some(rest) = name.strip_prefix(parent) else {
            return false;
        };
        let number = if parent.ends_with(|c: char| c.is_ascii_digit()) {
            match rest.strip_prefix('p') {
                Some(number) => number,
                None => return false,
            }
        } else {
            rest
        };
        !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
    })
}
