//! perfpolld - performance counter polling daemon.
//!
//! Resolves the requested counters from `/proc`, samples them on a fixed
//! interval and logs every value (or sampling error) until interrupted.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use perfpoll_core::collector::{RealFs, SamplingCollector};
use perfpoll_core::counter::{CounterFactory, CounterHandle, CounterId, ProcfsSource};
use perfpoll_core::schedule::{Driver, IntervalTimerDriver, Ticker, TokioInterval};
use perfpoll_core::Error;

/// Counters sampled when none are requested.
const DEFAULT_COUNTERS: &[&str] = &[
    r"\Processor(_Total)\% Processor Time",
    r"\PhysicalDisk(_Total)\% Disk Time",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DriverKind {
    /// Dedicated timer thread.
    Timer,
    /// Tokio interval stream.
    Reactive,
}

/// Performance counter polling daemon.
#[derive(Parser)]
#[command(name = "perfpolld", about = "Performance counter polling daemon", version)]
struct Args {
    /// Sampling interval in milliseconds.
    #[arg(short, long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    /// Counter path to sample, `\Category(Instance)\Counter` or `\Category\Counter`.
    /// May be repeated.
    #[arg(short, long = "counter", value_name = "PATH", value_parser = parse_counter_path)]
    counters: Vec<CounterId>,

    /// Sample every counter of every instance of a category. May be repeated.
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,

    /// Scheduling driver.
    #[arg(long, value_enum, default_value = "timer")]
    driver: DriverKind,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// List available categories, instances and counters, then exit.
    #[arg(long)]
    list: bool,

    /// Stop after this many seconds instead of running until Ctrl-C.
    #[arg(long, value_name = "SECS")]
    duration_secs: Option<u64>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Parses a counter path like `\Processor(_Total)\% Processor Time`.
///
/// The leading backslash is optional. Counter names may contain `/`
/// (`Disk Reads/sec`), so only `\` separates the parts.
fn parse_counter_path(s: &str) -> Result<CounterId, String> {
    let path = s.trim();
    let path = path.strip_prefix('\\').unwrap_or(path);

    let (object, counter) = path
        .split_once('\\')
        .ok_or_else(|| format!("invalid counter path '{}': expected \\Category\\Counter", s))?;
    if counter.is_empty() || counter.contains('\\') {
        return Err(format!("invalid counter path '{}': bad counter name", s));
    }

    let id = match object.split_once('(') {
        Some((category, rest)) => {
            let instance = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("invalid counter path '{}': unclosed instance", s))?;
            if instance.is_empty() {
                return Err(format!("invalid counter path '{}': empty instance", s));
            }
            CounterId::new(category, counter).with_instance(instance)
        }
        None => CounterId::new(object, counter),
    };

    if id.category.is_empty() {
        return Err(format!("invalid counter path '{}': empty category", s));
    }
    Ok(id)
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("perfpolld={}", level).parse().unwrap())
        .add_directive(format!("perfpoll_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Prints every category with its instances and counters.
fn list(factory: &CounterFactory) -> Result<(), Error> {
    for category in factory.categories()? {
        let instances = factory.instances(&category)?;
        if instances.is_empty() {
            println!("{category}");
        } else {
            println!("{category} ({})", instances.join(", "));
        }
        for counter in factory.counters(&category)? {
            println!("    {counter}");
        }
    }
    Ok(())
}

/// Opens requested counters and expanded categories.
fn open_handles(factory: &CounterFactory, args: &Args) -> Result<Vec<CounterHandle>, Error> {
    let mut handles = Vec::new();

    let defaults;
    let counters = if args.counters.is_empty() && args.categories.is_empty() {
        defaults = DEFAULT_COUNTERS
            .iter()
            .filter_map(|path| parse_counter_path(path).ok())
            .collect::<Vec<_>>();
        &defaults
    } else {
        &args.counters
    };

    for id in counters {
        let handle = match &id.instance {
            Some(instance) => factory.create_instance(&id.category, &id.counter, instance)?,
            None => factory.create(&id.category, &id.counter)?,
        };
        handles.push(handle);
    }
    for category in &args.categories {
        handles.extend(factory.create_category(category)?);
    }

    Ok(handles)
}

fn build_collector(handles: Vec<CounterHandle>, errors: Arc<AtomicU64>) -> Result<SamplingCollector, Error> {
    SamplingCollector::builder()
        .handles(handles)
        .on_value(|counter, value| info!("{} = {:.2}", counter.id(), value))
        .on_error(move |counter, e| {
            errors.fetch_add(1, Ordering::Relaxed);
            warn!("{}: {}", counter.id(), e);
        })
        .build()
}

/// Starts the driver and blocks until shutdown is requested or the duration elapses.
fn run<T: Ticker>(mut driver: Driver<T>, deadline: Option<Instant>) -> Result<(), Error> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    driver.start()?;

    // Sleep with periodic checks for shutdown signal
    let sleep_interval = Duration::from_millis(100);
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Run duration elapsed");
            break;
        }
        std::thread::sleep(sleep_interval);
    }

    info!("Shutting down...");
    driver.dispose();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let source = ProcfsSource::new(RealFs::new(), args.proc_path.clone());
    let factory = CounterFactory::new(Arc::new(source));

    if args.list {
        return match list(&factory) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Failed to list counters: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    info!("perfpolld {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}ms, driver={:?}, proc={}",
        args.interval_ms, args.driver, args.proc_path
    );

    let handles = match open_handles(&factory, &args) {
        Ok(handles) => handles,
        Err(e) => {
            error!("Failed to open counters: {}", e);
            return ExitCode::FAILURE;
        }
    };
    for handle in &handles {
        debug!("Counter: {}", handle.id());
    }
    info!("Sampling {} counters", handles.len());

    let errors = Arc::new(AtomicU64::new(0));
    let collector = match build_collector(handles, errors.clone()) {
        Ok(collector) => collector,
        Err(e) => {
            error!("Failed to create collector: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let interval = Duration::from_millis(args.interval_ms);
    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));

    let result = match args.driver {
        DriverKind::Timer => IntervalTimerDriver::new(collector, interval)
            .and_then(|driver| run(driver, deadline)),
        DriverKind::Reactive => {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_time()
                .thread_name("perfpolld-rt")
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start tokio runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            let ticker = TokioInterval::new(runtime.handle().clone());
            Driver::with_ticker(collector, interval, ticker).and_then(|driver| run(driver, deadline))
        }
    };

    if let Err(e) = result {
        error!("Sampling failed: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        "Shutdown complete ({} sampling errors)",
        errors.load(Ordering::Relaxed)
    );
    ExitCode::SUCCESS
}
