//! Scriptable in-memory counter source shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::counter::{CounterId, CounterKind, CounterSource, RawSample};
use crate::error::{LookupError, SampleError};

type Entry = (&'static [&'static str], &'static [&'static str]);

/// `Memory` is single-instance, `Processor` has `_Total` and `0`.
const CATALOG: &[(&str, &[&str], &[&str])] = &[
    ("Memory", &[], &["Available Bytes", "Cache Bytes"]),
    ("Processor", &["_Total", "0"], &["% Processor Time", "% Idle Time"]),
];

/// Counter source with scripted values and failures that counts every call.
#[derive(Default)]
pub(crate) struct StubSource {
    values: Mutex<HashMap<CounterId, f64>>,
    failing: Mutex<HashSet<CounterId>>,
    fail_release: AtomicBool,
    lookups: AtomicUsize,
    reads: AtomicUsize,
    releases: AtomicUsize,
}

impl StubSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_value(&self, id: &CounterId, value: f64) {
        self.values.lock().unwrap().insert(id.clone(), value);
    }

    pub(crate) fn fail(&self, id: &CounterId) {
        self.failing.lock().unwrap().insert(id.clone());
    }

    pub(crate) fn fail_releases(&self) {
        self.fail_release.store(true, Ordering::SeqCst);
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    fn category(&self, name: &str) -> Result<Entry, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        CATALOG
            .iter()
            .find(|(category, _, _)| *category == name)
            .map(|(_, instances, counters)| (*instances, *counters))
            .ok_or_else(|| LookupError::CategoryNotFound(name.to_string()))
    }
}

impl CounterSource for StubSource {
    fn categories(&self) -> Result<Vec<String>, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(CATALOG.iter().map(|(name, _, _)| name.to_string()).collect())
    }

    fn instances(&self, category: &str) -> Result<Vec<String>, LookupError> {
        let (instances, _) = self.category(category)?;
        Ok(instances.iter().map(|s| s.to_string()).collect())
    }

    fn counters(&self, category: &str, instance: Option<&str>) -> Result<Vec<String>, LookupError> {
        let (instances, counters) = self.category(category)?;
        if let Some(instance) = instance
            && !instances.contains(&instance)
        {
            return Err(LookupError::InstanceNotFound {
                category: category.to_string(),
                instance: instance.to_string(),
            });
        }
        Ok(counters.iter().map(|s| s.to_string()).collect())
    }

    fn open(&self, id: &CounterId) -> Result<CounterKind, LookupError> {
        let (_, counters) = self.category(&id.category)?;
        if !counters.contains(&id.counter.as_str()) {
            return Err(LookupError::CounterNotFound {
                category: id.category.clone(),
                counter: id.counter.clone(),
            });
        }
        Ok(CounterKind::Gauge)
    }

    fn read(&self, id: &CounterId) -> Result<RawSample, SampleError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(id) {
            return Err(SampleError::Parse(format!("scripted failure for {}", id)));
        }
        let value = self.values.lock().unwrap().get(id).copied().unwrap_or(0.0);
        Ok(RawSample::new(value, Instant::now()))
    }

    fn release(&self, id: &CounterId) -> Result<(), SampleError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(SampleError::Parse(format!("scripted release failure for {}", id)));
        }
        Ok(())
    }
}
