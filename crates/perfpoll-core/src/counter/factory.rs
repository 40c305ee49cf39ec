//! Resolution of category/counter/instance names into counter handles.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::counter::{CounterHandle, CounterId, CounterSource};
use crate::error::Error;

/// Creates [`CounterHandle`]s from names.
///
/// Holds no state besides the source; every call resolves names afresh.
/// All name arguments are validated before the source is consulted.
#[derive(Clone)]
pub struct CounterFactory {
    source: Arc<dyn CounterSource>,
}

impl CounterFactory {
    pub fn new(source: Arc<dyn CounterSource>) -> Self {
        Self { source }
    }

    /// Creates a handle for a counter of a single-instance category.
    pub fn create(&self, category: &str, counter: &str) -> Result<CounterHandle, Error> {
        require("category", category)?;
        require("counter", counter)?;

        Ok(CounterHandle::open(
            Arc::clone(&self.source),
            CounterId::new(category, counter),
        )?)
    }

    /// Creates a handle for one instance of a counter.
    pub fn create_instance(
        &self,
        category: &str,
        counter: &str,
        instance: &str,
    ) -> Result<CounterHandle, Error> {
        require("category", category)?;
        require("counter", counter)?;
        require("instance", instance)?;

        Ok(CounterHandle::open(
            Arc::clone(&self.source),
            CounterId::new(category, counter).with_instance(instance),
        )?)
    }

    /// Creates handles for every counter of a category.
    ///
    /// For a multi-instance category this is every counter of every
    /// instance, grouped by instance. A single-instance category yields its
    /// counters without an instance qualifier.
    pub fn create_category(&self, category: &str) -> Result<Vec<CounterHandle>, Error> {
        require("category", category)?;

        let instances = self.source.instances(category)?;
        let mut handles = Vec::new();

        if instances.is_empty() {
            for counter in self.source.counters(category, None)? {
                handles.push(CounterHandle::open(
                    Arc::clone(&self.source),
                    CounterId::new(category, counter),
                )?);
            }
        } else {
            for instance in &instances {
                for counter in self.source.counters(category, Some(instance))? {
                    handles.push(CounterHandle::open(
                        Arc::clone(&self.source),
                        CounterId::new(category, counter).with_instance(instance.as_str()),
                    )?);
                }
            }
        }

        debug!(
            category,
            instances = instances.len(),
            handles = handles.len(),
            "category expanded"
        );
        Ok(handles)
    }

    /// Lists the categories known to the source.
    pub fn categories(&self) -> Result<Vec<String>, Error> {
        Ok(self.source.categories()?)
    }

    /// Lists the instances of a category (empty for single-instance categories).
    pub fn instances(&self, category: &str) -> Result<Vec<String>, Error> {
        require("category", category)?;
        Ok(self.source.instances(category)?)
    }

    /// Lists the counters of a category.
    pub fn counters(&self, category: &str) -> Result<Vec<String>, Error> {
        require("category", category)?;
        Ok(self.source.counters(category, None)?)
    }
}

impl fmt::Debug for CounterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterFactory").finish_non_exhaustive()
    }
}

fn require(name: &'static str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::invalid(name, "must not be empty"));
    }
    Ok(())
}
