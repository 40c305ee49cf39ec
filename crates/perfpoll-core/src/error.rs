//! Error types for counter lookup, sampling and driver construction.

use std::fmt;
use std::io;

/// Errors returned by constructors and driver operations.
#[derive(Debug)]
pub enum Error {
    /// A required argument was missing, empty or out of range.
    InvalidArgument {
        name: &'static str,
        reason: &'static str,
    },
    /// The OS counter subsystem does not know the requested category or counter.
    EnvironmentLookup(LookupError),
    /// The timer thread could not be spawned.
    Spawn(io::Error),
    /// A stream driver was created outside of a tokio runtime.
    NoRuntime,
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: &'static str) -> Self {
        Error::InvalidArgument { name, reason }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { name, reason } => {
                write!(f, "invalid argument '{}': {}", name, reason)
            }
            Error::EnvironmentLookup(e) => write!(f, "counter lookup failed: {}", e),
            Error::Spawn(e) => write!(f, "failed to spawn timer thread: {}", e),
            Error::NoRuntime => write!(f, "no tokio runtime available"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::EnvironmentLookup(e) => Some(e),
            Error::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LookupError> for Error {
    fn from(e: LookupError) -> Self {
        Error::EnvironmentLookup(e)
    }
}

/// Failure to resolve a category, counter or instance in the counter subsystem.
#[derive(Debug)]
pub enum LookupError {
    /// Category is not registered (or its backing data is unavailable).
    CategoryNotFound(String),
    /// Category exists but has no counter with this name.
    CounterNotFound { category: String, counter: String },
    /// Instance does not exist in the category.
    InstanceNotFound { category: String, instance: String },
    /// I/O error reading the subsystem.
    Io(io::Error),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::CategoryNotFound(category) => {
                write!(f, "category '{}' does not exist", category)
            }
            LookupError::CounterNotFound { category, counter } => {
                write!(f, "counter '{}' does not exist in '{}'", counter, category)
            }
            LookupError::InstanceNotFound { category, instance } => {
                write!(f, "instance '{}' does not exist in '{}'", instance, category)
            }
            LookupError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<io::Error> for LookupError {
    fn from(e: io::Error) -> Self {
        LookupError::Io(e)
    }
}

/// Failure to produce a current value for one counter.
///
/// Never escapes `SamplingCollector::collect()`; it is handed to the error
/// handler instead.
#[derive(Debug)]
pub enum SampleError {
    /// Counter belongs to a multi-instance category but was opened without an instance.
    InstanceRequired { category: String },
    /// Instance is unknown or has disappeared.
    InstanceNotFound { category: String, instance: String },
    /// Handle was already released.
    Released,
    /// I/O error reading the subsystem.
    Io(io::Error),
    /// Subsystem returned data that could not be parsed.
    Parse(String),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::InstanceRequired { category } => {
                write!(f, "category '{}' requires an instance name", category)
            }
            SampleError::InstanceNotFound { category, instance } => {
                write!(f, "instance '{}' not found in '{}'", instance, category)
            }
            SampleError::Released => write!(f, "counter handle already released"),
            SampleError::Io(e) => write!(f, "I/O error: {}", e),
            SampleError::Parse(msg) => write!(f, "parse error: {}", msg),
        }
    }
}

impl std::error::Error for SampleError {}

impl From<io::Error> for SampleError {
    fn from(e: io::Error) -> Self {
        SampleError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_converts_into_error() {
        let err: Error = LookupError::CategoryNotFound("Nope".into()).into();
        assert!(matches!(err, Error::EnvironmentLookup(_)));
        assert!(err.to_string().contains("'Nope'"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = Error::invalid("category", "must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid argument 'category': must not be empty"
        );
    }
}
