//! Error types for the evalpool worker pool

use core::fmt;
use thiserror::Error;

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors raised by pool construction, submission and teardown
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration rejected by `validate()`
    #[error("invalid pool configuration: {0}")]
    Config(#[from] ConfigError),

    /// Failed to spawn a worker thread
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// Every worker is busy and the backlog is disabled or full
    #[error("all workers busy and backlog full")]
    Saturated,

    /// A worker thread died outside of job execution
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0}")]
    InvalidValue(&'static str),
}

/// Outcome of a job that did not produce a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The job panicked on its worker; the payload message is kept
    #[error("job panicked: {0}")]
    Panicked(String),

    /// The job was dropped before running (abandoning shutdown)
    #[error("job abandoned before completion")]
    Abandoned,
}

/// Returned by `try_dispatch` when no worker was free.
///
/// The rejected job is handed back to the caller; the pool keeps nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryDispatchError<T> {
    Busy(T),
}

impl<T> TryDispatchError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryDispatchError::Busy(t) => t,
        }
    }
}

impl<T> fmt::Display for TryDispatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no free worker")
    }
}

impl<T: fmt::Debug> std::error::Error for TryDispatchError<T> {}

/// Returned by `dispatch_with_retry` when it gives up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError<T> {
    TimedOut(T),
    Cancelled(T),
}

impl<T> DispatchError<T> {
    pub fn into_inner(self) -> T {
        match self {
            DispatchError::TimedOut(t) | DispatchError::Cancelled(t) => t,
        }
    }
}

impl<T> fmt::Display for DispatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::TimedOut(_) => {
                write!(f, "no worker became free before the retry deadline")
            }
            DispatchError::Cancelled(_) => write!(f, "dispatch cancelled"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for DispatchError<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = PoolError::Config(ConfigError::InvalidValue("num_workers must be > 0"));
        assert_eq!(
            format!("{}", e),
            "invalid pool configuration: num_workers must be > 0"
        );

        let e = TaskError::Panicked("boom".to_string());
        assert_eq!(format!("{}", e), "job panicked: boom");
    }

    #[test]
    fn test_error_conversion() {
        let pool_err: PoolError = ConfigError::InvalidValue("x").into();
        assert!(matches!(pool_err, PoolError::Config(ConfigError::InvalidValue("x"))));
    }

    #[test]
    fn test_into_inner_returns_job() {
        let e = TryDispatchError::Busy(7u32);
        assert_eq!(e.into_inner(), 7);

        let e = DispatchError::Cancelled("job");
        assert_eq!(format!("{}", e), "dispatch cancelled");
        assert_eq!(e.into_inner(), "job");
    }
}
