//! Pool configuration
//!
//! Library defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults (`config::defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use evalpool_runtime::config::PoolConfig;
//!
//! // Use defaults with env overrides
//! let config = PoolConfig::from_env();
//!
//! // Or customize programmatically
//! let config = PoolConfig::new()
//!     .num_workers(8)
//!     .backlog_capacity(64);
//! ```

pub mod defaults;

use evalpool_core::env::{env_get, env_get_opt, env_get_str};
use evalpool_core::error::ConfigError;

/// Pool configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads
    pub num_workers: usize,
    /// Pool-wide backlog slots; 0 disables the backlog
    pub backlog_capacity: usize,
    /// Worker thread name prefix
    pub thread_name: String,
    /// Worker thread stack size (None = std default)
    pub stack_size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `EVALPOOL_NUM_WORKERS` - Number of worker threads
    /// - `EVALPOOL_BACKLOG_CAPACITY` - Backlog slots (0 = disabled)
    /// - `EVALPOOL_THREAD_NAME` - Worker thread name prefix
    /// - `EVALPOOL_STACK_SIZE` - Worker stack size in bytes
    pub fn from_env() -> Self {
        Self {
            num_workers: env_get("EVALPOOL_NUM_WORKERS", defaults::NUM_WORKERS),
            backlog_capacity: env_get(
                "EVALPOOL_BACKLOG_CAPACITY",
                defaults::BACKLOG_CAPACITY,
            ),
            thread_name: env_get_str("EVALPOOL_THREAD_NAME", defaults::THREAD_NAME),
            stack_size: env_get_opt("EVALPOOL_STACK_SIZE"),
        }
    }

    /// Create config with explicit defaults (no env override).
    pub fn new() -> Self {
        Self {
            num_workers: defaults::NUM_WORKERS,
            backlog_capacity: defaults::BACKLOG_CAPACITY,
            thread_name: defaults::THREAD_NAME.to_string(),
            stack_size: None,
        }
    }

    // Builder methods

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn backlog_capacity(mut self, cap: usize) -> Self {
        self.backlog_capacity = cap;
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::InvalidValue("num_workers must be > 0"));
        }
        if self.num_workers > defaults::MAX_WORKERS {
            return Err(ConfigError::InvalidValue("num_workers must be <= 256"));
        }
        if self.backlog_capacity > defaults::MAX_BACKLOG_CAPACITY {
            return Err(ConfigError::InvalidValue(
                "backlog_capacity must be <= 1048576",
            ));
        }
        if self.thread_name.is_empty() {
            return Err(ConfigError::InvalidValue("thread_name must not be empty"));
        }
        if matches!(self.stack_size, Some(size) if size < defaults::MIN_STACK_SIZE) {
            return Err(ConfigError::InvalidValue("stack_size must be >= 64KB"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_valid() {
        let config = PoolConfig::new();
        assert_eq!(config.num_workers, defaults::NUM_WORKERS);
        assert_eq!(config.backlog_capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = PoolConfig::new()
            .num_workers(8)
            .backlog_capacity(32)
            .thread_name("calc")
            .stack_size(256 * 1024);

        assert_eq!(config.num_workers, 8);
        assert_eq!(config.backlog_capacity, 32);
        assert_eq!(config.thread_name, "calc");
        assert_eq!(config.stack_size, Some(256 * 1024));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            PoolConfig::new().num_workers(0).validate(),
            Err(ConfigError::InvalidValue("num_workers must be > 0"))
        );
        assert!(PoolConfig::new().num_workers(1000).validate().is_err());
        assert!(PoolConfig::new().thread_name("").validate().is_err());
        assert!(PoolConfig::new().stack_size(1024).validate().is_err());
    }

    #[test]
    fn test_from_env_override() {
        std::env::set_var("EVALPOOL_BACKLOG_CAPACITY", "16");
        let config = PoolConfig::from_env();
        std::env::remove_var("EVALPOOL_BACKLOG_CAPACITY");
        assert_eq!(config.backlog_capacity, 16);
    }
}
