//! Environment variable utilities
//!
//! Generic `env_get<T>` for parsing environment variables with defaults.
//! `PoolConfig::from_env` is built on these.
//!
//! ```ignore
//! use evalpool_core::env::{env_get, env_get_opt};
//!
//! let workers: usize = env_get("EVALPOOL_NUM_WORKERS", 4);
//! let stack: Option<usize> = env_get_opt("EVALPOOL_STACK_SIZE");
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Unset variables and parse failures both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as optional value
///
/// Returns `Some(T)` if the variable is set and parses successfully.
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__EVALPOOL_TEST_UNSET_VAR__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<usize> = env_get_opt("__EVALPOOL_TEST_UNSET_VAR__");
        assert!(val.is_none());
    }

    #[test]
    fn test_env_get_str_default() {
        let val = env_get_str("__EVALPOOL_TEST_UNSET_VAR__", "hello");
        assert_eq!(val, "hello");
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__EVALPOOL_TEST_NUM__", " 123 ");
        let val: usize = env_get("__EVALPOOL_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__EVALPOOL_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__EVALPOOL_TEST_INVALID__", "not_a_number");
        let val: usize = env_get("__EVALPOOL_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__EVALPOOL_TEST_INVALID__");
    }
}
