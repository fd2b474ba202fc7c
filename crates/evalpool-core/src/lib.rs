//! # evalpool-core
//!
//! Core types for the evalpool worker pool.
//!
//! This crate has no threads of its own. Worker and pool management live
//! in `evalpool-runtime`.
//!
//! ## Modules
//!
//! - `job` - `Job` trait, `Task` alias, one-shot `Completion` handles
//! - `cancel` - Cancellation token for aborting a dispatch wait
//! - `error` - Error types
//! - `env` - Environment variable utilities

pub mod job;
pub mod cancel;
pub mod error;
pub mod env;

// Re-exports for convenience
pub use cancel::CancellationToken;
pub use env::{env_get, env_get_opt, env_get_str};
pub use error::{
    ConfigError, DispatchError, PoolError, PoolResult, TaskError, TryDispatchError,
};
pub use job::{completion, with_completion, Completer, Completion, Job, Task};
