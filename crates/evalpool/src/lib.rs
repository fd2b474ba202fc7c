//! # evalpool - fixed-size worker thread pool
//!
//! A pool of N OS threads, each with its own single-slot queue. Dispatch
//! hands a job to the first idle worker and never blocks: a busy pool says
//! no, and the caller decides whether to retry, back off or park the job in
//! the optional backlog.
//!
//! ## Quick Start
//!
//! ```ignore
//! use evalpool::{Pool, RetryPolicy, CancellationToken, ShutdownMode};
//!
//! fn add(a: i64, b: i64) -> i64 { a + b }
//!
//! fn main() -> evalpool::PoolResult<()> {
//!     evalpool::init_logging();
//!     let pool = Pool::with_workers(4)?;
//!
//!     // Non-blocking: None when every worker is busy
//!     if let Some(sum) = pool.evaluate(add, 3, 4) {
//!         assert_eq!(sum.wait(), Ok(7));
//!     }
//!
//!     // Closures with any result type
//!     let text = pool.submit(|| format!("{}", 6 * 7))?;
//!     assert_eq!(text.wait().as_deref(), Ok("42"));
//!
//!     // Wait for a free worker with backoff instead of hot-looping
//!     let token = CancellationToken::new();
//!     let _ = pool.dispatch_with_retry(|| {}, &RetryPolicy::default(), &token);
//!
//!     pool.shutdown(ShutdownMode::Drain)
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//!   caller threads ──dispatch──► Pool (no lock, ordinal scan)
//!                                  │
//!        ┌─────────────────────────┼─────────────────────────┐
//!        ▼                         ▼                         ▼
//!   ┌──────────┐             ┌──────────┐             ┌──────────┐
//!   │ Worker 0 │             │ Worker 1 │     ...     │ Worker N │
//!   │ mutex +  │             │ mutex +  │             │ mutex +  │
//!   │ condvar  │             │ condvar  │             │ condvar  │
//!   └──────────┘             └──────────┘             └──────────┘
//!        │                         │                         │
//!        └──────── optional shared backlog (ArrayQueue) ─────┘
//! ```

use tracing_subscriber::EnvFilter;

// Re-export core types
pub use evalpool_core::{
    completion,
    with_completion,
    CancellationToken,
    Completer,
    Completion,
    ConfigError,
    DispatchError,
    Job,
    PoolError,
    PoolResult,
    Task,
    TaskError,
    TryDispatchError,
};

// Re-export env utilities
pub use evalpool_core::{env_get, env_get_opt, env_get_str};

// Re-export runtime types
pub use evalpool_runtime::{
    config::defaults,
    Claim,
    Pool,
    PoolConfig,
    RetryPolicy,
    ShutdownMode,
    Worker,
};

/// Install a `tracing` fmt subscriber on stderr.
///
/// The filter comes from `RUST_LOG`, then `EVALPOOL_LOG`, then `info`.
/// Calling it twice (or after another subscriber is set) is a no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("EVALPOOL_LOG"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init();
}
