//! # evalpool-runtime
//!
//! Thread management for the evalpool worker pool.
//!
//! This crate provides:
//! - Worker threads with per-worker queue, lock and wake-up condvar
//! - The `Pool` dispatcher (first-free-worker, non-blocking)
//! - Optional bounded backlog drained by workers
//! - Backoff policy for callers that want to wait for a free worker
//! - Configuration with environment overrides

pub mod config;
pub mod retry;
pub mod worker;
pub mod pool;

// Re-exports
pub use config::PoolConfig;
pub use pool::Pool;
pub use retry::RetryPolicy;
pub use worker::{Claim, ShutdownMode, Worker};
