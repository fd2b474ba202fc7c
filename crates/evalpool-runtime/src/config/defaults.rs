//! Library defaults for `PoolConfig` and `RetryPolicy`

/// Worker threads per pool
pub const NUM_WORKERS: usize = 4;

/// Hard upper bound on `num_workers`
pub const MAX_WORKERS: usize = 256;

/// Pool-wide backlog slots (0 = no backlog, busy pool rejects work)
pub const BACKLOG_CAPACITY: usize = 0;

/// Upper bound on `backlog_capacity`
pub const MAX_BACKLOG_CAPACITY: usize = 1 << 20;

/// Worker threads are named `{THREAD_NAME}-{id}`
pub const THREAD_NAME: &str = "evalpool-worker";

/// Smallest accepted worker stack size
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// First sleep once spinning is exhausted
pub const RETRY_INITIAL_DELAY_US: u64 = 50;

/// Cap on the retry sleep
pub const RETRY_MAX_DELAY_US: u64 = 10_000;
