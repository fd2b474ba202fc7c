//! `Pool`: fixed set of workers with non-blocking dispatch.
//!
//! Dispatch scans workers in ordinal order and hands the job to the first
//! one that is free at the instant its lock is taken. A busy pool rejects
//! work instead of queueing it, unless a backlog is configured.
//!
//! No dynamic scaling. Workers live until `shutdown()` (or drop).

use std::sync::Arc;

use crossbeam_queue::ArrayQueue;
use evalpool_core::cancel::CancellationToken;
use evalpool_core::error::{DispatchError, PoolError, PoolResult, TryDispatchError};
use evalpool_core::job::{with_completion, Completion, Job, Task};
use tracing::{debug, info, trace, warn};

use crate::config::PoolConfig;
use crate::retry::RetryPolicy;
use crate::worker::{Backlog, Claim, ShutdownMode, Worker};

/// Fixed-size worker pool
pub struct Pool {
    workers: Vec<Worker>,
    backlog: Option<Backlog>,
    stopped: bool,
}

impl Pool {
    /// Validate `config` and start all workers.
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;

        let backlog = (config.backlog_capacity > 0)
            .then(|| Arc::new(ArrayQueue::<Task>::new(config.backlog_capacity)));

        let mut pool = Pool {
            workers: Vec::with_capacity(config.num_workers),
            backlog,
            stopped: false,
        };

        for id in 0..config.num_workers {
            // On failure, dropping `pool` stops and joins what was started
            let worker = Worker::spawn(id, pool.backlog.clone(), &config)?;
            pool.workers.push(worker);
        }

        info!(
            workers = config.num_workers,
            backlog_capacity = config.backlog_capacity,
            event = "pool_created",
            "worker pool started"
        );
        Ok(pool)
    }

    /// Pool of `n` workers with otherwise default settings (no env override)
    pub fn with_workers(n: usize) -> PoolResult<Self> {
        Self::new(PoolConfig::new().num_workers(n))
    }

    /// Number of workers
    #[inline]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Workers currently accepting a task (hint, may be stale)
    pub fn free_workers(&self) -> usize {
        self.workers.iter().filter(|w| w.is_free()).count()
    }

    /// Jobs waiting in the backlog (0 when the backlog is disabled)
    pub fn backlog_len(&self) -> usize {
        self.backlog.as_ref().map_or(0, |b| b.len())
    }

    /// Per-worker view, in ordinal order
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    fn claim_free(&self) -> Option<Claim<'_>> {
        self.workers.iter().find_map(Worker::try_claim)
    }

    /// Hand `job` to the first free worker.
    ///
    /// Returns the ordinal of the worker that accepted it. When every
    /// worker is busy the job comes back in `TryDispatchError::Busy`.
    pub fn try_dispatch<J: Job>(&self, job: J) -> Result<usize, TryDispatchError<J>> {
        match self.claim_free() {
            Some(claim) => {
                let id = claim.worker_id();
                claim.enqueue(Box::new(job));
                Ok(id)
            }
            None => Err(TryDispatchError::Busy(job)),
        }
    }

    /// Best-effort dispatch: `true` iff a worker accepted the job.
    ///
    /// A rejected job is dropped. Acceptance says nothing about completion.
    pub fn dispatch<J: Job>(&self, job: J) -> bool {
        self.try_dispatch(job).is_ok()
    }

    /// Run `f` on a free worker and return a handle to its result.
    ///
    /// A panic in `f` is reported as `TaskError::Panicked` through the
    /// handle.
    pub fn try_submit<F, R>(&self, f: F) -> Result<Completion<R>, TryDispatchError<F>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        match self.claim_free() {
            Some(claim) => {
                let (job, completion) = with_completion(f);
                claim.enqueue(Box::new(job));
                Ok(completion)
            }
            None => Err(TryDispatchError::Busy(f)),
        }
    }

    /// Evaluate `f(a, b)` on a free worker.
    ///
    /// `None` iff every worker was busy; retry later.
    pub fn evaluate(&self, f: fn(i64, i64) -> i64, a: i64, b: i64) -> Option<Completion<i64>> {
        self.try_submit(move || f(a, b)).ok()
    }

    /// Run `f` on a free worker, or park it in the backlog.
    ///
    /// Never blocks. Fails with `PoolError::Saturated` when every worker is
    /// busy and the backlog is disabled or full.
    pub fn submit<F, R>(&self, f: F) -> PoolResult<Completion<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let f = match self.try_submit(f) {
            Ok(completion) => return Ok(completion),
            Err(busy) => busy.into_inner(),
        };

        let backlog = self.backlog.as_ref().ok_or(PoolError::Saturated)?;
        let (job, completion) = with_completion(f);
        if backlog.push(Box::new(job)).is_err() {
            trace!(event = "backlog_full", "backlog full, rejecting job");
            return Err(PoolError::Saturated);
        }
        trace!(event = "backlog_push", backlog_len = backlog.len(), "job parked in backlog");

        // Every worker may have freed up between the scan and the push.
        // Wake one with a no-op; it drains the backlog before going idle.
        if let Some(claim) = self.claim_free() {
            trace!(worker_id = claim.worker_id(), event = "backlog_kick", "waking worker for backlog");
            claim.enqueue(Box::new(|| {}));
        }
        Ok(completion)
    }

    /// Dispatch `job`, backing off while every worker is busy.
    ///
    /// Gives the job back on timeout (per `policy`) or when `token` is
    /// cancelled. Cancellation only aborts the wait; once accepted, the job
    /// runs to completion.
    pub fn dispatch_with_retry<J: Job>(
        &self,
        job: J,
        policy: &RetryPolicy,
        token: &CancellationToken,
    ) -> Result<usize, DispatchError<J>> {
        self.retry(job, policy, token, |job| {
            self.try_dispatch(job).map_err(TryDispatchError::into_inner)
        })
    }

    /// `try_submit` with the backoff and give-up rules of
    /// `dispatch_with_retry`.
    pub fn submit_with_retry<F, R>(
        &self,
        f: F,
        policy: &RetryPolicy,
        token: &CancellationToken,
    ) -> Result<Completion<R>, DispatchError<F>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.retry(f, policy, token, |f| {
            self.try_submit(f).map_err(TryDispatchError::into_inner)
        })
    }

    fn retry<T, O>(
        &self,
        item: T,
        policy: &RetryPolicy,
        token: &CancellationToken,
        mut attempt: impl FnMut(T) -> Result<O, T>,
    ) -> Result<O, DispatchError<T>> {
        let mut retry = policy.start();
        let mut item = item;
        loop {
            item = match attempt(item) {
                Ok(out) => return Ok(out),
                Err(back) => back,
            };
            if token.is_cancelled() {
                debug!(event = "dispatch_cancelled", "dispatch cancelled while waiting");
                return Err(DispatchError::Cancelled(item));
            }
            if !retry.pause() {
                debug!(event = "dispatch_timed_out", "no worker became free in time");
                return Err(DispatchError::TimedOut(item));
            }
        }
    }

    /// Stop all workers and join their threads.
    pub fn shutdown(mut self, mode: ShutdownMode) -> PoolResult<()> {
        self.stop(mode)
    }

    fn stop(&mut self, mode: ShutdownMode) -> PoolResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        if mode == ShutdownMode::Abandon {
            if let Some(backlog) = &self.backlog {
                let mut dropped = 0usize;
                while backlog.pop().is_some() {
                    dropped += 1;
                }
                if dropped > 0 {
                    debug!(event = "backlog_abandoned", count = dropped, "dropping backlog");
                }
            }
        }

        for worker in &self.workers {
            worker.request_stop(mode);
        }

        let mut result = Ok(());
        for worker in &mut self.workers {
            if let Err(e) = worker.join() {
                warn!(worker_id = worker.id(), event = "join_failed", "{}", e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        let leftover = self.backlog_len();
        if leftover > 0 {
            warn!(event = "backlog_abandoned", count = leftover, "backlog not drained at shutdown");
        }

        info!(workers = self.workers.len(), ?mode, event = "pool_shutdown", "worker pool stopped");
        result
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        let _ = self.stop(ShutdownMode::Drain);
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("workers", &self.workers)
            .field("backlog_len", &self.backlog_len())
            .finish()
    }
}
