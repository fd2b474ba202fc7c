//! Worker thread management
//!
//! Each worker is one OS thread with its own queue, availability flag and
//! stop flag, all guarded by a per-worker mutex. There is no pool-wide lock:
//! dispatch to different workers proceeds concurrently.
//!
//! Availability invariant: `free` is true iff the queue is empty and no job
//! is running on the worker. Only [`Claim::enqueue`] clears it, and only the
//! worker itself sets it again, after the job body has returned.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_queue::ArrayQueue;
use evalpool_core::error::{PoolError, PoolResult};
use evalpool_core::job::{panic_message, Task};
use tracing::{debug, trace, warn};

use crate::config::PoolConfig;

/// Pool-wide backlog drained by workers before they become free
pub(crate) type Backlog = Arc<ArrayQueue<Task>>;

/// What to do with queued work when the pool shuts down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Run everything already queued, then exit
    Drain,
    /// Drop queued jobs; their completions report `Abandoned`
    Abandon,
}

/// State guarded by the worker mutex
struct WorkerState {
    queue: VecDeque<Task>,
    free: bool,
    stop: bool,
}

/// State shared between the pool and the worker thread
struct WorkerShared {
    id: usize,
    state: Mutex<WorkerState>,
    /// Signalled on enqueue and on stop
    wakeup: Condvar,
    executed: AtomicU64,
}

impl WorkerShared {
    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        // Jobs never run under this lock, so poisoning means a bug in
        // this module; keep going with the inner state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, task: Task) {
        trace!(worker_id = self.id, event = "job_started", "executing job");
        match panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            Ok(()) => trace!(worker_id = self.id, event = "job_finished", "job finished"),
            Err(payload) => warn!(
                worker_id = self.id,
                event = "job_panicked",
                panic = %panic_message(payload.as_ref()),
                "job panicked"
            ),
        }
        self.executed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Exclusive hold on a free worker, taken by `Worker::try_claim`.
///
/// The worker lock stays held until [`Claim::enqueue`] so the
/// check-flip-enqueue sequence is one critical section. Dropping a claim
/// without enqueueing leaves the worker free.
pub struct Claim<'a> {
    id: usize,
    state: MutexGuard<'a, WorkerState>,
    wakeup: &'a Condvar,
}

impl Claim<'_> {
    #[inline]
    pub fn worker_id(&self) -> usize {
        self.id
    }

    /// Mark the worker busy, queue the task and wake the worker
    pub fn enqueue(mut self, task: Task) {
        self.state.free = false;
        self.state.queue.push_back(task);
        self.wakeup.notify_one();
        trace!(worker_id = self.id, event = "job_claimed", "job enqueued");
    }
}

/// Handle to one worker thread
pub struct Worker {
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start a worker thread named `{thread_name}-{id}`
    pub(crate) fn spawn(
        id: usize,
        backlog: Option<Backlog>,
        config: &PoolConfig,
    ) -> PoolResult<Self> {
        let shared = Arc::new(WorkerShared {
            id,
            state: Mutex::new(WorkerState {
                queue: VecDeque::new(),
                free: true,
                stop: false,
            }),
            wakeup: Condvar::new(),
            executed: AtomicU64::new(0),
        });

        let mut builder = thread::Builder::new().name(format!("{}-{}", config.thread_name, id));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let thread_shared = Arc::clone(&shared);
        let handle = builder
            .spawn(move || worker_loop(thread_shared, backlog))
            .map_err(|source| PoolError::Spawn { worker: id, source })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.shared.id
    }

    /// Lock the worker and keep the lock if it can accept a task
    pub fn try_claim(&self) -> Option<Claim<'_>> {
        let state = self.shared.lock();
        if state.free && !state.stop {
            Some(Claim {
                id: self.shared.id,
                state,
                wakeup: &self.shared.wakeup,
            })
        } else {
            None
        }
    }

    /// Can the worker take a task right now? (hint, may be stale)
    pub fn is_free(&self) -> bool {
        let state = self.shared.lock();
        state.free && !state.stop
    }

    /// Tasks queued but not yet started
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Jobs run to completion (or panic) so far
    pub fn executed(&self) -> u64 {
        self.shared.executed.load(Ordering::Relaxed)
    }

    /// Ask the worker loop to exit and wake it
    pub(crate) fn request_stop(&self, mode: ShutdownMode) {
        let dropped = {
            let mut state = self.shared.lock();
            state.stop = true;
            let dropped = match mode {
                ShutdownMode::Drain => VecDeque::new(),
                ShutdownMode::Abandon => std::mem::take(&mut state.queue),
            };
            self.shared.wakeup.notify_all();
            dropped
        };
        if !dropped.is_empty() {
            debug!(
                worker_id = self.shared.id,
                event = "jobs_abandoned",
                count = dropped.len(),
                "dropping queued jobs"
            );
        }
    }

    /// Wait for the worker thread to exit.
    ///
    /// Called from the worker's own thread (a job dropped the pool), the
    /// handle is detached instead; the loop exits once that job returns.
    pub(crate) fn join(&mut self) -> PoolResult<()> {
        match self.handle.take() {
            Some(handle) if handle.thread().id() == thread::current().id() => {
                debug!(
                    worker_id = self.shared.id,
                    event = "join_skipped",
                    "pool dropped on its own worker, detaching"
                );
                Ok(())
            }
            Some(handle) => handle
                .join()
                .map_err(|_| PoolError::WorkerPanicked(self.shared.id)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.shared.id)
            .field("free", &self.is_free())
            .field("executed", &self.executed())
            .finish()
    }
}

/// Worker thread main loop
fn worker_loop(shared: Arc<WorkerShared>, backlog: Option<Backlog>) {
    debug!(worker_id = shared.id, event = "started", "worker started");

    loop {
        let task = {
            let mut state = shared.lock();
            while state.queue.is_empty() && !state.stop {
                state = shared
                    .wakeup
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            match state.queue.pop_front() {
                Some(task) => task,
                // Stop requested and nothing left to run
                None => break,
            }
        };

        shared.execute(task);

        // Drain the backlog, then advertise availability. The emptiness
        // check and the flag flip share the lock that `try_claim` takes,
        // so a submitter that pushed to the backlog either sees this
        // worker free or this worker sees its entry.
        loop {
            if let Some(backlog) = &backlog {
                while let Some(task) = backlog.pop() {
                    shared.execute(task);
                }
            }

            let mut state = shared.lock();
            if backlog.as_ref().is_some_and(|b| !b.is_empty()) {
                continue;
            }
            state.free = true;
            break;
        }
    }

    debug!(
        worker_id = shared.id,
        event = "stopped",
        executed = shared.executed.load(Ordering::Relaxed),
        "worker stopped"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn spawn_one(backlog: Option<Backlog>) -> Worker {
        Worker::spawn(0, backlog, &PoolConfig::new()).unwrap()
    }

    #[test]
    fn test_claim_marks_busy_until_done() {
        let mut worker = spawn_one(None);
        assert!(worker.is_free());

        let (tx, rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel();
        let claim = worker.try_claim().unwrap();
        assert_eq!(claim.worker_id(), 0);
        claim.enqueue(Box::new(move || {
            rx.recv().unwrap();
            done_tx.send(()).unwrap();
        }));

        assert!(!worker.is_free());
        assert!(worker.try_claim().is_none());

        tx.send(()).unwrap();
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !worker.is_free() {
            assert!(std::time::Instant::now() < deadline, "worker never freed");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(worker.executed(), 1);

        worker.request_stop(ShutdownMode::Drain);
        worker.join().unwrap();
    }

    #[test]
    fn test_dropped_claim_leaves_worker_free() {
        let mut worker = spawn_one(None);
        drop(worker.try_claim().unwrap());
        assert!(worker.is_free());
        worker.request_stop(ShutdownMode::Drain);
        worker.join().unwrap();
    }

    #[test]
    fn test_panicking_job_keeps_worker_alive() {
        let mut worker = spawn_one(None);
        worker
            .try_claim()
            .unwrap()
            .enqueue(Box::new(|| panic!("job failure")));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while worker.executed() < 1 || !worker.is_free() {
            assert!(std::time::Instant::now() < deadline, "worker never recovered");
            thread::sleep(Duration::from_millis(1));
        }

        let (tx, rx) = mpsc::channel();
        worker
            .try_claim()
            .unwrap()
            .enqueue(Box::new(move || tx.send(5u8).unwrap()));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(5));

        worker.request_stop(ShutdownMode::Drain);
        worker.join().unwrap();
    }

    #[test]
    fn test_worker_drains_backlog() {
        let backlog: Backlog = Arc::new(ArrayQueue::new(8));
        let mut worker = spawn_one(Some(Arc::clone(&backlog)));

        let (tx, rx) = mpsc::channel();
        for i in 0..3u8 {
            let tx = tx.clone();
            assert!(backlog.push(Box::new(move || tx.send(i).unwrap())).is_ok());
        }
        // A no-op kick makes the worker look at the backlog
        worker.try_claim().unwrap().enqueue(Box::new(|| {}));

        let got: Vec<u8> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec![0, 1, 2]);

        worker.request_stop(ShutdownMode::Drain);
        worker.join().unwrap();
        assert_eq!(worker.executed(), 4);
    }

    #[test]
    fn test_stopped_worker_refuses_claims() {
        let mut worker = spawn_one(None);
        worker.request_stop(ShutdownMode::Drain);
        assert!(worker.try_claim().is_none());
        worker.join().unwrap();
        assert!(worker.join().is_ok());
    }
}
