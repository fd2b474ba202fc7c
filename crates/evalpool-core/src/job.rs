//! Jobs and one-shot completion handles
//!
//! A [`Job`] is anything that can be invoked exactly once on a worker
//! thread. Closures get the impl for free, so callers usually never name
//! the trait.
//!
//! A [`Completion`] is the caller's end of a job's result. The worker side
//! holds the matching [`Completer`], which writes the value and only then
//! publishes readiness, so a caller that observes `is_ready() == true`
//! always reads a fully written outcome.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::TaskError;

/// Invoke-once unit of work
pub trait Job: Send + 'static {
    fn run(self: Box<Self>);
}

impl<F> Job for F
where
    F: FnOnce() + Send + 'static,
{
    #[inline]
    fn run(self: Box<Self>) {
        (*self)()
    }
}

/// Queued form of a job
pub type Task = Box<dyn Job>;

/// Shared state between a `Completer` and its `Completion`
struct Slot<R> {
    value: Mutex<Option<Result<R, TaskError>>>,
    ready: AtomicBool,
    condvar: Condvar,
}

impl<R> Slot<R> {
    fn lock(&self) -> MutexGuard<'_, Option<Result<R, TaskError>>> {
        // Only plain stores happen under this lock
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, outcome: Result<R, TaskError>) {
        let mut guard = self.lock();
        *guard = Some(outcome);
        self.ready.store(true, Ordering::Release);
        drop(guard);
        self.condvar.notify_all();
    }
}

/// Create a connected completer/completion pair
pub fn completion<R>() -> (Completer<R>, Completion<R>) {
    let slot = Arc::new(Slot {
        value: Mutex::new(None),
        ready: AtomicBool::new(false),
        condvar: Condvar::new(),
    });
    (
        Completer { slot: Some(Arc::clone(&slot)) },
        Completion { slot },
    )
}

/// Producer half. Dropping it without completing reports `Abandoned`.
pub struct Completer<R> {
    slot: Option<Arc<Slot<R>>>,
}

impl<R> Completer<R> {
    pub fn complete(mut self, outcome: Result<R, TaskError>) {
        if let Some(slot) = self.slot.take() {
            slot.publish(outcome);
        }
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.publish(Err(TaskError::Abandoned));
        }
    }
}

/// Caller half of a job's outcome
pub struct Completion<R> {
    slot: Arc<Slot<R>>,
}

impl<R> Completion<R> {
    /// Has the outcome been published?
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.slot.ready.load(Ordering::Acquire)
    }

    /// Block until the outcome is published or `timeout` elapses.
    ///
    /// Returns `true` if the outcome is ready.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.slot.lock();
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            // Deadline past the end of `Instant`: wait without one
            while guard.is_none() {
                guard = self
                    .slot
                    .condvar
                    .wait(guard)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            return true;
        };
        while guard.is_none() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .slot
                .condvar
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Take the outcome if it is ready, otherwise hand the handle back
    pub fn try_take(self) -> Result<Result<R, TaskError>, Self> {
        if !self.is_ready() {
            return Err(self);
        }
        let outcome = self.slot.lock().take();
        match outcome {
            Some(outcome) => Ok(outcome),
            None => Err(self),
        }
    }

    /// Block until the outcome is published and return it
    pub fn wait(self) -> Result<R, TaskError> {
        let mut guard = self.slot.lock();
        loop {
            if let Some(outcome) = guard.take() {
                return outcome;
            }
            guard = self
                .slot
                .condvar
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<R> std::fmt::Debug for Completion<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Wrap `f` so that its return value (or panic) lands in a `Completion`.
///
/// The returned closure never unwinds; a panic inside `f` is reported as
/// `TaskError::Panicked`.
pub fn with_completion<F, R>(f: F) -> (impl FnOnce() + Send + 'static, Completion<R>)
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (completer, completion) = completion();
    let job = move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(f))
            .map_err(|payload| TaskError::Panicked(panic_message(payload.as_ref())));
        completer.complete(outcome);
    };
    (job, completion)
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_closure_is_job() {
        let (completer, completion) = completion::<i64>();
        let task: Task = Box::new(move || completer.complete(Ok(3 + 4)));
        task.run();
        assert!(completion.is_ready());
        assert_eq!(completion.wait(), Ok(7));
    }

    #[test]
    fn test_wait_across_threads() {
        let (completer, completion) = completion::<String>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete(Ok("done".to_string()));
        });
        assert_eq!(completion.wait(), Ok("done".to_string()));
        handle.join().unwrap();
    }

    #[test]
    fn test_try_take_not_ready() {
        let (completer, completion) = completion::<u8>();
        let completion = completion.try_take().unwrap_err();
        completer.complete(Ok(1));
        assert_eq!(completion.try_take().ok(), Some(Ok(1)));
    }

    #[test]
    fn test_wait_timeout() {
        let (completer, completion) = completion::<u8>();
        assert!(!completion.wait_timeout(Duration::from_millis(10)));
        completer.complete(Ok(9));
        assert!(completion.wait_timeout(Duration::from_millis(10)));
        assert_eq!(completion.wait(), Ok(9));
    }

    #[test]
    fn test_wait_timeout_unbounded() {
        let (completer, completion) = completion::<u8>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completer.complete(Ok(4));
        });
        assert!(completion.wait_timeout(Duration::MAX));
        assert!(completion.wait_timeout(Duration::MAX));
        assert_eq!(completion.wait(), Ok(4));
        handle.join().unwrap();
    }

    #[test]
    fn test_dropped_completer_abandons() {
        let (completer, completion) = completion::<u8>();
        drop(completer);
        assert_eq!(completion.wait(), Err(TaskError::Abandoned));
    }

    #[test]
    fn test_with_completion_captures_panic() {
        let (job, completion) = with_completion(|| -> i64 { panic!("division by zero") });
        job();
        assert_eq!(
            completion.wait(),
            Err(TaskError::Panicked("division by zero".to_string()))
        );
    }

    #[test]
    fn test_panic_message_formats() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
