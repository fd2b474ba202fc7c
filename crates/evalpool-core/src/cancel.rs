//! Cancellation token for cooperative cancellation
//!
//! Callers waiting for a free worker (see `Pool::dispatch_with_retry`) pass
//! a token and can abort the wait from another thread. Tokens can be linked
//! to form parent-child relationships. A job that is already running is
//! never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Token for checking and triggering cancellation
#[derive(Clone)]
pub struct CancellationToken {
    inner: Option<Arc<TokenInner>>,
}

struct TokenInner {
    /// Cancellation flag
    cancelled: AtomicBool,

    /// Parent token (if any)
    parent: Option<CancellationToken>,
}

impl CancellationToken {
    /// Create a new independent cancellation token
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: None,
            })),
        }
    }

    /// Create a token that never cancels (no allocation)
    pub fn never() -> Self {
        Self { inner: None }
    }

    /// Create a child token linked to this one
    ///
    /// If this token is cancelled, checking the child will also return cancelled.
    pub fn child(&self) -> Self {
        Self {
            inner: Some(Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Check if cancellation was requested
    ///
    /// Also checks parent tokens recursively.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        match &self.inner {
            Some(inner) => {
                if inner.cancelled.load(Ordering::Acquire) {
                    return true;
                }
                match inner.parent {
                    Some(ref parent) => parent.is_cancelled(),
                    None => false,
                }
            }
            None => false,
        }
    }

    /// Request cancellation
    ///
    /// This only sets this token's flag, not parent's.
    pub fn cancel(&self) {
        if let Some(inner) = &self.inner {
            inner.cancelled.store(true, Ordering::Release);
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_never_ignores_cancel() {
        let never = CancellationToken::never();
        let child = never.child();
        never.cancel();
        assert!(!never.is_cancelled());
        assert!(!child.is_cancelled());
    }

    #[test]
    fn test_cancel_seen_by_waiter_thread() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        assert!(!waiter.is_cancelled());
        let handle = thread::spawn(move || {
            while !waiter.is_cancelled() {
                thread::yield_now();
            }
        });
        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn test_request_tree() {
        // One root per batch, one child per dispatch wait
        let batch = CancellationToken::new();
        let first = batch.child();
        let second = batch.child();
        let nested = first.child();

        first.cancel();
        assert!(nested.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!batch.is_cancelled());

        batch.cancel();
        assert!(second.is_cancelled());
    }
}
