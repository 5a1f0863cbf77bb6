//! Post-execute callback queue
//!
//! Operations register deferred actions (e.g. LOB content writes) that can
//! only run once the owning transaction has executed them. The queue is
//! shared between the transaction and every operation it creates.

use clusterbind_storage::{PostExecuteCallback, StoreError, StoreResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// FIFO of deferred actions, shared by a transaction and its operations
#[derive(Clone, Default)]
pub struct PostExecuteQueue {
    inner: Arc<Mutex<VecDeque<PostExecuteCallback>>>,
}

impl PostExecuteQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback
    pub fn push(&self, callback: PostExecuteCallback) {
        self.inner.lock().push_back(callback);
    }

    /// Number of pending callbacks
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether no callbacks are pending
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Drop every pending callback without running it
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Run every pending callback in registration order
    ///
    /// The queue is emptied before the first callback runs, so each callback
    /// runs at most once. The first failure stops the run; the remaining
    /// callbacks are discarded and the failure is returned wrapped as
    /// `StoreError::Callback`.
    pub fn run_all(&self) -> StoreResult<usize> {
        let callbacks: Vec<PostExecuteCallback> = self.inner.lock().drain(..).collect();
        let total = callbacks.len();
        for (n, callback) in callbacks.into_iter().enumerate() {
            callback().map_err(|e| {
                StoreError::Callback(format!("callback {} of {} failed: {}", n + 1, total, e))
            })?;
        }
        Ok(total)
    }
}

impl fmt::Debug for PostExecuteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostExecuteQueue")
            .field("pending", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_runs_in_fifo_order_once() {
        let queue = PostExecuteQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let log = Arc::clone(&log);
            queue.push(Box::new(move || {
                log.lock().push(n);
                Ok(())
            }));
        }
        assert_eq!(queue.run_all().unwrap(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(queue.run_all().unwrap(), 0);
    }

    #[test]
    fn test_failure_is_wrapped_and_queue_cleared() {
        let queue = PostExecuteQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        queue.push(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::InvalidOperation("boom".into()))
        }));
        let r = Arc::clone(&ran);
        queue.push(Box::new(move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let err = queue.run_all().unwrap_err();
        assert!(matches!(err, StoreError::Callback(_)));
        assert!(err.to_string().contains("boom"));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clones_share_queue() {
        let queue = PostExecuteQueue::new();
        queue.clone().push(Box::new(|| Ok(())));
        assert_eq!(queue.len(), 1);
    }
}
