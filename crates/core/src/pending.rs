//! One-shot result handle for asynchronous work
//!
//! A [`Completer`] / [`Pending`] pair connects the thread that executes a unit
//! of work with the threads that wait for it. The pending side can either block
//! with a deadline or register callbacks that run when the result arrives.
//!
//! If the completer is dropped without resolving (the executing pool shut down,
//! or the task panicked) the handle resolves to `TxError::Cancelled`.

use crate::error::{TxError, TxResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Callback<T> = Box<dyn FnOnce(TxResult<T>) + Send>;

struct Slot<T> {
    result: Option<TxResult<T>>,
    callbacks: Vec<Callback<T>>,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    ready: Condvar,
}

/// Write side of a one-shot result
pub struct Completer<T: Clone + Send + 'static> {
    shared: Option<Arc<Shared<T>>>,
}

/// Read side of a one-shot result
pub struct Pending<T: Clone + Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> Clone for Pending<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Pending<T> {
    /// Create a connected completer and pending handle
    pub fn pair() -> (Completer<T>, Pending<T>) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                result: None,
                callbacks: Vec::new(),
            }),
            ready: Condvar::new(),
        });
        (
            Completer {
                shared: Some(Arc::clone(&shared)),
            },
            Pending { shared },
        )
    }

    /// Handle that is already resolved
    pub fn resolved(result: TxResult<T>) -> Self {
        let (completer, pending) = Self::pair();
        completer.resolve(result);
        pending
    }

    /// True once a result is available
    pub fn is_done(&self) -> bool {
        self.shared.slot.lock().result.is_some()
    }

    /// Block until the result arrives or `timeout` elapses
    ///
    /// # Errors
    ///
    /// Returns `TxError::Timeout` if the deadline passes first, otherwise the
    /// error the work resolved with.
    pub fn wait_timeout(&self, timeout: Duration) -> TxResult<T> {
        // A deadline past the end of the clock means no deadline
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.shared.slot.lock();
        while slot.result.is_none() {
            let Some(deadline) = deadline else {
                self.shared.ready.wait(&mut slot);
                continue;
            };
            if self.shared.ready.wait_until(&mut slot, deadline).timed_out() {
                if let Some(result) = slot.result.as_ref() {
                    return result.clone();
                }
                return Err(TxError::Timeout(timeout));
            }
        }
        match slot.result.as_ref() {
            Some(result) => result.clone(),
            None => Err(TxError::Cancelled),
        }
    }

    /// Run `callback` with the result
    ///
    /// Runs immediately on the calling thread if the result is already
    /// available, otherwise on the thread that resolves the handle.
    pub fn on_complete(&self, callback: impl FnOnce(TxResult<T>) + Send + 'static) {
        let mut slot = self.shared.slot.lock();
        match slot.result.as_ref() {
            Some(result) => {
                let result = result.clone();
                drop(slot);
                callback(result);
            }
            None => slot.callbacks.push(Box::new(callback)),
        }
    }
}

impl<T: Clone + Send + 'static> Completer<T> {
    /// Resolve with a value
    pub fn complete(self, value: T) {
        self.resolve(Ok(value));
    }

    /// Resolve with an error
    pub fn fail(self, error: TxError) {
        self.resolve(Err(error));
    }

    /// Resolve with a result
    pub fn resolve(mut self, result: TxResult<T>) {
        if let Some(shared) = self.shared.take() {
            publish(&shared, result);
        }
    }
}

impl<T: Clone + Send + 'static> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            publish(&shared, Err(TxError::Cancelled));
        }
    }
}

fn publish<T: Clone + Send + 'static>(shared: &Shared<T>, result: TxResult<T>) {
    let callbacks = {
        let mut slot = shared.slot.lock();
        slot.result = Some(result.clone());
        std::mem::take(&mut slot.callbacks)
    };
    shared.ready.notify_all();
    // Callbacks run outside the lock so they may inspect the handle
    for callback in callbacks {
        callback(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_complete_then_wait() {
        let (completer, pending) = Pending::pair();
        completer.complete(7u32);
        assert!(pending.is_done());
        assert_eq!(pending.wait_timeout(Duration::from_millis(10)), Ok(7));
    }

    #[test]
    fn test_unbounded_wait_does_not_overflow() {
        let (completer, pending) = Pending::pair();
        let waiter = thread::spawn(move || pending.wait_timeout(Duration::MAX));
        thread::sleep(Duration::from_millis(10));
        completer.complete(3u32);
        assert_eq!(waiter.join().unwrap(), Ok(3));

        let (completer, pending) = Pending::<u32>::pair();
        let waiter = thread::spawn(move || pending.wait_timeout(Duration::MAX));
        drop(completer);
        assert_eq!(waiter.join().unwrap(), Err(TxError::Cancelled));
    }

    #[test]
    fn test_wait_times_out() {
        let (_completer, pending) = Pending::<u32>::pair();
        let err = pending.wait_timeout(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, TxError::Timeout(_)));
    }

    #[test]
    fn test_dropped_completer_cancels() {
        let (completer, pending) = Pending::<u32>::pair();
        drop(completer);
        assert_eq!(
            pending.wait_timeout(Duration::from_secs(1)),
            Err(TxError::Cancelled)
        );
    }

    #[test]
    fn test_cross_thread_completion() {
        let (completer, pending) = Pending::pair();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete("done".to_string());
        });
        assert_eq!(
            pending.wait_timeout(Duration::from_secs(5)).unwrap(),
            "done"
        );
        worker.join().unwrap();
    }

    #[test]
    fn test_callbacks_before_and_after_completion() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (completer, pending) = Pending::pair();

        let h = Arc::clone(&hits);
        pending.on_complete(move |r| {
            assert_eq!(r, Ok(1u8));
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        completer.complete(1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let h = Arc::clone(&hits);
        pending.on_complete(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resolved_handle() {
        let pending = Pending::resolved(Err::<u8, _>(TxError::storage("down")));
        assert_eq!(
            pending.wait_timeout(Duration::ZERO),
            Err(TxError::storage("down"))
        );
    }
}
