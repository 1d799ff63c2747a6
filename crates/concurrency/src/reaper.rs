//! Reaper schedule and statistics
//!
//! [`ReaperTimer`] owns the single repeating background thread that drives the
//! reaper. One mutex guards an optional handle: `start` arms it only when no
//! handle is present, `stop` cancels and clears it. Both are idempotent.
//!
//! Passes run with a fixed delay: the next wait starts when a pass returns.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use txtable_core::{TxError, TxResult};

struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Sleep for `delay` or until stopped; true if stopped
    fn sleep(&self, delay: Duration) -> bool {
        let deadline = Instant::now().checked_add(delay);
        let mut stopped = self.stopped.lock();
        while !*stopped {
            let Some(deadline) = deadline else {
                self.wake.wait(&mut stopped);
                continue;
            };
            if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }

    fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }
}

struct ReaperHandle {
    signal: Arc<StopSignal>,
    thread: JoinHandle<()>,
}

/// Idempotent start/stop around one repeating task
#[derive(Default)]
pub struct ReaperTimer {
    handle: Mutex<Option<ReaperHandle>>,
}

impl ReaperTimer {
    /// Create a disarmed timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer: run `pass` every `delay` until stopped
    ///
    /// `pass` returns false to end the schedule on its own (its owner is
    /// gone). Returns `Ok(false)` without doing anything if already armed.
    ///
    /// # Errors
    ///
    /// Returns `TxError::Rejected` if the thread cannot be spawned.
    pub fn start<F>(&self, delay: Duration, pass: F) -> TxResult<bool>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Ok(false);
        }

        let signal = Arc::new(StopSignal {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        });
        let thread_signal = Arc::clone(&signal);
        let thread = std::thread::Builder::new()
            .name("txtable-reaper".to_string())
            .spawn(move || {
                while !thread_signal.sleep(delay) {
                    if !pass() {
                        break;
                    }
                }
            })
            .map_err(|e| TxError::Rejected(format!("failed to spawn reaper thread: {}", e)))?;

        *handle = Some(ReaperHandle { signal, thread });
        Ok(true)
    }

    /// Cancel the schedule and wait for an in-flight pass to finish
    ///
    /// Returns false if the timer was not armed.
    pub fn stop(&self) -> bool {
        let handle = self.handle.lock().take();
        match handle {
            Some(ReaperHandle { signal, thread }) => {
                signal.stop();
                // Stopping from inside a pass must not join itself
                if thread.thread().id() != std::thread::current().id() {
                    let _ = thread.join();
                }
                true
            }
            None => false,
        }
    }

    /// True while armed
    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }
}

/// Reaper counters
///
/// Relaxed ordering: purely observational, they synchronize nothing.
#[derive(Debug, Default)]
pub struct ReaperStats {
    passes: AtomicU64,
    rolled_back: AtomicU64,
    completed: AtomicU64,
    garbage_collected: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time copy of [`ReaperStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaperStatsSnapshot {
    /// Reaper passes started
    pub passes: u64,
    /// Idle transactions moved to MARK_ROLLBACK
    pub rolled_back: u64,
    /// Decided transactions driven to a terminal status and removed
    pub completed: u64,
    /// Terminal records removed without further work
    pub garbage_collected: u64,
    /// Timed-out records left to their live originator
    pub skipped: u64,
}

impl ReaperStats {
    pub(crate) fn record_pass(&self) {
        self.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rolled_back(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_garbage_collected(&self) {
        self.garbage_collected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters
    pub fn snapshot(&self) -> ReaperStatsSnapshot {
        ReaperStatsSnapshot {
            passes: self.passes.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            garbage_collected: self.garbage_collected.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}
