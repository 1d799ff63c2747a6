//! Decision acknowledgement collectors
//!
//! `mark_to_commit` / `mark_to_rollback` report their fan-out through a
//! [`DecisionCollector`]: first how many caches participate, then one status
//! per cache as each apply completes (in completion order, not key order).
//! When nothing matches the xid only `no_transaction_found` is called.

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::time::{Duration, Instant};
use txtable_core::Status;

/// Receives the outcome of a decision fan-out
pub trait DecisionCollector: Send + Sync {
    /// Number of caches that will report; called before any `add_cache`
    fn expected_size(&self, size: usize);

    /// One cache finished applying the decision
    fn add_cache(&self, cache_name: &str, status: Status);

    /// No cache holds a record for the xid
    fn no_transaction_found(&self);
}

#[derive(Debug, Default)]
struct AckState {
    expected: Option<usize>,
    statuses: FxHashMap<String, Status>,
    received: usize,
    no_transaction: bool,
}

impl AckState {
    fn is_complete(&self) -> bool {
        self.no_transaction || self.expected.map_or(false, |n| self.received >= n)
    }
}

/// Blocking collector that folds per-cache statuses into one reply
///
/// - `NoTransaction` when no cache matched
/// - `Ok` when every cache reported `Ok`
/// - `Error` otherwise; the client must treat the outcome as unknown
#[derive(Debug, Default)]
pub struct AckCollector {
    state: Mutex<AckState>,
    done: Condvar,
}

impl AckCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until every expected cache reported, or `timeout` elapses
    ///
    /// Returns `None` on timeout.
    pub fn wait(&self, timeout: Duration) -> Option<Status> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while !state.is_complete() {
            let Some(deadline) = deadline else {
                self.done.wait(&mut state);
                continue;
            };
            if self.done.wait_until(&mut state, deadline).timed_out() && !state.is_complete() {
                return None;
            }
        }
        Some(Self::fold(&state))
    }

    /// Status reported by `cache_name`, if it reported
    pub fn status_of(&self, cache_name: &str) -> Option<Status> {
        self.state.lock().statuses.get(cache_name).copied()
    }

    /// Number of caches that reported so far
    pub fn received(&self) -> usize {
        self.state.lock().received
    }

    fn fold(state: &AckState) -> Status {
        if state.no_transaction {
            return Status::NoTransaction;
        }
        if state.statuses.values().all(|s| *s == Status::Ok) {
            Status::Ok
        } else {
            Status::Error
        }
    }
}

impl DecisionCollector for AckCollector {
    fn expected_size(&self, size: usize) {
        let mut state = self.state.lock();
        state.expected = Some(size);
        if state.is_complete() {
            self.done.notify_all();
        }
    }

    fn add_cache(&self, cache_name: &str, status: Status) {
        let mut state = self.state.lock();
        state.statuses.insert(cache_name.to_string(), status);
        state.received += 1;
        if state.is_complete() {
            self.done.notify_all();
        }
    }

    fn no_transaction_found(&self) {
        let mut state = self.state.lock();
        state.no_transaction = true;
        self.done.notify_all();
    }
}
