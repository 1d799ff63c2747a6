//! Cluster-wide transaction table coordinator
//!
//! [`GlobalTxTable`] is the entry point for every client-visible transaction
//! operation. It never mutates a [`TxState`] itself: every state change is a
//! [`TxFunction`] shipped through [`TxStore::apply`] and executed once, at the
//! key's owner. The coordinator only observes statuses and drives side
//! effects (local commit, remote commands, record removal).
//!
//! ## Reaper
//!
//! A repeating pass ([`GlobalTxTable::run`]) walks a snapshot of the table and,
//! for each timed-out record:
//!
//! | status | action |
//! |---|---|
//! | ACTIVE, PREPARING, PREPARED (non-recoverable) | conditional rollback, then complete |
//! | PREPARED (recoverable) | left to XA recovery |
//! | MARK_COMMIT, MARK_ROLLBACK | complete with the recorded decision |
//! | COMMITTED, ROLLED_BACK | remove the record |
//!
//! Records whose originator is another live member of the cache are skipped:
//! that member completes them itself.
//!
//! ## Completion
//!
//! 1. If this member holds the local handle, run the local commit/rollback on
//!    the blocking pool; heuristic outcomes are logged and swallowed.
//! 2. Otherwise, if this member is the originator, there is nothing to drive.
//! 3. Otherwise broadcast the decision: rollback, commit, or a one-phase
//!    prepare replaying the write-set, per the cache's [`CommitMode`].
//! 4. Mark the record completed and, once terminal, remove it.

use crate::collector::DecisionCollector;
use crate::config::{CommitMode, TxTableConfig};
use crate::functions::{TxFunction, XidPredicate};
use crate::local_table::PerCacheTxTable;
use crate::reaper::{ReaperStats, ReaperStatsSnapshot, ReaperTimer};
use dashmap::DashMap;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};
use txtable_core::{
    Address, CacheXid, ClusterRpc, LocalTransaction, Pending, Status, TimeService, TxCommand,
    TxResult, TxState, TxStore, Xid,
};
use txtable_storage::WorkerPool;

/// Coordinator over the replicated transaction table
pub struct GlobalTxTable {
    store: Arc<dyn TxStore>,
    rpc: Arc<dyn ClusterRpc>,
    time: Arc<dyn TimeService>,
    config: TxTableConfig,
    caches: DashMap<String, Arc<PerCacheTxTable>>,
    blocking: WorkerPool,
    reaper: ReaperTimer,
    stats: ReaperStats,
}

impl GlobalTxTable {
    /// Create a coordinator over `store`
    ///
    /// The reaper is not started; call [`GlobalTxTable::start`].
    ///
    /// # Errors
    ///
    /// Returns `TxError::Config` if `config` is invalid, or an error if the
    /// blocking pool cannot be created.
    pub fn new(
        store: Arc<dyn TxStore>,
        rpc: Arc<dyn ClusterRpc>,
        time: Arc<dyn TimeService>,
        config: TxTableConfig,
    ) -> TxResult<Self> {
        config.validate()?;
        let blocking = WorkerPool::new(
            "txtable-blocking",
            config.blocking_threads,
            config.max_queue_depth,
        )?;
        Ok(Self {
            store,
            rpc,
            time,
            config,
            caches: DashMap::new(),
            blocking,
            reaper: ReaperTimer::new(),
            stats: ReaperStats::default(),
        })
    }

    /// Configuration in effect
    pub fn config(&self) -> &TxTableConfig {
        &self.config
    }

    /// Address of this member
    pub fn local_address(&self) -> Address {
        self.rpc.local_address()
    }

    // ========================================================================
    // Caches
    // ========================================================================

    /// Register a transactional cache, returning its local table
    ///
    /// Registering twice returns the existing table.
    pub fn register_cache(&self, cache_name: &str) -> Arc<PerCacheTxTable> {
        let table = self
            .caches
            .entry(cache_name.to_string())
            .or_insert_with(|| {
                debug!(
                    target: "txtable::global",
                    cache = cache_name,
                    commit_mode = ?self.config.commit_mode(cache_name),
                    "Registered cache"
                );
                Arc::new(PerCacheTxTable::new(cache_name))
            });
        Arc::clone(table.value())
    }

    /// Local table of `cache_name`, if registered
    pub fn local_tx_table(&self, cache_name: &str) -> Option<Arc<PerCacheTxTable>> {
        self.caches.get(cache_name).map(|t| Arc::clone(t.value()))
    }

    // ========================================================================
    // Point operations
    // ========================================================================

    /// Apply `function` to `key` and wait up to `timeout` for its status
    ///
    /// Never fails: a timeout, a cancelled apply or a store failure is logged
    /// and reported as `Status::Error`.
    pub fn update(&self, key: CacheXid, function: TxFunction, timeout: Duration) -> Status {
        let pending = self.store.apply(key.clone(), Box::new(function));
        match pending.wait_timeout(timeout) {
            Ok(status) => status,
            Err(e) => {
                warn!(target: "txtable::global", key = %key, error = %e, "Update failed");
                Status::Error
            }
        }
    }

    /// Current record of `key`
    pub fn get_state(&self, key: &CacheXid) -> Option<TxState> {
        match self.store.get(key) {
            Ok(state) => state,
            Err(e) => {
                warn!(target: "txtable::global", key = %key, error = %e, "Read failed");
                None
            }
        }
    }

    /// Remove the record of `key`; true if one was removed
    pub fn remove(&self, key: &CacheXid) -> bool {
        match self.store.remove(key) {
            Ok(removed) => removed.is_some(),
            Err(e) => {
                warn!(target: "txtable::global", key = %key, error = %e, "Remove failed");
                false
            }
        }
    }

    /// True if no record is stored
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    // ========================================================================
    // Decisions
    // ========================================================================

    /// Record a commit decision on every cache of `xid`
    pub fn mark_to_commit(&self, xid: &Xid, collector: Arc<dyn DecisionCollector>) {
        self.on_decision(xid, true, collector);
    }

    /// Record a rollback decision on every cache of `xid`
    pub fn mark_to_rollback(&self, xid: &Xid, collector: Arc<dyn DecisionCollector>) {
        self.on_decision(xid, false, collector);
    }

    fn on_decision(&self, xid: &Xid, commit: bool, collector: Arc<dyn DecisionCollector>) {
        let keys = self.keys_of(xid);
        if keys.is_empty() {
            collector.no_transaction_found();
            return;
        }

        debug!(
            target: "txtable::global",
            xid = %xid,
            commit,
            caches = keys.len(),
            "Fanning out decision"
        );
        collector.expected_size(keys.len());
        for key in keys {
            let pending: Pending<Status> = self
                .store
                .apply(key.clone(), Box::new(TxFunction::set_decision(commit)));
            let collector = Arc::clone(&collector);
            pending.on_complete(move |result| {
                let status = result.unwrap_or_else(|e| {
                    warn!(target: "txtable::global", key = %key, error = %e, "Decision failed");
                    Status::Error
                });
                collector.add_cache(key.cache_name(), status);
            });
        }
    }

    /// Remove every record of `xid`, in parallel
    pub fn forget_transaction(&self, xid: &Xid) {
        let keys = self.keys_of(xid);
        debug!(target: "txtable::global", xid = %xid, caches = keys.len(), "Forgetting transaction");
        keys.par_iter().for_each(|key| {
            self.remove(key);
        });
    }

    /// Xids that XA recovery must resolve
    ///
    /// A record qualifies when PREPARED, recoverable and timed out. Each xid
    /// appears once however many caches it spans.
    pub fn get_prepared_transactions(&self) -> Vec<Xid> {
        let entries = match self.store.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(target: "txtable::global", error = %e, "Failed to scan for prepared transactions");
                return Vec::new();
            }
        };
        let now = self.time.time();
        let mut seen = FxHashSet::default();
        entries
            .into_iter()
            .filter(|(_, state)| {
                state.status() == Status::Prepared
                    && state.is_recoverable()
                    && state.has_timed_out(now)
            })
            .filter_map(|(key, _)| {
                let xid = key.xid().clone();
                seen.insert(xid.clone()).then_some(xid)
            })
            .collect()
    }

    fn keys_of(&self, xid: &Xid) -> Vec<CacheXid> {
        let predicate = XidPredicate::new(xid.clone());
        match self.store.keys_matching(&|key| predicate.test(key)) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(target: "txtable::global", xid = %xid, error = %e, "Key scan failed");
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Reaper lifecycle
    // ========================================================================

    /// Start the reaper; a no-op if already running
    ///
    /// # Errors
    ///
    /// Returns an error if the reaper thread cannot be spawned.
    pub fn start(self: &Arc<Self>) -> TxResult<()> {
        let table: Weak<Self> = Arc::downgrade(self);
        let started = self.reaper.start(self.config.reaper_interval(), move || {
            match table.upgrade() {
                Some(table) => {
                    table.run();
                    true
                }
                None => false,
            }
        })?;
        if started {
            info!(
                target: "txtable::reaper",
                interval_ms = self.config.reaper_interval_ms,
                "Reaper started"
            );
        }
        Ok(())
    }

    /// Stop the reaper; a no-op if not running
    pub fn stop(&self) {
        if self.reaper.stop() {
            info!(target: "txtable::reaper", "Reaper stopped");
        }
    }

    /// True while the reaper is scheduled
    pub fn is_reaper_running(&self) -> bool {
        self.reaper.is_running()
    }

    /// Reaper counters
    pub fn reaper_stats(&self) -> ReaperStatsSnapshot {
        self.stats.snapshot()
    }

    // ========================================================================
    // Reaper pass
    // ========================================================================

    /// One reaper pass over a snapshot of the table
    ///
    /// Entries are handled one at a time; a failure on one entry is logged and
    /// the pass moves on.
    pub fn run(&self) {
        self.stats.record_pass();
        let entries = match self.store.entries() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(target: "txtable::reaper", error = %e, "Failed to snapshot table");
                return;
            }
        };
        debug!(target: "txtable::reaper", entries = entries.len(), "Reaper pass");

        for (key, state) in entries {
            if !state.has_timed_out(self.time.time()) {
                continue;
            }
            if self.skip_reaper(state.originator(), key.cache_name()) {
                self.stats.record_skipped();
                debug!(
                    target: "txtable::reaper",
                    key = %key,
                    originator = %state.originator(),
                    "Originator alive, skipping"
                );
                continue;
            }
            self.reap(key, state);
        }
    }

    /// True if another live member originated the transaction
    fn skip_reaper(&self, originator: Address, cache_name: &str) -> bool {
        originator != self.rpc.local_address()
            && self.rpc.members(cache_name).contains(&originator)
    }

    fn reap(&self, key: CacheXid, state: TxState) {
        match state.status() {
            Status::Active | Status::Preparing => self.rollback_idle(key, state),
            Status::Prepared if !state.is_recoverable() => self.rollback_idle(key, state),
            Status::Prepared => {
                debug!(target: "txtable::reaper", key = %key, "Prepared and recoverable, left to recovery");
            }
            Status::MarkCommit => {
                self.complete_decided(&key, &state, true);
            }
            Status::MarkRollback => {
                self.complete_decided(&key, &state, false);
            }
            Status::Committed | Status::RolledBack => {
                // The snapshot may be stale: the owner removes only a terminal record
                let reply = self.update(
                    key.clone(),
                    TxFunction::remove_completed(),
                    self.config.completion_timeout(),
                );
                if reply == Status::Ok {
                    self.stats.record_garbage_collected();
                    debug!(target: "txtable::reaper", key = %key, status = %state.status(), "Removed completed record");
                }
            }
            // Reply codes are never stored
            Status::Ok | Status::Error | Status::NoTransaction => {}
        }
    }

    fn rollback_idle(&self, key: CacheXid, state: TxState) {
        let observed = state.status();
        let status = self.update(
            key.clone(),
            TxFunction::conditional_mark_as_rollback(observed),
            self.config.completion_timeout(),
        );
        if status != Status::Ok {
            // Someone else moved the record first
            debug!(
                target: "txtable::reaper",
                key = %key,
                observed = %observed,
                reply = %status,
                "Conditional rollback not applied"
            );
            return;
        }
        self.stats.record_rolled_back();
        info!(target: "txtable::reaper", key = %key, observed = %observed, "Rolling back idle transaction");
        self.complete_decided(&key, &state, false);
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Drive a decided transaction of `key` to completion
    ///
    /// Returns `NoTransaction` if there is no record, the current status if
    /// the record holds no decision yet, or the status of marking it completed.
    pub fn complete_transaction(&self, key: &CacheXid) -> Status {
        match self.get_state(key) {
            None => Status::NoTransaction,
            Some(state) => match state.status() {
                Status::MarkCommit => self.complete_decided(key, &state, true),
                Status::MarkRollback => self.complete_decided(key, &state, false),
                other => other,
            },
        }
    }

    fn complete_decided(&self, key: &CacheXid, state: &TxState, commit: bool) -> Status {
        let local = self
            .local_tx_table(key.cache_name())
            .and_then(|table| table.get_local_tx(key.xid()).map(|tx| (table, tx)));

        match local {
            Some((table, tx)) => {
                if !self.complete_local(key, table, tx, commit) {
                    return Status::Error;
                }
            }
            None if state.originator() == self.rpc.local_address() => {
                debug!(target: "txtable::global", key = %key, "No local handle, nothing to drive");
            }
            None => self.forward_decision(key, state, commit),
        }
        self.mark_completed(key, commit)
    }

    /// Run the local commit/rollback on the blocking pool and wait for it
    ///
    /// Returns false if the work could not be handed to the pool; the record
    /// is then left for a later pass.
    fn complete_local(
        &self,
        key: &CacheXid,
        table: Arc<PerCacheTxTable>,
        tx: Arc<dyn LocalTransaction>,
        commit: bool,
    ) -> bool {
        let (completer, pending) = Pending::<()>::pair();
        let task_key = key.clone();
        let submitted = self.blocking.submit(move || {
            if let Err(e) = tx.run_commit(!commit) {
                warn!(
                    target: "txtable::global",
                    key = %task_key,
                    commit,
                    heuristic = e.is_heuristic(),
                    error = %e,
                    "Local completion failed"
                );
            }
            table.remove_local_tx(task_key.xid());
            completer.complete(());
        });
        if let Err(e) = submitted {
            warn!(target: "txtable::global", key = %key, error = %e, "Local completion rejected");
            return false;
        }
        if let Err(e) = pending.wait_timeout(self.config.completion_timeout()) {
            warn!(target: "txtable::global", key = %key, error = %e, "Local completion did not finish in time");
        }
        true
    }

    /// Push the decision to every member of the cache
    fn forward_decision(&self, key: &CacheXid, state: &TxState, commit: bool) {
        let cache_name = key.cache_name();
        let topology_id = self.rpc.topology_id(cache_name);
        let gtx = state.global_transaction().clone();
        let command = if !commit {
            TxCommand::rollback(cache_name, topology_id, gtx)
        } else {
            match self.config.commit_mode(cache_name) {
                CommitMode::TwoPhase => TxCommand::commit(cache_name, topology_id, gtx),
                CommitMode::OnePhase => TxCommand::one_phase_prepare(
                    cache_name,
                    topology_id,
                    gtx,
                    state.modifications().map(|m| m.to_vec()).unwrap_or_default(),
                ),
            }
        };

        match self.rpc.broadcast(command) {
            Ok(responses) => {
                let nacks = responses.iter().filter(|(_, r)| !r.is_ack()).count();
                if nacks > 0 {
                    warn!(
                        target: "txtable::global",
                        key = %key,
                        commit,
                        members = responses.len(),
                        nacks,
                        "Some members did not acknowledge the decision"
                    );
                } else {
                    debug!(target: "txtable::global", key = %key, commit, members = responses.len(), "Decision forwarded");
                }
            }
            Err(e) => {
                warn!(target: "txtable::global", key = %key, commit, error = %e, "Decision broadcast failed");
            }
        }
    }

    fn mark_completed(&self, key: &CacheXid, commit: bool) -> Status {
        let status = self.update(
            key.clone(),
            TxFunction::set_completed(commit),
            self.config.completion_timeout(),
        );
        match status {
            Status::Ok => {
                self.update(
                    key.clone(),
                    TxFunction::remove_completed(),
                    self.config.completion_timeout(),
                );
                self.stats.record_completed();
                debug!(target: "txtable::global", key = %key, commit, "Transaction completed");
            }
            Status::NoTransaction => {
                debug!(target: "txtable::global", key = %key, "Record already gone");
            }
            other => {
                warn!(target: "txtable::global", key = %key, commit, reply = %other, "Failed to mark completed");
            }
        }
        status
    }
}

impl Drop for GlobalTxTable {
    fn drop(&mut self) {
        self.reaper.stop();
        self.blocking.shutdown();
    }
}

impl std::fmt::Debug for GlobalTxTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalTxTable")
            .field("local_address", &self.rpc.local_address())
            .field("caches", &self.caches.len())
            .field("reaper_running", &self.reaper.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use txtable_core::{
        ControlledTimeService, GlobalTransaction, LocalTxError, RpcResponse, TxError,
    };
    use txtable_storage::{ShardedTxStore, StoreConfig};

    struct SoloCluster {
        me: Address,
        broadcasts: AtomicUsize,
    }

    impl ClusterRpc for SoloCluster {
        fn local_address(&self) -> Address {
            self.me
        }

        fn members(&self, _cache_name: &str) -> Vec<Address> {
            vec![self.me]
        }

        fn topology_id(&self, _cache_name: &str) -> u32 {
            1
        }

        fn broadcast(&self, _command: TxCommand) -> TxResult<Vec<(Address, RpcResponse)>> {
            self.broadcasts.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct CountingTx {
        gtx: GlobalTransaction,
        rollbacks: AtomicUsize,
        commits: AtomicUsize,
    }

    impl LocalTransaction for CountingTx {
        fn global_transaction(&self) -> &GlobalTransaction {
            &self.gtx
        }

        fn run_commit(&self, rollback_only: bool) -> Result<(), LocalTxError> {
            if rollback_only {
                self.rollbacks.fetch_add(1, Ordering::SeqCst);
            } else {
                self.commits.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct Fixture {
        table: GlobalTxTable,
        clock: Arc<ControlledTimeService>,
        cluster: Arc<SoloCluster>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ControlledTimeService::new(1_000));
        let store = Arc::new(ShardedTxStore::new(StoreConfig::default(), clock.clone()).unwrap());
        let cluster = Arc::new(SoloCluster {
            me: Address::random(),
            broadcasts: AtomicUsize::new(0),
        });
        let table =
            GlobalTxTable::new(store, cluster.clone(), clock.clone(), TxTableConfig::default())
                .unwrap();
        Fixture {
            table,
            clock,
            cluster,
        }
    }

    fn xid(name: &str) -> Xid {
        Xid::new(7, name.as_bytes().to_vec(), b"b".to_vec()).unwrap()
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_update_create_and_read() {
        let f = fixture();
        let key = CacheXid::new("cacheA", xid("t1"));
        let gtx = GlobalTransaction::new(1, f.cluster.me, xid("t1"));

        let status = f.table.update(
            key.clone(),
            TxFunction::create_state(gtx.clone(), false, 1_000),
            WAIT,
        );
        assert_eq!(status, Status::Ok);
        assert_eq!(f.table.get_state(&key).unwrap().status(), Status::Active);

        // Identical retry is accepted, a different one refused
        let retry = f.table.update(
            key.clone(),
            TxFunction::create_state(gtx.clone(), false, 1_000),
            WAIT,
        );
        assert_eq!(retry, Status::Ok);
        let other = f.table.update(
            key.clone(),
            TxFunction::create_state(gtx, true, 1_000),
            WAIT,
        );
        assert_eq!(other, Status::Error);
    }

    #[test]
    fn test_register_cache_is_idempotent() {
        let f = fixture();
        let a = f.table.register_cache("cacheA");
        let b = f.table.register_cache("cacheA");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(f.table.local_tx_table("cacheB").is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let clock = Arc::new(ControlledTimeService::new(0));
        let store = Arc::new(ShardedTxStore::new(StoreConfig::default(), clock.clone()).unwrap());
        let cluster = Arc::new(SoloCluster {
            me: Address::random(),
            broadcasts: AtomicUsize::new(0),
        });
        let config = TxTableConfig {
            blocking_threads: 0,
            ..TxTableConfig::default()
        };
        let err = GlobalTxTable::new(store, cluster, clock, config).unwrap_err();
        assert!(matches!(err, TxError::Config(_)));
    }

    #[test]
    fn test_reaper_rolls_back_local_idle_transaction() {
        let f = fixture();
        let x = xid("idle");
        let key = CacheXid::new("cacheA", x.clone());
        let gtx = GlobalTransaction::new(3, f.cluster.me, x.clone());
        let local = Arc::new(CountingTx {
            gtx: gtx.clone(),
            rollbacks: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
        });
        f.table
            .register_cache("cacheA")
            .create_local_tx(x.clone(), local.clone());
        f.table
            .update(key.clone(), TxFunction::create_state(gtx, false, 10), WAIT);

        f.clock.advance(Duration::from_millis(11));
        f.table.run();

        assert_eq!(local.rollbacks.load(Ordering::SeqCst), 1);
        assert_eq!(local.commits.load(Ordering::SeqCst), 0);
        assert!(f.table.get_state(&key).is_none());
        assert!(f.table.local_tx_table("cacheA").unwrap().is_empty());
        assert_eq!(f.cluster.broadcasts.load(Ordering::SeqCst), 0);

        let stats = f.table.reaper_stats();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.rolled_back, 1);
        assert_eq!(stats.completed, 1);
    }

    #[test]
    fn test_complete_transaction_statuses() {
        let f = fixture();
        let key = CacheXid::new("cacheA", xid("c"));
        assert_eq!(f.table.complete_transaction(&key), Status::NoTransaction);

        let gtx = GlobalTransaction::new(4, f.cluster.me, xid("c"));
        f.table
            .update(key.clone(), TxFunction::create_state(gtx, false, 60_000), WAIT);
        // No decision yet: reported, not driven
        assert_eq!(f.table.complete_transaction(&key), Status::Active);

        f.table
            .update(key.clone(), TxFunction::set_decision(false), WAIT);
        assert_eq!(f.table.complete_transaction(&key), Status::Ok);
        assert!(f.table.get_state(&key).is_none());
    }

    #[test]
    fn test_reap_removes_only_terminal_records() {
        let f = fixture();
        let key = CacheXid::new("cacheA", xid("gc"));
        let gtx = GlobalTransaction::new(5, f.cluster.me, xid("gc"));
        f.table
            .update(key.clone(), TxFunction::create_state(gtx, false, 10), WAIT);

        // A snapshot claiming a terminal status does not remove a live record
        let stale = f
            .table
            .get_state(&key)
            .unwrap()
            .set_status(Status::Committed, true, 2_000);
        f.table.reap(key.clone(), stale);
        assert_eq!(f.table.get_state(&key).unwrap().status(), Status::Active);
        assert_eq!(f.table.reaper_stats().garbage_collected, 0);

        f.table
            .update(key.clone(), TxFunction::set_decision(false), WAIT);
        f.table
            .update(key.clone(), TxFunction::set_completed(false), WAIT);
        let finished = f.table.get_state(&key).unwrap();
        assert_eq!(finished.status(), Status::RolledBack);
        f.table.reap(key.clone(), finished);
        assert!(f.table.get_state(&key).is_none());
        assert_eq!(f.table.reaper_stats().garbage_collected, 1);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let f = fixture();
        let table = Arc::new(f.table);
        table.start().unwrap();
        table.start().unwrap();
        assert!(table.is_reaper_running());
        table.stop();
        table.stop();
        assert!(!table.is_reaper_running());
    }
}
