//! Sharded in-memory replicated TxState map
//!
//! Emulates the replicated cache the transaction table lives in.
//!
//! # Design
//!
//! - DashMap: primary copy, sharded, lock-free reads
//! - Owner lanes: each key hashes (FxHash) to one single-threaded
//!   [`WorkerPool`]. An apply runs on its key's lane, so applies to the same
//!   key execute one at a time, in submission order, exactly once.
//! - Entry lock: the transform runs while holding the key's DashMap entry, so
//!   direct `put`/`remove` calls cannot interleave with it.
//! - Backups: every new record is encoded with `rmp-serde` and written to each
//!   backup copy before the apply resolves (synchronous replication).
//!
//! Different keys on different lanes never contend.

use crate::background::{PoolStats, WorkerPool};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, warn};
use txtable_core::{
    CacheXid, Mutation, Pending, StateTransform, Status, TimeService, TxError, TxResult, TxState,
    TxStore,
};

/// Configuration of the in-memory store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Number of owner lanes (single-threaded executors)
    #[serde(default = "default_owner_lanes")]
    pub owner_lanes: usize,
    /// Number of synchronous backup copies
    #[serde(default = "default_backups")]
    pub backups: usize,
    /// Queue bound of each owner lane
    #[serde(default = "default_max_queue_depth")]
    pub max_queue_depth: usize,
}

fn default_owner_lanes() -> usize {
    4
}

fn default_backups() -> usize {
    1
}

fn default_max_queue_depth() -> usize {
    4096
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            owner_lanes: default_owner_lanes(),
            backups: default_backups(),
            max_queue_depth: default_max_queue_depth(),
        }
    }
}

struct StoreInner {
    primary: DashMap<CacheXid, TxState>,
    /// Encoded replicas, one map per backup
    backups: Vec<DashMap<CacheXid, Vec<u8>>>,
    time: Arc<dyn TimeService>,
}

impl StoreInner {
    fn replicate(&self, key: &CacheXid, state: Option<&TxState>) -> TxResult<()> {
        match state {
            Some(state) => {
                let payload = rmp_serde::to_vec(state)
                    .map_err(|e| TxError::serialization(e.to_string()))?;
                for backup in &self.backups {
                    backup.insert(key.clone(), payload.clone());
                }
            }
            None => {
                for backup in &self.backups {
                    backup.remove(key);
                }
            }
        }
        Ok(())
    }

    /// Run one transform under the key's entry lock
    fn execute(&self, key: CacheXid, transform: &dyn StateTransform) -> TxResult<Status> {
        let now = self.time.time();
        match self.primary.entry(key) {
            Entry::Occupied(mut occupied) => {
                let transition = transform.transform(Some(occupied.get()), now);
                match transition.mutation {
                    Mutation::Unchanged => {}
                    Mutation::Replace(next) => {
                        self.replicate(occupied.key(), Some(&next))?;
                        occupied.insert(next);
                    }
                    Mutation::Remove => {
                        self.replicate(occupied.key(), None)?;
                        occupied.remove();
                    }
                }
                Ok(transition.status)
            }
            Entry::Vacant(vacant) => {
                let transition = transform.transform(None, now);
                match transition.mutation {
                    Mutation::Unchanged | Mutation::Remove => {}
                    Mutation::Replace(next) => {
                        self.replicate(vacant.key(), Some(&next))?;
                        vacant.insert(next);
                    }
                }
                Ok(transition.status)
            }
        }
    }
}

/// In-memory [`TxStore`] with owner lanes and synchronous backups
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use txtable_core::SystemTimeService;
/// use txtable_storage::{ShardedTxStore, StoreConfig};
///
/// let store = ShardedTxStore::new(StoreConfig::default(), Arc::new(SystemTimeService::new()))?;
/// let status = store.apply(key, Box::new(function)).wait_timeout(timeout)?;
/// ```
pub struct ShardedTxStore {
    inner: Arc<StoreInner>,
    lanes: Vec<WorkerPool>,
}

impl ShardedTxStore {
    /// Create a store
    ///
    /// # Errors
    ///
    /// Returns an error if the owner lanes cannot be started.
    pub fn new(config: StoreConfig, time: Arc<dyn TimeService>) -> TxResult<Self> {
        let lanes = (0..config.owner_lanes.max(1))
            .map(|i| WorkerPool::new(&format!("txtable-owner-{}", i), 1, config.max_queue_depth))
            .collect::<TxResult<Vec<_>>>()?;
        let backups = (0..config.backups).map(|_| DashMap::new()).collect();
        Ok(Self {
            inner: Arc::new(StoreInner {
                primary: DashMap::new(),
                backups,
                time,
            }),
            lanes,
        })
    }

    /// Index of the owner lane for `key`
    pub fn owner_of(&self, key: &CacheXid) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() % self.lanes.len() as u64) as usize
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.inner.primary.len()
    }

    /// Decode the copy of `key` held by backup `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the payload is corrupt.
    pub fn backup_copy(&self, index: usize, key: &CacheXid) -> TxResult<Option<TxState>> {
        let backup = self
            .inner
            .backups
            .get(index)
            .ok_or_else(|| TxError::storage(format!("no backup #{}", index)))?;
        match backup.get(key) {
            Some(payload) => rmp_serde::from_slice(payload.value())
                .map(Some)
                .map_err(|e| TxError::serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Block until every queued apply has executed
    pub fn drain(&self) {
        for lane in &self.lanes {
            lane.drain();
        }
    }

    /// Stop all owner lanes; later applies resolve with `TxError::Rejected`
    pub fn shutdown(&self) {
        for lane in &self.lanes {
            lane.shutdown();
        }
    }

    /// Metrics of every owner lane
    pub fn lane_stats(&self) -> Vec<PoolStats> {
        self.lanes.iter().map(WorkerPool::stats).collect()
    }
}

impl TxStore for ShardedTxStore {
    fn get(&self, key: &CacheXid) -> TxResult<Option<TxState>> {
        Ok(self.inner.primary.get(key).map(|e| e.value().clone()))
    }

    fn put(&self, key: CacheXid, state: TxState) -> TxResult<()> {
        let entry = self.inner.primary.entry(key);
        self.inner.replicate(entry.key(), Some(&state))?;
        entry.insert(state);
        Ok(())
    }

    fn remove(&self, key: &CacheXid) -> TxResult<Option<TxState>> {
        match self.inner.primary.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                self.inner.replicate(key, None)?;
                Ok(Some(occupied.remove()))
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    fn entries(&self) -> TxResult<Vec<(CacheXid, TxState)>> {
        Ok(self
            .inner
            .primary
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect())
    }

    fn keys_matching(&self, filter: &dyn Fn(&CacheXid) -> bool) -> TxResult<Vec<CacheXid>> {
        Ok(self
            .inner
            .primary
            .iter()
            .filter(|e| filter(e.key()))
            .map(|e| e.key().clone())
            .collect())
    }

    fn apply(&self, key: CacheXid, transform: Box<dyn StateTransform>) -> Pending<Status> {
        let (completer, pending) = Pending::pair();
        let lane = &self.lanes[self.owner_of(&key)];
        let inner = Arc::clone(&self.inner);

        // The completer lives inside the task: if the task is dropped unrun or
        // panics, the handle resolves as cancelled.
        let submitted = lane.submit(move || {
            debug!(target: "txtable::store", key = %key, ?transform, "Applying transform");
            match inner.execute(key, transform.as_ref()) {
                Ok(status) => completer.complete(status),
                Err(e) => completer.fail(e),
            }
        });

        match submitted {
            Ok(()) => pending,
            Err(e) => {
                warn!(target: "txtable::store", error = %e, "Apply rejected by owner lane");
                Pending::resolved(Err(e))
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.inner.primary.is_empty()
    }
}
