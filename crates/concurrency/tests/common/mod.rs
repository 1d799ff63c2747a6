//! Shared fixtures for the transaction table integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use txtable_concurrency::{GlobalTxTable, TxFunction, TxTableConfig};
use txtable_core::{
    Address, CacheXid, ClusterRpc, ControlledTimeService, GlobalTransaction, LocalTransaction,
    LocalTxError, RpcResponse, Status, TxCommand, TxResult, Xid,
};
use txtable_storage::{ShardedTxStore, StoreConfig};

/// Bound on every wait in these tests
pub const WAIT: Duration = Duration::from_secs(5);

/// Route tracing output through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ============================================================================
// Cluster
// ============================================================================

/// In-memory view of the cluster from one member
pub struct FakeCluster {
    me: Address,
    members: Mutex<Vec<Address>>,
    broadcasts: Mutex<Vec<TxCommand>>,
}

impl FakeCluster {
    /// Member `me` of a cluster whose caches span `members`
    pub fn new(me: Address, members: Vec<Address>) -> Arc<Self> {
        Arc::new(Self {
            me,
            members: Mutex::new(members),
            broadcasts: Mutex::new(Vec::new()),
        })
    }

    /// Single-member cluster
    pub fn solo() -> Arc<Self> {
        let me = Address::random();
        Self::new(me, vec![me])
    }

    /// Replace the membership (a member left or joined)
    pub fn set_members(&self, members: Vec<Address>) {
        *self.members.lock() = members;
    }

    /// Commands broadcast so far
    pub fn broadcasts(&self) -> Vec<TxCommand> {
        self.broadcasts.lock().clone()
    }
}

impl ClusterRpc for FakeCluster {
    fn local_address(&self) -> Address {
        self.me
    }

    fn members(&self, _cache_name: &str) -> Vec<Address> {
        self.members.lock().clone()
    }

    fn topology_id(&self, _cache_name: &str) -> u32 {
        3
    }

    fn broadcast(&self, command: TxCommand) -> TxResult<Vec<(Address, RpcResponse)>> {
        self.broadcasts.lock().push(command);
        Ok(self
            .members
            .lock()
            .iter()
            .filter(|a| **a != self.me)
            .map(|a| (*a, RpcResponse::Void))
            .collect())
    }
}

// ============================================================================
// Local transactions
// ============================================================================

/// Local handle recording how it was completed
pub struct RecordingTx {
    gtx: GlobalTransaction,
    failure: Option<LocalTxError>,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl RecordingTx {
    /// Handle completing cleanly
    pub fn new(gtx: GlobalTransaction) -> Arc<Self> {
        Arc::new(Self {
            gtx,
            failure: None,
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        })
    }

    /// Handle whose completion reports `failure`
    pub fn failing(gtx: GlobalTransaction, failure: LocalTxError) -> Arc<Self> {
        Arc::new(Self {
            gtx,
            failure: Some(failure),
            commits: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        })
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl LocalTransaction for RecordingTx {
    fn global_transaction(&self) -> &GlobalTransaction {
        &self.gtx
    }

    fn run_commit(&self, rollback_only: bool) -> Result<(), LocalTxError> {
        if rollback_only {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
        } else {
            self.commits.fetch_add(1, Ordering::SeqCst);
        }
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// One member: coordinator, its cluster view and the shared clock
pub struct Node {
    pub table: Arc<GlobalTxTable>,
    pub cluster: Arc<FakeCluster>,
    pub clock: Arc<ControlledTimeService>,
    pub store: Arc<ShardedTxStore>,
}

impl Node {
    pub fn address(&self) -> Address {
        self.cluster.local_address()
    }
}

/// Fresh store and clock
pub fn shared_store() -> (Arc<ShardedTxStore>, Arc<ControlledTimeService>) {
    let clock = Arc::new(ControlledTimeService::new(1_000_000));
    let store = Arc::new(ShardedTxStore::new(StoreConfig::default(), clock.clone()).unwrap());
    (store, clock)
}

/// Member over an existing store
pub fn node_on(
    store: &Arc<ShardedTxStore>,
    clock: &Arc<ControlledTimeService>,
    cluster: Arc<FakeCluster>,
    config: TxTableConfig,
) -> Node {
    let table =
        GlobalTxTable::new(store.clone(), cluster.clone(), clock.clone(), config).unwrap();
    Node {
        table: Arc::new(table),
        cluster,
        clock: clock.clone(),
        store: store.clone(),
    }
}

/// Single-member node with default config
pub fn solo_node() -> Node {
    let (store, clock) = shared_store();
    node_on(&store, &clock, FakeCluster::solo(), TxTableConfig::default())
}

pub fn xid(name: &str) -> Xid {
    Xid::new(0x4254, name.as_bytes().to_vec(), b"branch".to_vec()).unwrap()
}

/// Create an ACTIVE record for `xid` in `cache`, originated by `originator`
pub fn begin(
    node: &Node,
    cache: &str,
    xid: &Xid,
    originator: Address,
    recoverable: bool,
    timeout_ms: u64,
) -> (CacheXid, GlobalTransaction) {
    let key = CacheXid::new(cache, xid.clone());
    let gtx = GlobalTransaction::new(42, originator, xid.clone());
    let status = node.table.update(
        key.clone(),
        TxFunction::create_state(gtx.clone(), recoverable, timeout_ms),
        WAIT,
    );
    assert_eq!(status, Status::Ok);
    (key, gtx)
}

/// Apply `function` and assert the reply
pub fn expect(node: &Node, key: &CacheXid, function: TxFunction, reply: Status) {
    assert_eq!(node.table.update(key.clone(), function, WAIT), reply);
}
