//! Collaborator traits
//!
//! This module defines the seams between the transaction table and the
//! systems it relies on:
//! - [`TxStore`]: replicated CacheXid → TxState map with atomic per-key apply
//! - [`StateTransform`]: the pure function an apply executes at the key owner
//! - [`ClusterRpc`]: membership view and command broadcast
//! - [`LocalTransaction`]: handle of a transaction running on this member

use crate::error::{LocalTxError, TxResult};
use crate::pending::Pending;
use crate::rpc::{RpcResponse, TxCommand};
use crate::state::TxState;
use crate::status::Status;
use crate::types::{Address, CacheXid, GlobalTransaction};
use std::fmt;

/// What an apply does to the stored record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Leave the record (or its absence) as is
    Unchanged,
    /// Store a new record
    Replace(TxState),
    /// Delete the record
    Remove,
}

/// Result of a state transform: the mutation plus the status returned to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Storage effect
    pub mutation: Mutation,
    /// Status reported to the caller
    pub status: Status,
}

impl Transition {
    /// No storage effect
    pub fn unchanged(status: Status) -> Self {
        Self {
            mutation: Mutation::Unchanged,
            status,
        }
    }

    /// Store `state`
    pub fn replace(state: TxState, status: Status) -> Self {
        Self {
            mutation: Mutation::Replace(state),
            status,
        }
    }

    /// Delete the record
    pub fn remove(status: Status) -> Self {
        Self {
            mutation: Mutation::Remove,
            status,
        }
    }
}

/// Pure state transform executed by [`TxStore::apply`]
///
/// Implementations must be deterministic: the same input and clock value
/// always yield the same transition. They never mutate `current`.
pub trait StateTransform: Send + fmt::Debug + 'static {
    /// Compute the next record from the current one (`None` = absent)
    fn transform(&self, current: Option<&TxState>, now: u64) -> Transition;
}

/// Replicated map from [`CacheXid`] to [`TxState`]
///
/// This is the single cluster-wide source of truth. Point operations are
/// plain reads and writes; every lifecycle transition goes through
/// [`apply`](TxStore::apply).
///
/// Thread safety: All methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync).
pub trait TxStore: Send + Sync {
    /// Read the record for `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn get(&self, key: &CacheXid) -> TxResult<Option<TxState>>;

    /// Write a record unconditionally
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn put(&self, key: CacheXid, state: TxState) -> TxResult<()>;

    /// Delete the record for `key`, returning the previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn remove(&self, key: &CacheXid) -> TxResult<Option<TxState>>;

    /// Snapshot of every stored record
    ///
    /// Order is unspecified. Records updated while the snapshot is taken may
    /// appear in either their old or new form.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn entries(&self) -> TxResult<Vec<(CacheXid, TxState)>>;

    /// Keys of the records accepted by `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn keys_matching(&self, filter: &dyn Fn(&CacheXid) -> bool) -> TxResult<Vec<CacheXid>>;

    /// Apply `transform` atomically at the current owner of `key`
    ///
    /// The transform runs exactly once, serialized with every other apply on
    /// the same key, and its result is replicated before the handle resolves.
    fn apply(&self, key: CacheXid, transform: Box<dyn StateTransform>) -> Pending<Status>;

    /// True if no record is stored
    fn is_empty(&self) -> bool;
}

/// Membership view and broadcast transport
pub trait ClusterRpc: Send + Sync {
    /// Address of this member
    fn local_address(&self) -> Address;

    /// Members currently hosting `cache_name`
    fn members(&self, cache_name: &str) -> Vec<Address>;

    /// Topology version of `cache_name` as seen by this member
    fn topology_id(&self, cache_name: &str) -> u32;

    /// Send `command` to every member hosting its cache and collect replies
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be delivered.
    fn broadcast(&self, command: TxCommand) -> TxResult<Vec<(Address, RpcResponse)>>;
}

/// Transaction executing on this member
///
/// The runtime performs the data mutation and its own cleanup. The table only
/// decides whether and when to invoke it.
pub trait LocalTransaction: Send + Sync {
    /// Identity of the transaction
    fn global_transaction(&self) -> &GlobalTransaction;

    /// Commit, or roll back when `rollback_only` is set
    ///
    /// # Errors
    ///
    /// Returns the heuristic or runtime outcome if completion was not clean.
    fn run_commit(&self, rollback_only: bool) -> Result<(), LocalTxError>;
}
