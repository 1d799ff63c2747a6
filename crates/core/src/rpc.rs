//! Commands broadcast to cache members
//!
//! When the member that decides a transaction's fate holds no local handle for
//! it, the outcome is pushed to every member hosting the cache. Members without
//! a matching local transaction treat the command as a no-op.

use crate::types::{GlobalTransaction, Modification};
use serde::{Deserialize, Serialize};

/// What a broadcast asks members to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxCommandKind {
    /// Roll back the transaction
    Rollback,
    /// Commit an already prepared transaction
    Commit,
    /// Replay the write-set as a prepare, committing at once when `one_phase`
    Prepare {
        /// Write-set to replay
        modifications: Vec<Modification>,
        /// Commit in the same round
        one_phase: bool,
    },
}

/// Transaction command addressed to all members hosting `cache_name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCommand {
    /// Target cache
    pub cache_name: String,
    /// Topology the sender observed when building the command
    pub topology_id: u32,
    /// Transaction the command applies to
    pub global_transaction: GlobalTransaction,
    /// Requested action
    pub kind: TxCommandKind,
}

impl TxCommand {
    /// Rollback command
    pub fn rollback(
        cache_name: impl Into<String>,
        topology_id: u32,
        global_transaction: GlobalTransaction,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            topology_id,
            global_transaction,
            kind: TxCommandKind::Rollback,
        }
    }

    /// Commit command
    pub fn commit(
        cache_name: impl Into<String>,
        topology_id: u32,
        global_transaction: GlobalTransaction,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            topology_id,
            global_transaction,
            kind: TxCommandKind::Commit,
        }
    }

    /// One-phase prepare replaying `modifications`
    pub fn one_phase_prepare(
        cache_name: impl Into<String>,
        topology_id: u32,
        global_transaction: GlobalTransaction,
        modifications: Vec<Modification>,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            topology_id,
            global_transaction,
            kind: TxCommandKind::Prepare {
                modifications,
                one_phase: true,
            },
        }
    }
}

/// Per-member reply to a broadcast
///
/// Only void and valid replies count as acknowledgements. The coordinator
/// marks the transaction completed whatever the replies are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcResponse {
    /// Command executed, nothing to report
    Void,
    /// Command executed and produced a value
    Valid,
    /// Member failed to execute the command
    Exception(String),
}

impl RpcResponse {
    /// True for void and valid replies
    pub fn is_ack(&self) -> bool {
        matches!(self, RpcResponse::Void | RpcResponse::Valid)
    }
}
