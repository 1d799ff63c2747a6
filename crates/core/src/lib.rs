//! Core types and traits for the global transaction table
//!
//! This crate defines the foundational types used throughout the system:
//! - Address: Cluster member identity
//! - Xid / GlobalTransaction: Client transaction identity, embedding the originator
//! - CacheXid: Composite key (cache name + xid) of one participation record
//! - Status: Control codes and lifecycle codes
//! - TxState: Immutable per-cache lifecycle record
//! - Pending: One-shot result handle used by asynchronous applies
//! - Traits: Collaborator seams (TxStore, ClusterRpc, LocalTransaction, StateTransform)
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod pending;
pub mod rpc;
pub mod state;
pub mod status;
pub mod time;
pub mod traits;
pub mod types;

pub use error::{LocalTxError, TxError, TxResult};
pub use pending::{Completer, Pending};
pub use rpc::{RpcResponse, TxCommand, TxCommandKind};
pub use state::TxState;
pub use status::Status;
pub use time::{ControlledTimeService, SystemTimeService, TimeService};
pub use traits::{ClusterRpc, LocalTransaction, Mutation, StateTransform, Transition, TxStore};
pub use types::{Address, CacheXid, GlobalTransaction, Modification, Xid};
