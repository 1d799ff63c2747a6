//! txtable - Replicated global transaction table for a clustered cache
//!
//! Tracks every client (XA) transaction that spans one or more caches of the
//! cluster, so that any member can answer recovery queries, apply commit or
//! rollback decisions, and clean up after members that left.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use txtable::{GlobalTxTable, ShardedTxStore, StoreConfig, SystemTimeService, TxTableConfig};
//!
//! let time = Arc::new(SystemTimeService::new());
//! let store = Arc::new(ShardedTxStore::new(StoreConfig::default(), time.clone())?);
//! let table = Arc::new(GlobalTxTable::new(store, cluster, time, TxTableConfig::default())?);
//! table.start()?;
//! ```
//!
//! # Architecture
//!
//! - `txtable-core`: identifiers, [`TxState`], [`Status`] and the seams
//!   ([`TxStore`], [`ClusterRpc`], [`LocalTransaction`])
//! - `txtable-storage`: [`ShardedTxStore`], a partitioned store applying
//!   transforms at each key's owner lane
//! - `txtable-concurrency`: [`TxFunction`] transitions and the
//!   [`GlobalTxTable`] coordinator with its reaper

pub use txtable_concurrency::*;
pub use txtable_core::*;
pub use txtable_storage::{PoolStats, ShardedTxStore, StoreConfig, WorkerPool};
