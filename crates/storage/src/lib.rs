//! Storage layer for the transaction table
//!
//! This crate implements the storage collaborator with:
//! - WorkerPool: fixed pool of named worker threads with back-pressure
//! - ShardedTxStore: DashMap-backed replicated CacheXid → TxState map
//! - Owner lanes: per-key serialized, exactly-once atomic apply
//! - Synchronous backups holding `rmp-serde` encoded copies
//!
//! # Ordering
//!
//! Applies on the same key are serializable. There is no atomicity across
//! keys: callers fanning out over several keys can observe partial progress.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod background;
pub mod sharded;

pub use background::{PoolStats, WorkerPool};
pub use sharded::{ShardedTxStore, StoreConfig};
