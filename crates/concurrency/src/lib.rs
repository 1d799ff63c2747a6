//! Global transaction table for the clustered cache
//!
//! This crate coordinates client transactions across caches:
//! - [`TxFunction`]: the closed set of atomic transitions over a `TxState`
//! - [`PerCacheTxTable`]: node-local xid → running transaction handles
//! - [`GlobalTxTable`]: decisions, recovery queries, completion and the reaper
//! - [`TxTableConfig`]: reaper schedule and per-cache commit mode
//!
//! Every state change travels through `TxStore::apply` and runs once at the
//! key's owner; the coordinator never writes a record directly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod functions;
pub mod global_table;
pub mod local_table;
pub mod reaper;

pub use collector::{AckCollector, DecisionCollector};
pub use config::{CacheTxConfig, CommitMode, TxTableConfig, CONFIG_FILE_NAME};
pub use functions::{TxFunction, XidPredicate};
pub use global_table::GlobalTxTable;
pub use local_table::PerCacheTxTable;
pub use reaper::{ReaperStats, ReaperStatsSnapshot, ReaperTimer};
