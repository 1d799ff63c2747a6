//! Per-cache transaction state record
//!
//! `TxState` is the value stored under a [`CacheXid`](crate::CacheXid) in the
//! replicated map. It is immutable: every update builds a new record from the
//! old one, because the record travels as the payload of a replicated atomic
//! apply and the old value must remain readable by concurrent iterators.

use crate::status::Status;
use crate::types::{Address, GlobalTransaction, Modification};
use serde::{Deserialize, Serialize};

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Lifecycle record of one cache's participation in a client transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxState {
    global_transaction: GlobalTransaction,
    status: Status,
    recoverable: bool,
    /// Idle timeout in milliseconds
    timeout_ms: u64,
    /// Monotonic nanoseconds of the last update
    last_access_time: u64,
    /// Write-set, present only from PREPARING until a transition clears it
    modifications: Option<Vec<Modification>>,
}

impl TxState {
    /// Create an ACTIVE record
    pub fn new(
        global_transaction: GlobalTransaction,
        recoverable: bool,
        timeout_ms: u64,
        now: u64,
    ) -> Self {
        Self {
            global_transaction,
            status: Status::Active,
            recoverable,
            timeout_ms,
            last_access_time: now,
            modifications: None,
        }
    }

    /// Server-side transaction identity
    pub fn global_transaction(&self) -> &GlobalTransaction {
        &self.global_transaction
    }

    /// Member that accepted the client connection
    pub fn originator(&self) -> Address {
        self.global_transaction.originator()
    }

    /// Current lifecycle status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether XA recovery owns this transaction once prepared
    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Idle timeout in milliseconds
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Monotonic nanoseconds of the last update
    pub fn last_access_time(&self) -> u64 {
        self.last_access_time
    }

    /// Prepared write-set, if still retained
    pub fn modifications(&self) -> Option<&[Modification]> {
        self.modifications.as_deref()
    }

    /// `last_access_time + timeout < now`, strictly
    ///
    /// At exact equality the transaction is not timed out. An overflowing
    /// deadline saturates and never times out.
    pub fn has_timed_out(&self, now: u64) -> bool {
        let deadline = self
            .last_access_time
            .saturating_add(self.timeout_ms.saturating_mul(NANOS_PER_MILLI));
        deadline < now
    }

    /// New record in PREPARING carrying the write-set
    pub fn mark_preparing(&self, modifications: Vec<Modification>, now: u64) -> TxState {
        TxState {
            global_transaction: self.global_transaction.clone(),
            status: Status::Preparing,
            recoverable: self.recoverable,
            timeout_ms: self.timeout_ms,
            last_access_time: now,
            modifications: Some(modifications),
        }
    }

    /// New record with `status` and a refreshed access time
    ///
    /// Drops the write-set when `clear_modifications` is set.
    pub fn set_status(&self, status: Status, clear_modifications: bool, now: u64) -> TxState {
        debug_assert!(!status.is_control(), "{} is never persisted", status);
        TxState {
            global_transaction: self.global_transaction.clone(),
            status,
            recoverable: self.recoverable,
            timeout_ms: self.timeout_ms,
            last_access_time: now,
            modifications: if clear_modifications {
                None
            } else {
                self.modifications.clone()
            },
        }
    }

    /// True if a begin for `(global_transaction, recoverable, timeout_ms)`
    /// is a retry of the one that created this record
    pub fn is_same_as(
        &self,
        global_transaction: &GlobalTransaction,
        recoverable: bool,
        timeout_ms: u64,
    ) -> bool {
        self.global_transaction == *global_transaction
            && self.recoverable == recoverable
            && self.timeout_ms == timeout_ms
    }
}
