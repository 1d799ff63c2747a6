//! Atomic transition functions
//!
//! Each variant of [`TxFunction`] is a pure transform applied exactly once, at
//! the current owner of a [`CacheXid`], serialized with every other transform
//! on the same key. The store hands it the current record (or its absence) and
//! the owner's clock; the function returns the storage mutation and a status
//! for the caller.
//!
//! ## Return codes
//!
//! | code | meaning |
//! |---|---|
//! | `Ok` | applied, or harmlessly redundant |
//! | `Error` | refused: the caller lost a race or asked for an incompatible step |
//! | `NoTransaction` | no record for the key |
//! | a lifecycle code | precondition not met, record left untouched; the code is the current status |
//!
//! [`XidPredicate`] is not a transition; it selects every key of one client
//! transaction.

use serde::{Deserialize, Serialize};
use txtable_core::{
    CacheXid, GlobalTransaction, Modification, StateTransform, Status, Transition, TxState, Xid,
};

/// Closed family of transitions over [`TxState`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxFunction {
    /// Begin: create an ACTIVE record, accepting an identical retry
    CreateState {
        /// Transaction identity
        global_transaction: GlobalTransaction,
        /// XA recovery owns the transaction once prepared
        recoverable: bool,
        /// Idle timeout in milliseconds
        timeout_ms: u64,
    },
    /// ACTIVE → PREPARING with the write-set
    MarkPreparing {
        /// Write-set to retain for replay
        modifications: Vec<Modification>,
    },
    /// PREPARING → PREPARED
    SetPrepared,
    /// `expected` → MARK_ROLLBACK, only if the status still equals `expected`
    ConditionalMarkAsRollback {
        /// Status observed by the caller
        expected: Status,
    },
    /// Record the client decision
    SetDecision {
        /// Commit (true) or rollback (false)
        commit: bool,
    },
    /// MARK_x → COMMITTED / ROLLED_BACK
    SetCompletedTransaction {
        /// Commit (true) or rollback (false)
        commit: bool,
    },
    /// Delete a COMMITTED / ROLLED_BACK record, leaving any other untouched
    RemoveCompleted,
}

impl TxFunction {
    /// Begin function
    pub fn create_state(
        global_transaction: GlobalTransaction,
        recoverable: bool,
        timeout_ms: u64,
    ) -> Self {
        TxFunction::CreateState {
            global_transaction,
            recoverable,
            timeout_ms,
        }
    }

    /// Prepare-start function
    pub fn mark_preparing(modifications: Vec<Modification>) -> Self {
        TxFunction::MarkPreparing { modifications }
    }

    /// Timeout-driven rollback guarded by the observed status
    pub fn conditional_mark_as_rollback(expected: Status) -> Self {
        TxFunction::ConditionalMarkAsRollback { expected }
    }

    /// Client decision
    pub fn set_decision(commit: bool) -> Self {
        TxFunction::SetDecision { commit }
    }

    /// Completion marker
    pub fn set_completed(commit: bool) -> Self {
        TxFunction::SetCompletedTransaction { commit }
    }

    /// Removal of a terminal record
    pub fn remove_completed() -> Self {
        TxFunction::RemoveCompleted
    }

    /// Compute the transition for `current` at time `now`
    pub fn apply(&self, current: Option<&TxState>, now: u64) -> Transition {
        match self {
            TxFunction::CreateState {
                global_transaction,
                recoverable,
                timeout_ms,
            } => create_state(current, global_transaction, *recoverable, *timeout_ms, now),
            TxFunction::MarkPreparing { modifications } => {
                mark_preparing(current, modifications, now)
            }
            TxFunction::SetPrepared => set_prepared(current, now),
            TxFunction::ConditionalMarkAsRollback { expected } => {
                conditional_mark_as_rollback(current, *expected, now)
            }
            TxFunction::SetDecision { commit } => set_decision(current, *commit, now),
            TxFunction::SetCompletedTransaction { commit } => {
                set_completed(current, *commit, now)
            }
            TxFunction::RemoveCompleted => remove_completed(current),
        }
    }
}

impl StateTransform for TxFunction {
    fn transform(&self, current: Option<&TxState>, now: u64) -> Transition {
        self.apply(current, now)
    }
}

fn create_state(
    current: Option<&TxState>,
    global_transaction: &GlobalTransaction,
    recoverable: bool,
    timeout_ms: u64,
    now: u64,
) -> Transition {
    match current {
        None => Transition::replace(
            TxState::new(global_transaction.clone(), recoverable, timeout_ms, now),
            Status::Ok,
        ),
        // Retried begin from the same client transaction
        Some(state) if state.is_same_as(global_transaction, recoverable, timeout_ms) => {
            Transition::unchanged(Status::Ok)
        }
        Some(_) => Transition::unchanged(Status::Error),
    }
}

fn mark_preparing(
    current: Option<&TxState>,
    modifications: &[Modification],
    now: u64,
) -> Transition {
    match current {
        None => Transition::unchanged(Status::NoTransaction),
        Some(state) if state.status() == Status::Active => Transition::replace(
            state.mark_preparing(modifications.to_vec(), now),
            Status::Ok,
        ),
        Some(state) => Transition::unchanged(state.status()),
    }
}

fn set_prepared(current: Option<&TxState>, now: u64) -> Transition {
    match current {
        None => Transition::unchanged(Status::NoTransaction),
        Some(state) if state.status() == Status::Preparing => {
            Transition::replace(state.set_status(Status::Prepared, false, now), Status::Ok)
        }
        Some(state) => Transition::unchanged(state.status()),
    }
}

fn conditional_mark_as_rollback(current: Option<&TxState>, expected: Status, now: u64) -> Transition {
    match current {
        None => Transition::unchanged(Status::NoTransaction),
        Some(state) if state.status() == expected && expected.is_rollback_on_timeout() => {
            Transition::replace(state.set_status(Status::MarkRollback, true, now), Status::Ok)
        }
        Some(state) => Transition::unchanged(state.status()),
    }
}

fn set_decision(current: Option<&TxState>, commit: bool, now: u64) -> Transition {
    let state = match current {
        None => return Transition::unchanged(Status::NoTransaction),
        Some(state) => state,
    };
    match (state.status(), commit) {
        // The write-set is kept: a decided commit may have to be replayed
        (Status::Prepared, true) => {
            Transition::replace(state.set_status(Status::MarkCommit, false, now), Status::Ok)
        }
        (Status::Prepared | Status::Active | Status::Preparing, false) => {
            Transition::replace(state.set_status(Status::MarkRollback, true, now), Status::Ok)
        }
        (Status::MarkCommit | Status::Committed, true)
        | (Status::MarkRollback | Status::RolledBack, false) => Transition::unchanged(Status::Ok),
        _ => Transition::unchanged(Status::Error),
    }
}

fn set_completed(current: Option<&TxState>, commit: bool, now: u64) -> Transition {
    let state = match current {
        None => return Transition::unchanged(Status::NoTransaction),
        Some(state) => state,
    };
    match (state.status(), commit) {
        (Status::MarkCommit, true) => {
            Transition::replace(state.set_status(Status::Committed, true, now), Status::Ok)
        }
        (Status::MarkRollback, false) => {
            Transition::replace(state.set_status(Status::RolledBack, true, now), Status::Ok)
        }
        (Status::Committed, true) | (Status::RolledBack, false) => {
            Transition::unchanged(Status::Ok)
        }
        _ => Transition::unchanged(Status::Error),
    }
}

fn remove_completed(current: Option<&TxState>) -> Transition {
    match current {
        None => Transition::unchanged(Status::NoTransaction),
        Some(state) if state.status().is_terminal() => Transition::remove(Status::Ok),
        Some(state) => Transition::unchanged(state.status()),
    }
}

/// Matches every [`CacheXid`] sharing one client xid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XidPredicate {
    xid: Xid,
}

impl XidPredicate {
    /// Predicate for `xid`
    pub fn new(xid: Xid) -> Self {
        Self { xid }
    }

    /// True if `key` belongs to the xid
    pub fn test(&self, key: &CacheXid) -> bool {
        key.same_xid_as(&self.xid)
    }
}
