//! Transaction status codes
//!
//! Two families share one byte space:
//! - Control codes (`Ok`, `Error`, `NoTransaction`) are produced by transition
//!   functions as return values and are never persisted.
//! - Lifecycle codes are persisted in [`TxState`](crate::TxState).
//!
//! ## Lifecycle
//!
//! ```text
//! ACTIVE -> PREPARING -> PREPARED -> MARK_COMMIT   -> COMMITTED
//!                                 -> MARK_ROLLBACK -> ROLLED_BACK
//!
//! timeout: {ACTIVE, PREPARING, PREPARED} -> MARK_ROLLBACK
//! ```
//!
//! Every edge is one-directional. Once MARK_COMMIT is reached rollback is
//! unreachable and vice versa.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of one cache's participation in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    /// Transition applied (or was harmlessly redundant)
    Ok = 0x00,
    /// Transition refused, or the apply itself failed
    Error = 0x01,
    /// No record exists for the key
    NoTransaction = 0x02,
    /// Transaction is executing on its originator
    Active = 0x03,
    /// Write-set received, prepare in progress
    Preparing = 0x04,
    /// Prepare finished, waiting for the client decision
    Prepared = 0x05,
    /// Commit decided, not yet completed
    MarkCommit = 0x06,
    /// Commit completed
    Committed = 0x07,
    /// Rollback decided, not yet completed
    MarkRollback = 0x08,
    /// Rollback completed
    RolledBack = 0x09,
}

/// Dense reverse lookup, indexed by code
static VALUES: [Status; 10] = [
    Status::Ok,
    Status::Error,
    Status::NoTransaction,
    Status::Active,
    Status::Preparing,
    Status::Prepared,
    Status::MarkCommit,
    Status::Committed,
    Status::MarkRollback,
    Status::RolledBack,
];

impl Status {
    /// Wire code of this status
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Reverse lookup from a wire code
    ///
    /// Returns `None` for codes outside the table.
    #[inline]
    pub fn value_of(code: u8) -> Option<Status> {
        VALUES.get(code as usize).copied()
    }

    /// Control codes are return values only and never persisted
    pub fn is_control(self) -> bool {
        matches!(self, Status::Ok | Status::Error | Status::NoTransaction)
    }

    /// COMMITTED or ROLLED_BACK
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Committed | Status::RolledBack)
    }

    /// MARK_COMMIT or MARK_ROLLBACK
    pub fn is_decided(self) -> bool {
        matches!(self, Status::MarkCommit | Status::MarkRollback)
    }

    /// Statuses the timeout shortcut may move to MARK_ROLLBACK
    pub fn is_rollback_on_timeout(self) -> bool {
        matches!(self, Status::Active | Status::Preparing | Status::Prepared)
    }

    /// Lifecycle rank along the state machine, `None` for control codes
    ///
    /// Both decision branches share ranks so that ordering checks only
    /// compare progress, not direction.
    pub fn lifecycle_rank(self) -> Option<u8> {
        match self {
            Status::Active => Some(0),
            Status::Preparing => Some(1),
            Status::Prepared => Some(2),
            Status::MarkCommit | Status::MarkRollback => Some(3),
            Status::Committed | Status::RolledBack => Some(4),
            Status::Ok | Status::Error | Status::NoTransaction => None,
        }
    }

    /// True if the lifecycle state machine has an edge from `self` to `next`
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        matches!(
            (self, next),
            (Active, Preparing)
                | (Preparing, Prepared)
                | (Active | Preparing | Prepared, MarkRollback)
                | (Prepared, MarkCommit)
                | (MarkCommit, Committed)
                | (MarkRollback, RolledBack)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
            Status::NoTransaction => "NO_TRANSACTION",
            Status::Active => "ACTIVE",
            Status::Preparing => "PREPARING",
            Status::Prepared => "PREPARED",
            Status::MarkCommit => "MARK_COMMIT",
            Status::Committed => "COMMITTED",
            Status::MarkRollback => "MARK_ROLLBACK",
            Status::RolledBack => "ROLLED_BACK",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_value_of_every_code() {
        for status in VALUES {
            assert_eq!(Status::value_of(status.code()), Some(status));
        }
    }

    #[test]
    fn test_value_of_unknown_code() {
        assert_eq!(Status::value_of(10), None);
        assert_eq!(Status::value_of(0xff), None);
    }

    #[test]
    fn test_control_codes() {
        assert!(Status::Ok.is_control());
        assert!(Status::Error.is_control());
        assert!(Status::NoTransaction.is_control());
        assert!(!Status::Active.is_control());
        assert!(Status::Ok.lifecycle_rank().is_none());
    }

    #[test]
    fn test_decision_branches_are_exclusive() {
        assert!(!Status::MarkCommit.can_transition_to(Status::MarkRollback));
        assert!(!Status::MarkCommit.can_transition_to(Status::RolledBack));
        assert!(!Status::MarkRollback.can_transition_to(Status::MarkCommit));
        assert!(!Status::MarkRollback.can_transition_to(Status::Committed));
    }

    #[test]
    fn test_timeout_shortcut_edges() {
        for s in [Status::Active, Status::Preparing, Status::Prepared] {
            assert!(s.is_rollback_on_timeout());
            assert!(s.can_transition_to(Status::MarkRollback));
        }
        assert!(!Status::Active.can_transition_to(Status::MarkCommit));
        assert!(!Status::Preparing.can_transition_to(Status::MarkCommit));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Status::NoTransaction.to_string(), "NO_TRANSACTION");
        assert_eq!(Status::MarkRollback.to_string(), "MARK_ROLLBACK");
    }

    proptest! {
        #[test]
        fn prop_edges_never_go_backwards(a in 0u8..10, b in 0u8..10) {
            let from = Status::value_of(a).unwrap();
            let to = Status::value_of(b).unwrap();
            if from.can_transition_to(to) {
                prop_assert!(from.lifecycle_rank().unwrap() < to.lifecycle_rank().unwrap());
            }
        }

        #[test]
        fn prop_value_of_matches_table(code in any::<u8>()) {
            match Status::value_of(code) {
                Some(s) => prop_assert_eq!(s.code(), code),
                None => prop_assert!(code >= 10),
            }
        }
    }
}
