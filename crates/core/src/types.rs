//! Identity types for the transaction table
//!
//! This module defines the keys and identities every other layer builds on:
//! - Address: one cluster member
//! - Xid: the client-supplied XA transaction identifier
//! - GlobalTransaction: the server-side identity, embedding the originator
//! - CacheXid: composite key of one TxState record
//! - Modification: one entry of a prepared write-set

use crate::error::{TxError, TxResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length of the global transaction id component (XA `MAXGTRIDSIZE`)
pub const MAX_GTRID_SIZE: usize = 64;

/// Maximum length of the branch qualifier component (XA `MAXBQUALSIZE`)
pub const MAX_BQUAL_SIZE: usize = 64;

/// Identity of a cluster member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(Uuid);

impl Address {
    /// Create a new random address
    pub fn random() -> Self {
        Address(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Address(uuid)
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell members apart in logs
        let simple = self.0.simple().to_string();
        write!(f, "node-{}", &simple[..8])
    }
}

/// XA transaction identifier supplied by the client
///
/// Shared across every cache the client transaction touches. Two xids are
/// equal when all three components are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Create an xid, validating the XA component limits
    ///
    /// # Errors
    ///
    /// Returns `TxError::InvalidXid` if either component is longer than 64 bytes.
    pub fn new(
        format_id: i32,
        global_transaction_id: impl Into<Vec<u8>>,
        branch_qualifier: impl Into<Vec<u8>>,
    ) -> TxResult<Self> {
        let global_transaction_id = global_transaction_id.into();
        let branch_qualifier = branch_qualifier.into();
        if global_transaction_id.len() > MAX_GTRID_SIZE {
            return Err(TxError::InvalidXid(format!(
                "global transaction id is {} bytes, limit is {}",
                global_transaction_id.len(),
                MAX_GTRID_SIZE
            )));
        }
        if branch_qualifier.len() > MAX_BQUAL_SIZE {
            return Err(TxError::InvalidXid(format!(
                "branch qualifier is {} bytes, limit is {}",
                branch_qualifier.len(),
                MAX_BQUAL_SIZE
            )));
        }
        Ok(Xid {
            format_id,
            global_transaction_id,
            branch_qualifier,
        })
    }

    /// Format identifier
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Global transaction id bytes
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// Branch qualifier bytes
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }
}

impl fmt::Display for Xid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.format_id)?;
        for b in &self.global_transaction_id {
            write!(f, "{:02x}", b)?;
        }
        f.write_str(":")?;
        for b in &self.branch_qualifier {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Server-side identity of a client transaction
///
/// Embeds the originator, the member that accepted the client connection and
/// replays the transaction. The id is unique per originator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalTransaction {
    id: u64,
    originator: Address,
    xid: Xid,
}

impl GlobalTransaction {
    /// Create a global transaction
    pub fn new(id: u64, originator: Address, xid: Xid) -> Self {
        Self { id, originator, xid }
    }

    /// Originator-local sequence number
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Member that accepted the client connection
    pub fn originator(&self) -> Address {
        self.originator
    }

    /// Client xid
    pub fn xid(&self) -> &Xid {
        &self.xid
    }
}

impl fmt::Display for GlobalTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalTx:{}:{}", self.originator, self.id)
    }
}

/// Composite key of one TxState record: (cache name, xid)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheXid {
    cache_name: String,
    xid: Xid,
}

impl CacheXid {
    /// Create a key
    pub fn new(cache_name: impl Into<String>, xid: Xid) -> Self {
        Self {
            cache_name: cache_name.into(),
            xid,
        }
    }

    /// Name of the participating cache
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Client xid
    pub fn xid(&self) -> &Xid {
        &self.xid
    }

    /// True if this key belongs to the given client transaction
    pub fn same_xid_as(&self, xid: &Xid) -> bool {
        self.xid == *xid
    }
}

impl fmt::Display for CacheXid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.cache_name, self.xid)
    }
}

/// One entry of a prepared write-set
///
/// Replayed as a one-phase prepare when a decided commit has to be driven
/// on members that never saw the original prepare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modification {
    /// Store `value` under `key`
    Put {
        /// Entry key
        key: Vec<u8>,
        /// Entry value
        value: Vec<u8>,
    },
    /// Remove `key`
    Remove {
        /// Entry key
        key: Vec<u8>,
    },
}

impl Modification {
    /// Key touched by this modification
    pub fn key(&self) -> &[u8] {
        match self {
            Modification::Put { key, .. } | Modification::Remove { key } => key,
        }
    }
}
