//! Per-cache registry of locally executing transactions
//!
//! Maps a client xid to the handle of the transaction running on this member.
//! Not replicated and never visible to other members: an entry exists only on
//! the originator, from the moment the transaction starts executing until its
//! local commit or rollback finishes.
//!
//! A missing entry for a stored TxState is legal (the member restarted, or the
//! completion raced with a lookup) and means there is nothing to drive here.

use dashmap::DashMap;
use std::sync::Arc;
use txtable_core::{LocalTransaction, Xid};

/// Node-local xid → transaction handle table for one cache
pub struct PerCacheTxTable {
    cache_name: String,
    local_txs: DashMap<Xid, Arc<dyn LocalTransaction>>,
}

impl PerCacheTxTable {
    /// Create an empty table for `cache_name`
    pub fn new(cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            local_txs: DashMap::new(),
        }
    }

    /// Cache this table belongs to
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Register the handle for `xid`
    ///
    /// Returns the handle that was already registered, if any; the new one
    /// replaces it.
    pub fn create_local_tx(
        &self,
        xid: Xid,
        tx: Arc<dyn LocalTransaction>,
    ) -> Option<Arc<dyn LocalTransaction>> {
        self.local_txs.insert(xid, tx)
    }

    /// Handle for `xid`, if the transaction runs here
    pub fn get_local_tx(&self, xid: &Xid) -> Option<Arc<dyn LocalTransaction>> {
        self.local_txs.get(xid).map(|e| Arc::clone(e.value()))
    }

    /// Drop the handle for `xid` once local completion finished
    pub fn remove_local_tx(&self, xid: &Xid) -> Option<Arc<dyn LocalTransaction>> {
        self.local_txs.remove(xid).map(|(_, tx)| tx)
    }

    /// Number of registered handles
    pub fn len(&self) -> usize {
        self.local_txs.len()
    }

    /// True if no transaction runs here
    pub fn is_empty(&self) -> bool {
        self.local_txs.is_empty()
    }
}

impl std::fmt::Debug for PerCacheTxTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerCacheTxTable")
            .field("cache_name", &self.cache_name)
            .field("local_txs", &self.local_txs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txtable_core::{Address, GlobalTransaction, LocalTxError};

    struct NoopTx(GlobalTransaction);

    impl LocalTransaction for NoopTx {
        fn global_transaction(&self) -> &GlobalTransaction {
            &self.0
        }

        fn run_commit(&self, _rollback_only: bool) -> Result<(), LocalTxError> {
            Ok(())
        }
    }

    fn xid(name: &str) -> Xid {
        Xid::new(1, name.as_bytes().to_vec(), b"bq".to_vec()).unwrap()
    }

    fn handle(x: &Xid, id: u64) -> Arc<dyn LocalTransaction> {
        Arc::new(NoopTx(GlobalTransaction::new(id, Address::random(), x.clone())))
    }

    #[test]
    fn test_create_get_remove() {
        let table = PerCacheTxTable::new("cacheA");
        let x = xid("tx-1");
        assert!(table.is_empty());

        assert!(table.create_local_tx(x.clone(), handle(&x, 1)).is_none());
        assert_eq!(table.len(), 1);
        let found = table.get_local_tx(&x).unwrap();
        assert_eq!(found.global_transaction().id(), 1);

        assert!(table.remove_local_tx(&x).is_some());
        assert!(table.get_local_tx(&x).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_entry_is_none() {
        let table = PerCacheTxTable::new("cacheA");
        assert!(table.get_local_tx(&xid("never")).is_none());
        assert!(table.remove_local_tx(&xid("never")).is_none());
    }

    #[test]
    fn test_create_replaces_previous_handle() {
        let table = PerCacheTxTable::new("cacheA");
        let x = xid("tx-2");
        table.create_local_tx(x.clone(), handle(&x, 1));
        let previous = table.create_local_tx(x.clone(), handle(&x, 2)).unwrap();
        assert_eq!(previous.global_transaction().id(), 1);
        assert_eq!(table.get_local_tx(&x).unwrap().global_transaction().id(), 2);
        assert_eq!(table.cache_name(), "cacheA");
    }
}
