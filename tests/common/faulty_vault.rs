//! A [`Vault`] that wraps a [`KVVault`] and fails or crashes on request.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use configtx_rs::{
    types::data_types::{BlockNumber, TxID, TxPosition},
    vault::{
        kv_vault::{KVQueryExecutor, KVRWSet, KVVault},
        pluggables::{TxCommitRecord, TxStatus, Vault, VaultError},
    },
};

use super::mem_db::MemDB;

pub(crate) struct FaultyVault {
    inner: KVVault<MemDB>,
    fail_commit: AtomicBool,
    fail_discard: AtomicBool,
    crash_after_commit: AtomicBool,
    commits: AtomicUsize,
    discards: AtomicUsize,
}

impl FaultyVault {
    pub(crate) fn new(kv_store: MemDB) -> FaultyVault {
        FaultyVault {
            inner: KVVault::new(kv_store),
            fail_commit: AtomicBool::new(false),
            fail_discard: AtomicBool::new(false),
            crash_after_commit: AtomicBool::new(false),
            commits: AtomicUsize::new(0),
            discards: AtomicUsize::new(0),
        }
    }

    /// Make every subsequent `commit_tx` fail without writing anything.
    pub(crate) fn fail_commit(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst)
    }

    /// Make every subsequent `discard_tx` fail without discarding anything.
    pub(crate) fn fail_discard(&self, fail: bool) {
        self.fail_discard.store(fail, Ordering::SeqCst)
    }

    /// Make the next successful `commit_tx` panic right after the commit is durable, as if the
    /// process died there.
    pub(crate) fn crash_after_commit(&self) {
        self.crash_after_commit.store(true, Ordering::SeqCst)
    }

    /// Number of successful `commit_tx` calls.
    pub(crate) fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of `discard_tx` calls, successful or not.
    pub(crate) fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }

    pub(crate) fn has_pending(&self, tx_id: &TxID) -> bool {
        self.inner.has_pending(tx_id)
    }

    pub(crate) fn committed_state(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.inner.committed_state(namespace, key)
    }

    pub(crate) fn tx_commit_record(&self, tx_id: &TxID) -> Option<TxCommitRecord> {
        self.inner.tx_commit_record(tx_id).unwrap()
    }
}

impl Vault for FaultyVault {
    type QueryExecutor = KVQueryExecutor<MemDB>;
    type RWSet = KVRWSet;

    fn status(&self, tx_id: &TxID) -> Result<TxStatus, VaultError> {
        self.inner.status(tx_id)
    }

    fn new_query_executor(&self) -> Result<Self::QueryExecutor, VaultError> {
        self.inner.new_query_executor()
    }

    fn new_rwset(&self, tx_id: &TxID) -> Result<Self::RWSet, VaultError> {
        self.inner.new_rwset(tx_id)
    }

    fn commit_tx(
        &self,
        tx_id: &TxID,
        block: BlockNumber,
        position: TxPosition,
        metadata: Option<&[u8]>,
    ) -> Result<(), VaultError> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(VaultError::Backend {
                reason: String::from("injected commit failure"),
            });
        }
        self.inner.commit_tx(tx_id, block, position, metadata)?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.crash_after_commit.swap(false, Ordering::SeqCst) {
            panic!("injected crash after committing {}", tx_id);
        }
        Ok(())
    }

    fn discard_tx(&self, tx_id: &TxID) -> Result<(), VaultError> {
        self.discards.fetch_add(1, Ordering::SeqCst);
        if self.fail_discard.load(Ordering::SeqCst) {
            return Err(VaultError::Backend {
                reason: String::from("injected discard failure"),
            });
        }
        self.inner.discard_tx(tx_id)
    }
}
