/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A complete [`Vault`] implemented on top of any [`KVStore`].
//!
//! # Transaction lifecycle
//!
//! 1. [`new_rwset`](Vault::new_rwset) opens a [`KVRWSet`] for a transaction. Writes made through it
//!    are buffered in the handle.
//! 2. [`done`](Done::done) on the handle (or dropping it) hands the buffered writes to the vault's
//!    table of pending transactions. Nothing is visible to readers yet.
//! 3. [`commit_tx`](Vault::commit_tx) applies the pending writes, the `Valid` status, and the commit
//!    record in a single [`WriteBatch`], so either all of them become visible or none do.
//! 4. Alternatively, [`discard_tx`](Vault::discard_tx) throws the pending writes away. The status of
//!    the transaction stays `Unknown`, so the same transaction can be retried later.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use borsh::BorshSerialize;

use crate::types::data_types::{BlockNumber, TxID, TxPosition};

use super::{
    pluggables::{
        Done, KVGet, KVSetError, KVStore, Key, QueryExecutor, RWSet, TxCommitRecord, TxStatus,
        Vault, VaultError, WriteBatch,
    },
    variables::{self, concat, state_key},
};

/// Writes of a single transaction, keyed by (`namespace`, `key`).
type PendingWrites = BTreeMap<(String, String), Vec<u8>>;

type PendingTable = Arc<Mutex<HashMap<TxID, PendingWrites>>>;

/// A [`Vault`] that stores transaction statuses, commit records, and committed state in a
/// [`KVStore`].
pub struct KVVault<K: KVStore> {
    kv_store: Mutex<K>,
    pending: PendingTable,
}

impl<K: KVStore> KVVault<K> {
    /// Create a new `KVVault` on top of `kv_store`.
    pub fn new(kv_store: K) -> Self {
        Self {
            kv_store: Mutex::new(kv_store),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the block, position, and metadata that `tx_id` was committed with, if it was committed.
    pub fn tx_commit_record(&self, tx_id: &TxID) -> Result<Option<TxCommitRecord>, VaultError> {
        Ok(lock(&self.kv_store).tx_commit_record(tx_id)?)
    }

    /// Check whether writes for `tx_id` have been handed to the vault but neither committed nor
    /// discarded.
    pub fn has_pending(&self, tx_id: &TxID) -> bool {
        lock(&self.pending).contains_key(tx_id)
    }

    /// Get the committed value of `key` in `namespace`.
    pub fn committed_state(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.kv_store).state(namespace, key)
    }
}

impl<K: KVStore> Vault for KVVault<K> {
    type QueryExecutor = KVQueryExecutor<K>;
    type RWSet = KVRWSet;

    fn status(&self, tx_id: &TxID) -> Result<TxStatus, VaultError> {
        Ok(lock(&self.kv_store).tx_status(tx_id)?)
    }

    fn new_query_executor(&self) -> Result<KVQueryExecutor<K>, VaultError> {
        Ok(KVQueryExecutor {
            kv_store: lock(&self.kv_store).clone(),
            released: false,
        })
    }

    fn new_rwset(&self, tx_id: &TxID) -> Result<KVRWSet, VaultError> {
        if lock(&self.kv_store).tx_status(tx_id)? == TxStatus::Valid {
            return Err(VaultError::DuplicateTx {
                tx_id: tx_id.clone(),
            });
        }

        // A new read-write set starts the transaction over.
        lock(&self.pending).remove(tx_id);

        Ok(KVRWSet {
            tx_id: tx_id.clone(),
            writes: PendingWrites::new(),
            pending: self.pending.clone(),
            released: false,
        })
    }

    fn commit_tx(
        &self,
        tx_id: &TxID,
        block: BlockNumber,
        position: TxPosition,
        metadata: Option<&[u8]>,
    ) -> Result<(), VaultError> {
        let mut kv_store = lock(&self.kv_store);
        if kv_store.tx_status(tx_id)? == TxStatus::Valid {
            return Err(VaultError::DuplicateTx {
                tx_id: tx_id.clone(),
            });
        }

        let record = TxCommitRecord {
            block,
            position,
            metadata: metadata.map(<[u8]>::to_vec),
        };
        let record_bytes =
            record
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::TxCommitRecord {
                        tx_id: tx_id.clone(),
                    },
                    source: err,
                })?;
        let status_bytes =
            TxStatus::Valid
                .try_to_vec()
                .map_err(|err| KVSetError::SerializeValueError {
                    key: Key::TxStatus {
                        tx_id: tx_id.clone(),
                    },
                    source: err,
                })?;

        let writes = lock(&self.pending).remove(tx_id).unwrap_or_default();

        let mut wb = K::WriteBatch::new();
        for ((namespace, key), value) in &writes {
            wb.set(&state_key(namespace, key), value);
        }
        wb.set(&concat(&variables::TX_COMMIT_RECORD, tx_id.bytes()), &record_bytes);
        wb.set(&concat(&variables::TX_STATUS, tx_id.bytes()), &status_bytes);

        kv_store.write(wb);

        Ok(())
    }

    fn discard_tx(&self, tx_id: &TxID) -> Result<(), VaultError> {
        if lock(&self.kv_store).tx_status(tx_id)? == TxStatus::Valid {
            return Err(VaultError::DiscardCommittedTx {
                tx_id: tx_id.clone(),
            });
        }
        lock(&self.pending).remove(tx_id);
        Ok(())
    }
}

/// Read handle over the committed state of a [`KVVault`].
pub struct KVQueryExecutor<K: KVStore> {
    kv_store: K,
    released: bool,
}

impl<K: KVStore> QueryExecutor for KVQueryExecutor<K> {
    fn get_state(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, VaultError> {
        if self.released {
            return Err(VaultError::ExecutorReleased);
        }
        Ok(self.kv_store.state(namespace, key))
    }
}

impl<K: KVStore> Done for KVQueryExecutor<K> {
    fn done(&mut self) {
        self.released = true;
    }
}

/// Write handle for a single transaction of a [`KVVault`].
pub struct KVRWSet {
    tx_id: TxID,
    writes: PendingWrites,
    pending: PendingTable,
    released: bool,
}

impl RWSet for KVRWSet {
    fn set_state(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), VaultError> {
        if self.released {
            return Err(VaultError::RWSetReleased {
                tx_id: self.tx_id.clone(),
            });
        }
        self.writes
            .insert((namespace.to_string(), key.to_string()), value.to_vec());
        Ok(())
    }
}

impl Done for KVRWSet {
    fn done(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let writes = std::mem::take(&mut self.writes);
        lock(&self.pending)
            .entry(self.tx_id.clone())
            .or_default()
            .extend(writes);
    }
}

impl Drop for KVRWSet {
    fn drop(&mut self) {
        self.done()
    }
}

// A poisoned lock only means another thread panicked mid-operation. Every critical section in this
// module leaves the guarded value consistent, so the value is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
