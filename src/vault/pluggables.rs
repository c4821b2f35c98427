/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for pluggable vault persistence.
//!
//! There are two levels of pluggability:
//! 1. [`Vault`], together with [`QueryExecutor`] and [`RWSet`], is the contract the
//!    [channel](crate::channel) consumes. Nodes that already run a versioned ledger state store can
//!    implement it directly.
//! 2. [`KVStore`], together with [`KVGet`] and [`WriteBatch`], is the much smaller contract of a
//!    key-value store with atomic, batched writes. Wrapping an implementation of it in a
//!    [`KVVault`](super::kv_vault::KVVault) yields a complete `Vault`.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::data_types::{BlockNumber, TxID, TxPosition};

use super::variables::{self, concat, state_key};

/* ↓↓↓ Vault contract ↓↓↓ */

/// A versioned, transactional ledger state store.
///
/// Implementations must be safe to share between the block-delivery thread and the threads that
/// bootstrap other channels.
pub trait Vault: Send + Sync + 'static {
    type QueryExecutor: QueryExecutor;
    type RWSet: RWSet;

    /// Get the validation status of the transaction identified by `tx_id`.
    fn status(&self, tx_id: &TxID) -> Result<TxStatus, VaultError>;

    /// Open a read handle over committed state.
    fn new_query_executor(&self) -> Result<Self::QueryExecutor, VaultError>;

    /// Open a write handle whose writes take effect when `tx_id` is committed with
    /// [`commit_tx`](Self::commit_tx).
    fn new_rwset(&self, tx_id: &TxID) -> Result<Self::RWSet, VaultError>;

    /// Atomically apply the writes recorded for `tx_id` and mark it [`TxStatus::Valid`].
    fn commit_tx(
        &self,
        tx_id: &TxID,
        block: BlockNumber,
        position: TxPosition,
        metadata: Option<&[u8]>,
    ) -> Result<(), VaultError>;

    /// Throw away the writes recorded for `tx_id` without applying them.
    fn discard_tx(&self, tx_id: &TxID) -> Result<(), VaultError>;
}

/// A handle that must be released once its owner is finished with it.
///
/// `done` must be safe to call more than once.
pub trait Done {
    fn done(&mut self);
}

/// Read handle over committed state.
pub trait QueryExecutor: Done {
    fn get_state(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, VaultError>;
}

/// Write handle scoped to a single transaction.
pub trait RWSet: Done {
    fn set_state(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), VaultError>;
}

/// Validation status of a transaction in the vault.
///
/// The configuration committer only ever expects `Valid` or `Unknown` for configuration
/// transactions. Every other status is treated as a sign of store corruption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum TxStatus {
    Valid,
    Invalid,
    Busy,
    Unknown,
    HasDependencies,
}

impl TxStatus {
    /// Numeric code of this status, as reported in logs and errors.
    pub const fn code(&self) -> u8 {
        match self {
            TxStatus::Valid => 1,
            TxStatus::Invalid => 2,
            TxStatus::Busy => 3,
            TxStatus::Unknown => 4,
            TxStatus::HasDependencies => 5,
        }
    }
}

impl Display for TxStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where in the ledger a committed transaction sits.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxCommitRecord {
    pub block: BlockNumber,
    pub position: TxPosition,
    pub metadata: Option<Vec<u8>>,
}

/// Errors that may be encountered when reading from or writing to a [`Vault`].
#[derive(Debug)]
pub enum VaultError {
    /// Error when trying to get a value from the vault's underlying [key value store][KVStore].
    KVGetError(KVGetError),

    /// Error when trying to serialize a value to be written into the underlying key value store.
    KVSetError(KVSetError),

    /// The transaction has already been committed.
    DuplicateTx { tx_id: TxID },

    /// A committed transaction cannot be discarded.
    DiscardCommittedTx { tx_id: TxID },

    /// The query executor was used after `done` was called on it.
    ExecutorReleased,

    /// The read-write set was written to after `done` was called on it.
    RWSetReleased { tx_id: TxID },

    /// Failure reported by a vault implementation that does not sit on top of a `KVStore`.
    Backend { reason: String },
}

impl From<KVGetError> for VaultError {
    fn from(value: KVGetError) -> Self {
        VaultError::KVGetError(value)
    }
}

impl From<KVSetError> for VaultError {
    fn from(value: KVSetError) -> Self {
        VaultError::KVSetError(value)
    }
}

impl Display for VaultError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::KVGetError(KVGetError::DeserializeValueError { key, source }) => {
                write!(f, "cannot deserialize {}: {}", key, source)
            }
            VaultError::KVSetError(KVSetError::SerializeValueError { key, source }) => {
                write!(f, "cannot serialize {}: {}", key, source)
            }
            VaultError::DuplicateTx { tx_id } => write!(f, "duplicate txid [{}]", tx_id),
            VaultError::DiscardCommittedTx { tx_id } => {
                write!(f, "cannot discard committed tx [{}]", tx_id)
            }
            VaultError::ExecutorReleased => write!(f, "query executor already released"),
            VaultError::RWSetReleased { tx_id } => {
                write!(f, "rws for tx [{}] already released", tx_id)
            }
            VaultError::Backend { reason } => write!(f, "vault backend failure: {}", reason),
        }
    }
}

impl std::error::Error for VaultError {}

/* ↓↓↓ Key-value store contract ↓↓↓ */

/// A key-value store with atomic, batched writes.
///
/// Clones of a `KVStore` must be handles to the same underlying store.
pub trait KVStore: KVGet + Clone + Send + Sync + 'static {
    type WriteBatch: WriteBatch;

    fn write(&mut self, wb: Self::WriteBatch);
}

pub trait KVGet {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /* ↓↓↓ Transaction Status ↓↓↓ */

    /// Get the status of `tx_id`. Transactions that have never been recorded are `Unknown`.
    fn tx_status(&self, tx_id: &TxID) -> Result<TxStatus, KVGetError> {
        match self.get(&concat(&variables::TX_STATUS, tx_id.bytes())) {
            None => Ok(TxStatus::Unknown),
            Some(bytes) => TxStatus::try_from_slice(&bytes).map_err(|err| {
                KVGetError::DeserializeValueError {
                    key: Key::TxStatus {
                        tx_id: tx_id.clone(),
                    },
                    source: err,
                }
            }),
        }
    }

    /* ↓↓↓ Transaction Commit Record ↓↓↓ */

    fn tx_commit_record(&self, tx_id: &TxID) -> Result<Option<TxCommitRecord>, KVGetError> {
        if let Some(bytes) = self.get(&concat(&variables::TX_COMMIT_RECORD, tx_id.bytes())) {
            Ok(Some(TxCommitRecord::try_from_slice(&bytes).map_err(
                |err| KVGetError::DeserializeValueError {
                    key: Key::TxCommitRecord {
                        tx_id: tx_id.clone(),
                    },
                    source: err,
                },
            )?))
        } else {
            Ok(None)
        }
    }

    /* ↓↓↓ Committed State ↓↓↓ */

    fn state(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.get(&state_key(namespace, key))
    }
}

pub trait WriteBatch {
    fn new() -> Self;
    fn set(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}

/// Error when trying to read a value corresponding to a given key from the [key value store][KVStore].
#[derive(Debug)]
pub enum KVGetError {
    DeserializeValueError { key: Key, source: std::io::Error },
}

/// Error when a value cannot be serialized, and hence cannot be written to a [`WriteBatch`].
#[derive(Debug)]
pub enum KVSetError {
    SerializeValueError { key: Key, source: std::io::Error },
}

#[derive(Debug)]
pub enum Key {
    TxStatus { tx_id: TxID },
    TxCommitRecord { tx_id: TxID },
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Key::TxStatus { tx_id } => write!(f, "Tx Status for tx {}", tx_id),
            Key::TxCommitRecord { tx_id } => write!(f, "Tx Commit Record for tx {}", tx_id),
        }
    }
}
