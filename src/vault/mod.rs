/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The versioned state store ("vault") that configuration transactions are persisted into.
//!
//! # Pluggable persistence
//!
//! - Configuration transactions are persisted with the same read-write set model as ordinary ledger
//!   transactions, in a namespace ([`keys::CONFIGTX_NAMESPACE`]) that ordinary transactions cannot
//!   address.
//! - The committer only depends on the abstract [`Vault`](pluggables::Vault) contract.
//! - Library users that do not already have a vault can implement the much smaller
//!   [`KVStore`](pluggables::KVStore) contract for their persistence mechanism and wrap it in a
//!   [`KVVault`](kv_vault::KVVault).

use std::ops::{Deref, DerefMut};

pub mod keys;

pub mod kv_vault;

pub mod pluggables;

pub mod variables;

use pluggables::Done;

/// Owns a vault handle and releases it with [`Done::done`] when dropped, on every exit path.
pub(crate) struct DoneOnDrop<T: Done>(T);

impl<T: Done> DoneOnDrop<T> {
    pub(crate) fn new(handle: T) -> Self {
        Self(handle)
    }
}

impl<T: Done> Deref for DoneOnDrop<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Done> DerefMut for DoneOnDrop<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Done> Drop for DoneOnDrop<T> {
    fn drop(&mut self) {
        self.0.done()
    }
}
