/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Byte-prefixes that specify where each vault variable is stored in the user-provided key-value
//! store.
//!
//! |Variable|Type|Description|
//! |---|---|---|
//! |Tx Status|[`TxID`](crate::types::data_types::TxID) -> [`TxStatus`](super::pluggables::TxStatus)|Status of every transaction the vault has recorded. Absent means `Unknown`.|
//! |Tx Commit Record|[`TxID`](crate::types::data_types::TxID) -> [`TxCommitRecord`](super::pluggables::TxCommitRecord)|Block number, position, and metadata a committed transaction was recorded with.|
//! |State|(`namespace`, `key`) -> `Vec<u8>`|Committed state written by transactions' read-write sets.|
//!
//! Mappings are stored at the concatenation of the variable's one-byte prefix and the key. State keys
//! are formed by [`state_key`], which length-prefixes the namespace so that no two
//! (`namespace`, `key`) pairs share a key.

pub const TX_STATUS: [u8; 1] = [0];
pub const TX_COMMIT_RECORD: [u8; 1] = [1];
pub const STATE: [u8; 1] = [2];

/// Concatenate two byteslices into one vector.
pub fn concat(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut res = Vec::with_capacity(a.len() + b.len());
    res.extend_from_slice(a);
    res.extend_from_slice(b);
    res
}

/// Form the key under which the committed value of `key` in `namespace` is stored.
pub fn state_key(namespace: &str, key: &str) -> Vec<u8> {
    let namespace_len = (namespace.len() as u32).to_le_bytes();
    let prefix = concat(&STATE, &namespace_len);
    concat(&concat(&prefix, namespace.as_bytes()), key.as_bytes())
}
