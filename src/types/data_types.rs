/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Add,
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Prefix of the transaction ID under which a configuration transaction is recorded in the vault.
pub const CONFIG_TX_PREFIX: &str = "config-";

/// Name that uniquely identifies a channel.
///
/// Every configuration transaction delivered to a channel carries the channel's ID in its
/// [`ChannelHeader`](crate::types::envelope::ChannelHeader), and every bundle built for the channel
/// remembers it.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct ChannelID(String);

impl ChannelID {
    /// Create a new `ChannelID` from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the channel name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChannelID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for ChannelID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Position of a configuration in the channel-global, append-only log of configurations.
///
/// The first configuration of a channel has sequence 1, and every subsequent configuration increases
/// the sequence by exactly 1.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct Sequence(u64);

impl Sequence {
    /// Sequence of the first configuration of any channel.
    pub const fn first() -> Self {
        Self(1)
    }

    /// Create a new `Sequence` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `Sequence`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Get the sequence that comes right after this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for Sequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for Sequence {
    type Output = Sequence;
    fn add(self, rhs: u64) -> Self::Output {
        Sequence(self.0 + rhs)
    }
}

/// Number of the ledger block that delivered a transaction.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
pub struct BlockNumber(u64);

impl BlockNumber {
    /// Create a new `BlockNumber` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for BlockNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Index of a transaction inside the block that delivered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct TxPosition(u64);

impl TxPosition {
    /// Create a new `TxPosition` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `TxPosition`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

/// Identifier of a ledger transaction in the vault.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize)]
pub struct TxID(String);

impl TxID {
    /// Create a new `TxID` wrapping `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID of the configuration transaction that carries the configuration with `sequence`,
    /// e.g., `config-7`.
    pub fn config(sequence: Sequence) -> Self {
        Self(format!("{}{}", CONFIG_TX_PREFIX, sequence.int()))
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the ID as bytes.
    pub fn bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Display for TxID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for TxID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// SHA256 hash of some bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner bytes of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoHash({})", self)
    }
}

/// Raw bytes of an Ed25519 verifying key.
///
/// Kept as plain bytes in wire types so that they can be Borsh-serialized; conversion into an
/// [`ed25519_dalek::VerifyingKey`] is fallible.
pub type VerifyingKeyBytes = [u8; 32];

/// Bytes of an Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Create a new `SignatureBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create a `SignatureBytes` of all zeros, used by unsigned envelopes.
    pub const fn empty() -> Self {
        Self([0; 64])
    }

    /// Get the inner bytes of this `SignatureBytes`.
    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes(")?;
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "..)")
    }
}
