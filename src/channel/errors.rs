/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::fmt::{self, Display, Formatter};

use crate::{
    bundle::{capabilities::CapabilityError, validator::ValidationError, BundleError},
    types::{
        data_types::{ChannelID, Sequence, TxID},
        envelope::DecodeError,
    },
    vault::{
        keys::KeyError,
        pluggables::{TxStatus, VaultError},
    },
};

/// Errors returned by [`Channel::reload_config_transactions`](super::Channel::reload_config_transactions)
/// and [`Channel::commit_config`](super::Channel::commit_config).
///
/// Whenever one of these is returned, the active bundle of the channel is the one that was active
/// before the call (or, for reload, the last one reconstructed before the failure).
#[derive(Debug)]
pub enum CommitError {
    /// No decoded envelope was supplied with the raw transaction.
    NilEnvelope,

    Decode {
        tx_id: Option<TxID>,
        source: DecodeError,
    },

    /// The transaction is addressed to a different channel.
    WrongChannel {
        expected: ChannelID,
        found: ChannelID,
    },

    QueryExecutor {
        source: VaultError,
    },

    Status {
        tx_id: TxID,
        source: VaultError,
    },

    /// The vault reported a status other than `Valid` or `Unknown`.
    UnexpectedStatus {
        tx_id: TxID,
        status: TxStatus,
    },

    GetState {
        tx_id: TxID,
        source: VaultError,
    },

    /// The transaction is `Valid` but the vault holds no configuration entry for it.
    MissingConfigEntry {
        tx_id: TxID,
    },

    CompositeKey {
        source: KeyError,
    },

    /// A persisted entry carries a configuration with a different sequence than the one it is
    /// stored under.
    SequenceMismatch {
        tx_id: TxID,
        found: Sequence,
    },

    /// A delivered configuration does not directly follow the active one.
    UnexpectedSequence {
        expected: Sequence,
        found: Sequence,
    },

    Bundle {
        sequence: Sequence,
        source: BundleError,
    },

    Validation {
        sequence: Sequence,
        source: ValidationError,
    },

    MissingApplicationConfig {
        sequence: Sequence,
    },

    Incompatible {
        sequence: Sequence,
        source: CapabilityError,
    },

    /// Writing or committing the configuration entry failed. Pending writes were discarded.
    Persist {
        tx_id: TxID,
        source: VaultError,
    },
}

impl Display for CommitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::NilEnvelope => write!(f, "channel config found nil"),
            CommitError::Decode {
                tx_id: Some(tx_id),
                source,
            } => write!(f, "failed decoding config for tx [{}]: {}", tx_id, source),
            CommitError::Decode { tx_id: None, source } => {
                write!(f, "failed decoding config envelope: {}", source)
            }
            CommitError::WrongChannel { expected, found } => write!(
                f,
                "config transaction for channel [{}] delivered to channel [{}]",
                found, expected
            ),
            CommitError::QueryExecutor { source } => {
                write!(f, "failed getting query executor: {}", source)
            }
            CommitError::Status { tx_id, source } => {
                write!(f, "failed getting tx's status [{}]: {}", tx_id, source)
            }
            CommitError::UnexpectedStatus { tx_id, status } => write!(
                f,
                "invalid configtx's [{}] status [{}]",
                tx_id, status
            ),
            CommitError::GetState { tx_id, source } => {
                write!(f, "failed loading config for tx [{}]: {}", tx_id, source)
            }
            CommitError::MissingConfigEntry { tx_id } => {
                write!(f, "tx [{}] is valid but its config entry is missing", tx_id)
            }
            CommitError::CompositeKey { source } => {
                write!(f, "cannot create configtx rws key: {}", source)
            }
            CommitError::SequenceMismatch { tx_id, found } => write!(
                f,
                "config stored under [{}] has sequence {}",
                tx_id, found
            ),
            CommitError::UnexpectedSequence { expected, found } => write!(
                f,
                "config sequence {} does not follow the active config, expected {}",
                found, expected
            ),
            CommitError::Bundle { sequence, source } => write!(
                f,
                "cannot build bundle for config sequence {}: {}",
                sequence, source
            ),
            CommitError::Validation { sequence, source } => write!(
                f,
                "config sequence {} failed validation: {}",
                sequence, source
            ),
            CommitError::MissingApplicationConfig { sequence } => write!(
                f,
                "config sequence {} has no application config",
                sequence
            ),
            CommitError::Incompatible { sequence, source } => write!(
                f,
                "config sequence {} is not supported: {}",
                sequence, source
            ),
            CommitError::Persist { tx_id, source } => {
                write!(f, "failed committing configtx [{}] to the vault: {}", tx_id, source)
            }
        }
    }
}

impl std::error::Error for CommitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommitError::Decode { source, .. } => Some(source),
            CommitError::QueryExecutor { source }
            | CommitError::Status { source, .. }
            | CommitError::GetState { source, .. }
            | CommitError::Persist { source, .. } => Some(source),
            CommitError::CompositeKey { source } => Some(source),
            CommitError::Bundle { source, .. } => Some(source),
            CommitError::Validation { source, .. } => Some(source),
            CommitError::Incompatible { source, .. } => Some(source),
            _ => None,
        }
    }
}
