/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Wire types of configuration transactions.
//!
//! Configuration transactions travel inside the same generic, signed envelope as every other ledger
//! transaction:
//!
//! ```text
//! Envelope { payload, signature }
//!   └── Payload { header: ChannelHeader, data }
//!         └── ConfigEnvelope { config: Config, last_update }       (when header_type == Config)
//!               └── ConfigUpdateEnvelope { config_update, signatures }
//!                     └── ConfigUpdate { channel_id, sequence, config_digest }
//! ```
//!
//! Every layer is Borsh-encoded. Decoding is strict: a byte string with trailing bytes after a
//! complete value is rejected.

use std::fmt::{self, Display, Formatter};

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    config::Config,
    data_types::{ChannelID, CryptoHash, Sequence, SignatureBytes, TxID, VerifyingKeyBytes},
};

/// The outermost, signed transaction envelope.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Envelope {
    /// Borsh encoding of a [`Payload`].
    pub payload: Vec<u8>,
    /// Signature of the transaction creator over `payload`.
    pub signature: SignatureBytes,
}

impl Envelope {
    /// Decode an `Envelope` from its raw bytes.
    pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
        Envelope::try_from_slice(bytes).map_err(|err| DecodeError::Envelope { source: err })
    }

    /// Encode this `Envelope` into raw bytes.
    pub fn encode(&self) -> Vec<u8> {
        self.try_to_vec().unwrap()
    }

    /// Decode the `Payload` carried by this envelope.
    pub fn payload(&self) -> Result<Payload, DecodeError> {
        Payload::try_from_slice(&self.payload).map_err(|err| DecodeError::Payload { source: err })
    }

    /// Decode the payload of this envelope and then the `ConfigEnvelope` it carries.
    ///
    /// Fails with [`DecodeError::NotAConfigTransaction`] if the payload's header says the envelope
    /// carries anything other than a configuration transaction.
    pub fn config_envelope(&self) -> Result<(ChannelHeader, ConfigEnvelope), DecodeError> {
        let payload = self.payload()?;
        if payload.header.header_type != HeaderType::Config {
            return Err(DecodeError::NotAConfigTransaction {
                header_type: payload.header.header_type,
            });
        }
        let config_envelope = ConfigEnvelope::try_from_slice(&payload.data)
            .map_err(|err| DecodeError::ConfigEnvelope { source: err })?;
        Ok((payload.header, config_envelope))
    }
}

/// The signed content of an [`Envelope`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Payload {
    pub header: ChannelHeader,
    /// Type-specific body. For configuration transactions, the Borsh encoding of a
    /// [`ConfigEnvelope`].
    pub data: Vec<u8>,
}

/// Identifies which channel a transaction is addressed to and what kind of transaction it is.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChannelHeader {
    pub header_type: HeaderType,
    pub channel_id: ChannelID,
    pub tx_id: String,
    pub timestamp_secs: u64,
}

/// Kinds of transactions that can travel inside an [`Envelope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum HeaderType {
    Message,
    Config,
    ConfigUpdate,
    EndorserTransaction,
}

/// Body of a configuration transaction: the full new configuration, and the signed update that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigEnvelope {
    pub config: Config,
    /// The signed update that authorized `config`. Genesis configurations are not required to carry
    /// one.
    pub last_update: Option<ConfigUpdateEnvelope>,
}

impl ConfigEnvelope {
    /// Wrap this `ConfigEnvelope` into an unsigned configuration transaction addressed to `channel_id`.
    pub fn into_envelope(self, channel_id: &ChannelID, timestamp_secs: u64) -> Envelope {
        let header = ChannelHeader {
            header_type: HeaderType::Config,
            channel_id: channel_id.clone(),
            tx_id: TxID::config(self.config.sequence).to_string(),
            timestamp_secs,
        };
        let payload = Payload {
            header,
            data: self.try_to_vec().unwrap(),
        };
        Envelope {
            payload: payload.try_to_vec().unwrap(),
            signature: SignatureBytes::empty(),
        }
    }
}

/// A [`ConfigUpdate`] together with the admin signatures that authorize it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigUpdateEnvelope {
    /// Borsh encoding of a [`ConfigUpdate`]. These are the exact bytes that admins sign.
    pub config_update: Vec<u8>,
    pub signatures: Vec<ConfigSignature>,
}

impl ConfigUpdateEnvelope {
    /// Decode the `ConfigUpdate` that the signatures in this envelope sign over.
    pub fn config_update(&self) -> Result<ConfigUpdate, DecodeError> {
        ConfigUpdate::try_from_slice(&self.config_update)
            .map_err(|err| DecodeError::ConfigUpdate { source: err })
    }
}

/// Statement that the configuration of `channel_id` should become the configuration with digest
/// `config_digest` at `sequence`.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigUpdate {
    pub channel_id: ChannelID,
    pub sequence: Sequence,
    pub config_digest: CryptoHash,
}

/// Signature of a channel admin over a [`ConfigUpdate`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ConfigSignature {
    pub signer: VerifyingKeyBytes,
    pub signature: SignatureBytes,
}

/// Error when a layer of a configuration transaction cannot be decoded.
#[derive(Debug)]
pub enum DecodeError {
    Envelope { source: std::io::Error },
    Payload { source: std::io::Error },
    NotAConfigTransaction { header_type: HeaderType },
    ConfigEnvelope { source: std::io::Error },
    ConfigUpdate { source: std::io::Error },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Envelope { source } => write!(f, "cannot decode envelope: {}", source),
            DecodeError::Payload { source } => write!(f, "cannot decode payload: {}", source),
            DecodeError::NotAConfigTransaction { header_type } => {
                write!(f, "payload of type {:?} is not a config transaction", header_type)
            }
            DecodeError::ConfigEnvelope { source } => {
                write!(f, "cannot decode config envelope: {}", source)
            }
            DecodeError::ConfigUpdate { source } => {
                write!(f, "cannot decode config update: {}", source)
            }
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Envelope { source }
            | DecodeError::Payload { source }
            | DecodeError::ConfigEnvelope { source }
            | DecodeError::ConfigUpdate { source } => Some(source),
            DecodeError::NotAConfigTransaction { .. } => None,
        }
    }
}
