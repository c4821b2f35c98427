/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Validation of proposed configurations against the currently active bundle.
//!
//! Every [`Bundle`](super::Bundle) carries the [`ConfigTxValidator`] that decides which configuration
//! may succeed it. Because the validator belongs to the bundle, the rules that govern an update are
//! always the rules of the configuration in force when the update arrives, not those of the update
//! itself.

use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
};

use crate::types::{
    crypto_primitives::{verify, VerifyingKey},
    data_types::{ChannelID, CryptoHash, Sequence, VerifyingKeyBytes},
    envelope::{ConfigEnvelope, DecodeError},
};

use super::BundleError;
use crate::types::config::AdminPolicy;

/// Decides whether a proposed configuration may succeed the configuration it belongs to.
pub trait ConfigTxValidator: Send + Sync {
    /// ID of the channel the validator's configuration belongs to.
    fn channel_id(&self) -> &ChannelID;

    /// Sequence of the configuration the validator belongs to.
    fn sequence(&self) -> Sequence;

    /// Check that `config_envelope` is a legitimate successor of this validator's configuration.
    fn validate(&self, config_envelope: &ConfigEnvelope) -> Result<(), ValidationError>;
}

/// The default [`ConfigTxValidator`]: accepts the next configuration in sequence if it is signed by
/// enough admins of the current configuration.
///
/// ## Rules
///
/// A proposed configuration is accepted when:
/// 1. Its sequence is exactly one greater than the current sequence.
/// 2. It carries a `last_update` whose [`ConfigUpdate`](crate::types::envelope::ConfigUpdate) names
///    this channel, the proposed sequence, and the digest of the proposed configuration.
/// 3. At least `threshold` distinct current admins produced a valid signature over the update bytes.
///    Signatures from non-admins, repeated signatures, and signatures that do not verify are not
///    counted.
pub struct PolicyValidator {
    channel_id: ChannelID,
    sequence: Sequence,
    threshold: u32,
    admins: HashSet<VerifyingKeyBytes>,
}

impl PolicyValidator {
    /// Create the validator of the configuration at `sequence` whose admin policy is `policy`.
    pub fn new(
        channel_id: ChannelID,
        sequence: Sequence,
        policy: &AdminPolicy,
    ) -> Result<PolicyValidator, BundleError> {
        for admin in &policy.admins {
            VerifyingKey::from_bytes(admin)
                .map_err(|err| BundleError::InvalidAdminKey { source: err })?;
        }
        Ok(Self {
            channel_id,
            sequence,
            threshold: policy.threshold,
            admins: policy.admins.iter().copied().collect(),
        })
    }
}

impl ConfigTxValidator for PolicyValidator {
    fn channel_id(&self) -> &ChannelID {
        &self.channel_id
    }

    fn sequence(&self) -> Sequence {
        self.sequence
    }

    fn validate(&self, config_envelope: &ConfigEnvelope) -> Result<(), ValidationError> {
        let config = &config_envelope.config;
        if config.sequence != self.sequence.next() {
            return Err(ValidationError::SequenceMismatch {
                expected: self.sequence.next(),
                found: config.sequence,
            });
        }

        let update_envelope = config_envelope
            .last_update
            .as_ref()
            .ok_or(ValidationError::MissingConfigUpdate)?;
        let update = update_envelope
            .config_update()
            .map_err(|err| ValidationError::MalformedConfigUpdate { source: err })?;

        if update.channel_id != self.channel_id {
            return Err(ValidationError::ChannelMismatch {
                expected: self.channel_id.clone(),
                found: update.channel_id,
            });
        }
        if update.sequence != config.sequence {
            return Err(ValidationError::UpdateSequenceMismatch {
                config: config.sequence,
                update: update.sequence,
            });
        }
        let digest = config.digest();
        if update.config_digest != digest {
            return Err(ValidationError::DigestMismatch {
                expected: digest,
                found: update.config_digest,
            });
        }

        let signers: HashSet<VerifyingKeyBytes> = update_envelope
            .signatures
            .iter()
            .filter(|sig| self.admins.contains(&sig.signer))
            .filter(|sig| verify(&sig.signer, &update_envelope.config_update, &sig.signature))
            .map(|sig| sig.signer)
            .collect();

        if (signers.len() as u64) < self.threshold as u64 {
            return Err(ValidationError::PolicyNotSatisfied {
                threshold: self.threshold,
                valid_signatures: signers.len(),
            });
        }

        Ok(())
    }
}

/// Reasons a proposed configuration can be rejected by a [`ConfigTxValidator`].
#[derive(Debug)]
pub enum ValidationError {
    SequenceMismatch {
        expected: Sequence,
        found: Sequence,
    },
    MissingConfigUpdate,
    MalformedConfigUpdate {
        source: DecodeError,
    },
    ChannelMismatch {
        expected: ChannelID,
        found: ChannelID,
    },
    UpdateSequenceMismatch {
        config: Sequence,
        update: Sequence,
    },
    DigestMismatch {
        expected: CryptoHash,
        found: CryptoHash,
    },
    PolicyNotSatisfied {
        threshold: u32,
        valid_signatures: usize,
    },
    /// Rejection by a validator other than [`PolicyValidator`].
    Rejected {
        reason: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::SequenceMismatch { expected, found } => write!(
                f,
                "proposed config has sequence {}, expected {}",
                found, expected
            ),
            ValidationError::MissingConfigUpdate => write!(f, "config carries no signed update"),
            ValidationError::MalformedConfigUpdate { source } => write!(f, "{}", source),
            ValidationError::ChannelMismatch { expected, found } => write!(
                f,
                "config update is for channel {}, expected {}",
                found, expected
            ),
            ValidationError::UpdateSequenceMismatch { config, update } => write!(
                f,
                "config update has sequence {} but config has sequence {}",
                update, config
            ),
            ValidationError::DigestMismatch { expected, found } => write!(
                f,
                "config update commits to digest {}, config digest is {}",
                found, expected
            ),
            ValidationError::PolicyNotSatisfied {
                threshold,
                valid_signatures,
            } => write!(
                f,
                "admin policy requires {} signatures, got {} valid",
                threshold, valid_signatures
            ),
            ValidationError::Rejected { reason } => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for ValidationError {}
