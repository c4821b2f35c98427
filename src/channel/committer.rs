/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Reload, live commit, and activation of configuration transactions.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use crate::{
    bundle::{
        capabilities::{Capabilities, CapabilityError},
        Bundle,
    },
    events::*,
    networking::network::{ConnectionConfig, Network, OrdererUpdate},
    types::{
        config::Config,
        data_types::{BlockNumber, ChannelID, Sequence, TxID, TxPosition},
        envelope::{ConfigEnvelope, Envelope},
    },
    vault::{
        keys::{config_entry_key, CONFIGTX_NAMESPACE},
        pluggables::{QueryExecutor, RWSet, TxStatus, Vault, VaultError},
        DoneOnDrop,
    },
};

use super::{Channel, CommitError};

/// Serializes calls into bundle builders across every channel in the process.
static CONSTRUCTION_LOCK: Mutex<()> = Mutex::new(());

impl<V: Vault, N: Network> Channel<V, N> {
    /// Rebuild the active bundle by replaying, in sequence order, every configuration transaction
    /// persisted in the vault.
    ///
    /// Replay starts at sequence 1 and stops at the first sequence whose transaction is `Unknown`.
    /// An empty vault is not an error: the channel simply has no active bundle until its genesis
    /// configuration is committed.
    ///
    /// Must be called once, before any block is delivered to the channel. A failure means the
    /// channel's configuration could only be partially reconstructed, and the channel must not be
    /// used.
    pub fn reload_config_transactions(&self) -> Result<(), CommitError> {
        let orderer_update = {
            let _apply_guard = lock(&self.apply_lock);
            self.replay_config_transactions()?
        };
        if let Some(orderer_update) = orderer_update {
            self.propagate_orderers(orderer_update);
        }
        Ok(())
    }

    // Returns the ordering endpoints of the newest replayed bundle that has any.
    fn replay_config_transactions(&self) -> Result<Option<OrdererUpdate>, CommitError> {
        let query_executor = DoneOnDrop::new(
            self.vault
                .new_query_executor()
                .map_err(|err| CommitError::QueryExecutor { source: err })?,
        );

        let mut sequence = Sequence::first();
        let mut orderer_update = None;
        loop {
            let tx_id = TxID::config(sequence);
            let status = self
                .vault
                .status(&tx_id)
                .map_err(|err| CommitError::Status {
                    tx_id: tx_id.clone(),
                    source: err,
                })?;

            match status {
                TxStatus::Unknown => break,
                TxStatus::Valid => {
                    log::info!(
                        "[channel: {}] config tx is valid, reloading [{}]",
                        self.channel_id,
                        tx_id
                    );
                    let key = config_entry_key(sequence)
                        .map_err(|err| CommitError::CompositeKey { source: err })?;
                    let raw = query_executor
                        .get_state(CONFIGTX_NAMESPACE, &key)
                        .map_err(|err| CommitError::GetState {
                            tx_id: tx_id.clone(),
                            source: err,
                        })?
                        .ok_or_else(|| CommitError::MissingConfigEntry {
                            tx_id: tx_id.clone(),
                        })?;

                    let config_envelope = Envelope::decode(&raw)
                        .and_then(|envelope| envelope.config_envelope())
                        .map(|(_, config_envelope)| config_envelope)
                        .map_err(|err| CommitError::Decode {
                            tx_id: Some(tx_id.clone()),
                            source: err,
                        })?;
                    if config_envelope.config.sequence != sequence {
                        return Err(CommitError::SequenceMismatch {
                            tx_id,
                            found: config_envelope.config.sequence,
                        });
                    }

                    let bundle = self.build_bundle(config_envelope)?;
                    if let Some(update) = self.apply_bundle(bundle) {
                        orderer_update = Some(update);
                    }

                    sequence = sequence.next();
                }
                status => return Err(CommitError::UnexpectedStatus { tx_id, status }),
            }
        }

        let configs_loaded = sequence.int() - 1;
        if configs_loaded == 0 {
            log::info!(
                "[channel: {}] no config transactions found, waiting for genesis",
                self.channel_id
            );
        } else {
            log::info!(
                "[channel: {}] reloaded {} config transactions",
                self.channel_id,
                configs_loaded
            );
        }

        Event::publish(
            &self.event_publisher,
            Event::ReloadConfig(ReloadConfigEvent {
                timestamp: SystemTime::now(),
                channel_id: self.channel_id.clone(),
                configs_loaded,
                active_sequence: self.resources().map(|bundle| bundle.sequence()),
            }),
        );

        Ok(orderer_update)
    }

    /// Validate, persist, and activate a configuration transaction delivered in block
    /// `block_number`.
    ///
    /// `raw` is the exact byte string that is persisted, and `envelope` its decoded form. The
    /// transaction is identified by the sequence embedded in the configuration it carries, not by
    /// `block_number`.
    ///
    /// ## Outcomes
    ///
    /// - The transaction is already `Valid` in the vault: returns `Ok` without persisting or
    ///   activating anything.
    /// - The configuration fails decoding, sequencing, validation, or capability checks: returns
    ///   an error, and nothing is persisted.
    /// - Persisting fails: the pending writes are discarded and the persistence error is returned.
    /// - Otherwise the configuration is persisted and only then activated. Its ordering endpoints,
    ///   if any, are forwarded to the network provider after the apply lock is released.
    ///
    /// In every error case, the active bundle is left exactly as it was.
    pub fn commit_config(
        &self,
        block_number: BlockNumber,
        raw: &[u8],
        envelope: Option<&Envelope>,
    ) -> Result<(), CommitError> {
        let orderer_update = {
            let _apply_guard = lock(&self.apply_lock);
            self.commit_and_apply(block_number, raw, envelope)?
        };
        if let Some(orderer_update) = orderer_update {
            self.propagate_orderers(orderer_update);
        }
        Ok(())
    }

    fn commit_and_apply(
        &self,
        block_number: BlockNumber,
        raw: &[u8],
        envelope: Option<&Envelope>,
    ) -> Result<Option<OrdererUpdate>, CommitError> {
        let envelope = envelope.ok_or(CommitError::NilEnvelope)?;
        let (header, config_envelope) = envelope
            .config_envelope()
            .map_err(|err| CommitError::Decode {
                tx_id: None,
                source: err,
            })?;
        if header.channel_id != self.channel_id {
            return Err(CommitError::WrongChannel {
                expected: self.channel_id.clone(),
                found: header.channel_id,
            });
        }

        let sequence = config_envelope.config.sequence;
        let tx_id = TxID::config(sequence);
        log::debug!(
            "[channel: {}] committing config tx [{}] in block [{}]",
            self.channel_id,
            tx_id,
            block_number
        );

        let status = self
            .vault
            .status(&tx_id)
            .map_err(|err| CommitError::Status {
                tx_id: tx_id.clone(),
                source: err,
            })?;
        match status {
            TxStatus::Valid => {
                log::debug!(
                    "[channel: {}] config tx [{}] already committed, skipping",
                    self.channel_id,
                    tx_id
                );
                return Ok(None);
            }
            TxStatus::Unknown => (),
            status => return Err(CommitError::UnexpectedStatus { tx_id, status }),
        }

        let expected = self
            .resources()
            .map_or(Sequence::first(), |bundle| bundle.sequence().next());
        if sequence != expected {
            return Err(CommitError::UnexpectedSequence {
                expected,
                found: sequence,
            });
        }

        let bundle = self.build_bundle(config_envelope)?;

        self.persist(&tx_id, block_number, raw, sequence)?;
        Event::publish(
            &self.event_publisher,
            Event::CommitConfig(CommitConfigEvent {
                timestamp: SystemTime::now(),
                channel_id: self.channel_id.clone(),
                block: block_number,
                tx_id,
                sequence,
            }),
        );

        Ok(self.apply_bundle(bundle))
    }

    // The genesis configuration is trusted as delivered. Every later configuration must be accepted
    // by the validator of the active bundle, and must only require capabilities this node has.
    fn build_bundle(&self, config_envelope: ConfigEnvelope) -> Result<Arc<Bundle>, CommitError> {
        let sequence = config_envelope.config.sequence;

        let current = match self.resources() {
            None => {
                let bundle = self.construct(&self.channel_id, config_envelope.config)?;
                return Ok(Arc::new(bundle));
            }
            Some(current) => current,
        };

        let validator = current.configtx_validator();
        validator
            .validate(&config_envelope)
            .map_err(|err| CommitError::Validation {
                sequence,
                source: err,
            })?;

        let bundle = self.construct(validator.channel_id(), config_envelope.config)?;
        bundle.log_sanity_checks();
        capabilities_supported(&bundle)?;

        Ok(Arc::new(bundle))
    }

    fn construct(&self, channel_id: &ChannelID, config: Config) -> Result<Bundle, CommitError> {
        let sequence = config.sequence;
        let _construction_guard = lock(&CONSTRUCTION_LOCK);
        self.bundle_builder
            .build(channel_id, config)
            .map_err(|err| CommitError::Bundle {
                sequence,
                source: err,
            })
    }

    // Writes `raw` under the configuration entry key of `sequence` and commits it as `tx_id`. If
    // anything fails after the read-write set was opened, its pending writes are discarded.
    fn persist(
        &self,
        tx_id: &TxID,
        block_number: BlockNumber,
        raw: &[u8],
        sequence: Sequence,
    ) -> Result<(), CommitError> {
        let key =
            config_entry_key(sequence).map_err(|err| CommitError::CompositeKey { source: err })?;

        let rwset = self
            .vault
            .new_rwset(tx_id)
            .map_err(|err| CommitError::Persist {
                tx_id: tx_id.clone(),
                source: err,
            })?;

        let write_and_commit = || -> Result<(), VaultError> {
            {
                let mut rwset = DoneOnDrop::new(rwset);
                rwset.set_state(CONFIGTX_NAMESPACE, &key, raw)?;
            }
            self.vault
                .commit_tx(tx_id, block_number, TxPosition::new(0), None)
        };

        if let Err(err) = write_and_commit() {
            if let Err(discard_err) = self.vault.discard_tx(tx_id) {
                log::error!(
                    "[channel: {}] failed discarding rwset for tx [{}]: {}",
                    self.channel_id,
                    tx_id,
                    discard_err
                );
            }
            Event::publish(
                &self.event_publisher,
                Event::DiscardConfig(DiscardConfigEvent {
                    timestamp: SystemTime::now(),
                    channel_id: self.channel_id.clone(),
                    tx_id: tx_id.clone(),
                    reason: err.to_string(),
                }),
            );
            return Err(CommitError::Persist {
                tx_id: tx_id.clone(),
                source: err,
            });
        }

        Ok(())
    }

    // Swaps in `bundle` and returns its ordering endpoints, if it has any. The caller forwards them
    // with `propagate_orderers` once it no longer holds the apply lock.
    fn apply_bundle(&self, bundle: Arc<Bundle>) -> Option<OrdererUpdate> {
        *write(&self.resources) = Some(bundle.clone());

        log::debug!(
            "[channel: {}] applied config sequence {}",
            self.channel_id,
            bundle.sequence()
        );
        Event::publish(
            &self.event_publisher,
            Event::ApplyBundle(ApplyBundleEvent {
                timestamp: SystemTime::now(),
                channel_id: self.channel_id.clone(),
                sequence: bundle.sequence(),
                config_digest: bundle.config_digest(),
            }),
        );

        match ConnectionConfig::from_bundle(&bundle, self.orderer_connection_timeout) {
            None => {
                log::debug!(
                    "[channel: {}] no orderer configuration found in config sequence {}",
                    self.channel_id,
                    bundle.sequence()
                );
                None
            }
            Some(orderers) if orderers.is_empty() => {
                log::debug!(
                    "[channel: {}] no orderer endpoints found in config sequence {}",
                    self.channel_id,
                    bundle.sequence()
                );
                None
            }
            Some(orderers) => Some(OrdererUpdate {
                sequence: bundle.sequence(),
                orderers,
            }),
        }
    }

    // Must be called without holding the apply lock or the resources lock.
    fn propagate_orderers(&self, orderer_update: OrdererUpdate) {
        let sequence = orderer_update.sequence;
        let addresses: Vec<String> = orderer_update
            .orderers
            .iter()
            .map(|orderer| orderer.address.clone())
            .collect();

        if !self.orderer_update_handle.update_orderers(orderer_update) {
            log::debug!(
                "[channel: {}] orderers of config sequence {} superseded, not forwarded",
                self.channel_id,
                sequence
            );
            return;
        }

        log::debug!(
            "[channel: {}] setting orderers to [{}]",
            self.channel_id,
            addresses.join(", ")
        );
        Event::publish(
            &self.event_publisher,
            Event::UpdateOrderers(UpdateOrderersEvent {
                timestamp: SystemTime::now(),
                channel_id: self.channel_id.clone(),
                addresses,
            }),
        );
    }
}

/// Check that `bundle` has an application section, and that this node supports every capability
/// its application and channel sections require.
fn capabilities_supported(bundle: &Bundle) -> Result<(), CommitError> {
    let sequence = bundle.sequence();
    let application = bundle
        .application_config()
        .ok_or(CommitError::MissingApplicationConfig { sequence })?;

    let incompatible = |err: CapabilityError| CommitError::Incompatible {
        sequence,
        source: err,
    };
    application.capabilities().supported().map_err(incompatible)?;
    bundle
        .channel_config()
        .capabilities()
        .supported()
        .map_err(incompatible)?;

    Ok(())
}

// A poisoned lock only means another thread panicked while holding it. None of the critical
// sections in this module can leave the guarded value half-updated.
pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(super) fn read<T>(rw_lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rw_lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(rw_lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rw_lock.write().unwrap_or_else(PoisonError::into_inner)
}
