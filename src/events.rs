/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events a [`Channel`](crate::channel::Channel) emits, for event handling and
//! logging.
//!
//! An event for a given action indicates that the action has been completed.

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::types::data_types::{BlockNumber, ChannelID, CryptoHash, Sequence, TxID};

pub enum Event {
    // Events that change which configuration is active.
    ReloadConfig(ReloadConfigEvent),
    ApplyBundle(ApplyBundleEvent),
    UpdateOrderers(UpdateOrderersEvent),
    // Events that change persistent state.
    CommitConfig(CommitConfigEvent),
    DiscardConfig(DiscardConfigEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only goes away when the channel is dropped, at which point nobody is
            // listening for events anyway.
            let _ = event_publisher.send(event);
        }
    }
}

/// The persisted configuration history of a channel was replayed.
pub struct ReloadConfigEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    /// Number of configuration transactions found in the vault.
    pub configs_loaded: u64,
    /// Sequence of the configuration that is active after the reload, if any.
    pub active_sequence: Option<Sequence>,
}

/// A configuration transaction was durably committed to the vault.
pub struct CommitConfigEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub block: BlockNumber,
    pub tx_id: TxID,
    pub sequence: Sequence,
}

/// A bundle became the active configuration of a channel.
pub struct ApplyBundleEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub sequence: Sequence,
    pub config_digest: CryptoHash,
}

/// The network provider was told about a new set of ordering endpoints.
pub struct UpdateOrderersEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub addresses: Vec<String>,
}

/// The pending writes of a configuration transaction were thrown away because it failed to commit.
pub struct DiscardConfigEvent {
    pub timestamp: SystemTime,
    pub channel_id: ChannelID,
    pub tx_id: TxID,
    pub reason: String,
}
