/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the channel's
//! [configuration](crate::channel::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least three values. The first three values
//! are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//! 3. The ID of the channel the event happened on.
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how an [ApplyBundle](crate::events::ApplyBundleEvent) is printed:
//!
//! ```text
//! ApplyBundle, 1701329264, mychannel, 3, fNGCJyk
//! ```
//!
//! In the snippet:
//! - The fourth value is the sequence of the configuration that became active.
//! - The fifth value is the first seven characters of the Base64 encoding of the configuration's
//!   digest.

use std::time::SystemTime;

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const RELOAD_CONFIG: &str = "ReloadConfig";
pub const COMMIT_CONFIG: &str = "CommitConfig";
pub const APPLY_BUNDLE: &str = "ApplyBundle";
pub const UPDATE_ORDERERS: &str = "UpdateOrderers";
pub const DISCARD_CONFIG: &str = "DiscardConfig";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for ReloadConfigEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reload_config_event: &ReloadConfigEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                RELOAD_CONFIG,
                secs_since_unix_epoch(reload_config_event.timestamp),
                reload_config_event.channel_id,
                reload_config_event.configs_loaded,
                reload_config_event
                    .active_sequence
                    .map_or_else(|| String::from("none"), |sequence| sequence.to_string())
            )
        };
        Box::new(logger)
    }
}

impl Logger for CommitConfigEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |commit_config_event: &CommitConfigEvent| {
            log::info!(
                "{}, {}, {}, {}, {}, {}",
                COMMIT_CONFIG,
                secs_since_unix_epoch(commit_config_event.timestamp),
                commit_config_event.channel_id,
                commit_config_event.block,
                commit_config_event.tx_id,
                commit_config_event.sequence
            )
        };
        Box::new(logger)
    }
}

impl Logger for ApplyBundleEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |apply_bundle_event: &ApplyBundleEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                APPLY_BUNDLE,
                secs_since_unix_epoch(apply_bundle_event.timestamp),
                apply_bundle_event.channel_id,
                apply_bundle_event.sequence,
                first_seven_base64_chars(&apply_bundle_event.config_digest.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpdateOrderersEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_orderers_event: &UpdateOrderersEvent| {
            log::info!(
                "{}, {}, {}, {}",
                UPDATE_ORDERERS,
                secs_since_unix_epoch(update_orderers_event.timestamp),
                update_orderers_event.channel_id,
                update_orderers_event.addresses.join(" ")
            )
        };
        Box::new(logger)
    }
}

impl Logger for DiscardConfigEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |discard_config_event: &DiscardConfigEvent| {
            log::info!(
                "{}, {}, {}, {}, {:?}",
                DISCARD_CONFIG,
                secs_since_unix_epoch(discard_config_event.timestamp),
                discard_config_event.channel_id,
                discard_config_event.tx_id,
                discard_config_event.reason
            )
        };
        Box::new(logger)
    }
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7 characters.
fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

// Events stamped before the Unix Epoch (a badly set clock) are logged as 0.
fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digests_are_abbreviated() {
        assert_eq!(first_seven_base64_chars(&[0u8; 32]), "AAAAAAA");
        assert_eq!(first_seven_base64_chars(&[0u8; 3]), "AAAA");
    }

    #[test]
    fn pre_epoch_timestamps_do_not_panic() {
        let before_epoch = SystemTime::UNIX_EPOCH - std::time::Duration::from_secs(5);
        assert_eq!(secs_since_unix_epoch(before_epoch), 0);
    }
}
