/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The configuration-commitment engine of a permissioned ledger channel.
//!
//! Configuration transactions are ordered, signed changes to a channel's configuration: its
//! admin policy, member organizations, required capabilities, and ordering endpoints. A node
//! following the channel must apply them exactly once, in order, and must survive restarts
//! without losing or re-applying any of them.
//!
//! ## Components
//!
//! - [`vault`]: the versioned state store that configuration transactions are persisted into.
//! - [`bundle`]: immutable, validated views of a configuration, and the rules that decide which
//!   configuration may succeed another.
//! - [`channel`]: the committer, which reloads persisted configuration on startup, commits newly
//!   delivered configuration transactions, and swaps in the resulting bundles.
//! - [`networking`]: the seam through which ordering endpoints reach the node's connection layer.
//! - [`events`] and [`logging`]: what the committer reports, and how it is logged by default.

pub mod bundle;

pub mod channel;

pub(crate) mod event_bus;

pub mod events;

pub mod logging;

pub mod networking;

pub mod types;

pub mod vault;
