/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The seam through which a [`Channel`](crate::channel::Channel) turns configurations into bundles.
//!
//! Nodes that need a different bundle representation, or that want to observe bundle construction,
//! can pass their own [`BundleBuilder`] to
//! [`ChannelSpec`](crate::channel::ChannelSpec). Calls into the builder are serialized process-wide.

use crate::types::{config::Config, data_types::ChannelID};

use super::{Bundle, BundleError};

pub trait BundleBuilder: Send + Sync + 'static {
    /// Build the [`Bundle`] of `config` for `channel_id`.
    fn build(&self, channel_id: &ChannelID, config: Config) -> Result<Bundle, BundleError>;
}

/// Builds bundles with [`Bundle::new`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardBundleBuilder;

impl BundleBuilder for StandardBundleBuilder {
    fn build(&self, channel_id: &ChannelID, config: Config) -> Result<Bundle, BundleError> {
        Bundle::new(channel_id.clone(), config)
    }
}
