/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build and start a channel, and the type that keeps its active configuration.
//!
//! A [`Channel`] is the configuration committer of one ledger channel. It owns exactly one active
//! [`Bundle`] at a time, and changes it only by:
//! 1. [Reloading](Channel::reload_config_transactions) the configuration transactions persisted in
//!    its [vault](crate::vault) when the node starts, and
//! 2. [Committing](Channel::commit_config) configuration transactions delivered in blocks afterwards.
//!
//! ## Starting a channel
//!
//! Here is an example that demonstrates how to build and start a channel using the builder pattern:
//!
//! ```ignore
//! let channel =
//!     ChannelSpec::builder()
//!     .vault(vault)
//!     .network(network)
//!     .configuration(configuration)
//!     .on_apply_bundle(apply_bundle_handler)
//!     .build()
//!     .start();
//!
//! channel.reload_config_transactions()?;
//! ```
//!
//! ### Required setters
//!
//! - `.vault(...)`
//! - `.network(...)`
//! - `.configuration(...)`
//!
//! ### Optional setters
//!
//! - `.bundle_builder(...)`, to replace the [standard bundle builder](StandardBundleBuilder).
//! - `.on_reload_config(...)`
//! - `.on_commit_config(...)`
//! - `.on_apply_bundle(...)`
//! - `.on_update_orderers(...)`
//! - `.on_discard_config(...)`
//!
//! The channel's [configuration](Configuration) can also be defined using the builder pattern, for
//! example:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .channel_id(ChannelID::new("mychannel"))
//!     .orderer_connection_timeout(Duration::from_secs(10))
//!     .log_events(true)
//!     .build();
//! ```
//!
//! ## Locking
//!
//! Three locks are involved in changing the active bundle, from widest to narrowest:
//! 1. The per-channel apply lock serializes whole reload and commit operations, so that no two of
//!    them ever interleave their read, validate, persist, and activate steps.
//! 2. A process-wide construction lock is held only around calls into the
//!    [`BundleBuilder`]. Builders may rely on identity and crypto libraries whose shared state is
//!    not safe to initialize concurrently; the lock works around that and protects nothing else.
//! 3. The per-channel resources lock protects only the pointer to the active bundle. Readers of
//!    [`resources`](Channel::resources) are never blocked by validation or persistence.
//!
//! The [network provider](crate::networking::network::Network) is told about new ordering endpoints
//! only after all three locks are released, so a slow connection-pool update never holds up the
//! next commit. Endpoint lists that arrive after a newer one has been forwarded are dropped.

use std::{
    sync::{mpsc::Sender, Arc, Mutex, RwLock},
    thread::JoinHandle,
    time::Duration,
};

use typed_builder::TypedBuilder;

use crate::{
    bundle::{
        builder::{BundleBuilder, StandardBundleBuilder},
        Bundle,
    },
    event_bus::*,
    events::*,
    networking::network::{Network, OrdererUpdateHandle},
    types::data_types::ChannelID,
    vault::pluggables::Vault,
};

mod committer;

mod errors;
pub use errors::CommitError;

/// Connection timeout given to ordering endpoints unless configured otherwise.
pub const DEFAULT_ORDERER_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Stores the user-defined parameters required to start a channel, that is:
/// 1. The ID of the channel.
/// 2. The connection timeout handed to the network provider with every ordering endpoint.
/// 3. Whether to log events using the default [logging handlers](crate::logging).
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. On the builder call the following methods to construct a valid [Configuration].

    Required:
    - `.channel_id(...)`
    - `.log_events(...)`

    Optional:
    - `.orderer_connection_timeout(...)`
"))]
pub struct Configuration {
    #[builder(setter(doc = "Set the ID of the channel. Required."))]
    pub channel_id: ChannelID,
    #[builder(
        default = DEFAULT_ORDERER_CONNECTION_TIMEOUT,
        setter(doc = "Set the connection timeout for ordering endpoints. Optional, defaults to 10 seconds.")
    )]
    pub orderer_connection_timeout: Duration,
    #[builder(setter(doc = "Enable logging? Required."))]
    pub log_events: bool,
}

/// Stores all necessary parameters and trait implementations required to run a [`Channel`].
#[derive(TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [ChannelSpec]. On the builder call the following methods to construct a valid [ChannelSpec].

    Required:
    - `.vault(...)`
    - `.network(...)`
    - `.configuration(...)`

    Optional:
    - `.bundle_builder(...)`
    - `.on_reload_config(...)`
    - `.on_commit_config(...)`
    - `.on_apply_bundle(...)`
    - `.on_update_orderers(...)`
    - `.on_discard_config(...)`
"))]
pub struct ChannelSpec<V: Vault, N: Network> {
    // Required parameters
    #[builder(setter(doc = "Set the vault configuration transactions are persisted into. The argument must implement the [Vault](crate::vault::pluggables::Vault) trait. Required."))]
    vault: V,
    #[builder(setter(doc = "Set the network provider that is told about ordering endpoints. The argument must implement the [Network](crate::networking::network::Network) trait. Required."))]
    network: N,
    #[builder(setter(doc = "Set the [configuration](Configuration) of the channel. Required."))]
    configuration: Configuration,
    // Optional parameters
    #[builder(default = Box::new(StandardBundleBuilder) as Box<dyn BundleBuilder>, setter(transform = |bundle_builder: impl BundleBuilder| Box::new(bundle_builder) as Box<dyn BundleBuilder>,
    doc = "Set the [builder](crate::bundle::builder::BundleBuilder) that turns configurations into bundles. Optional."))]
    bundle_builder: Box<dyn BundleBuilder>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReloadConfigEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReloadConfigEvent>),
    doc = "Register a handler closure to be invoked after the channel reloads its persisted configuration transactions. Optional."))]
    on_reload_config: Option<HandlerPtr<ReloadConfigEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&CommitConfigEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<CommitConfigEvent>),
    doc = "Register a handler closure to be invoked after a configuration transaction is committed to the vault. Optional."))]
    on_commit_config: Option<HandlerPtr<CommitConfigEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ApplyBundleEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ApplyBundleEvent>),
    doc = "Register a handler closure to be invoked after a bundle becomes the active configuration. Optional."))]
    on_apply_bundle: Option<HandlerPtr<ApplyBundleEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateOrderersEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateOrderersEvent>),
    doc = "Register a handler closure to be invoked after the network provider is given new ordering endpoints. Optional."))]
    on_update_orderers: Option<HandlerPtr<UpdateOrderersEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DiscardConfigEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DiscardConfigEvent>),
    doc = "Register a handler closure to be invoked after the pending writes of a failed configuration transaction are discarded. Optional."))]
    on_discard_config: Option<HandlerPtr<DiscardConfigEvent>>,
}

impl<V: Vault, N: Network> ChannelSpec<V, N> {
    /// Start the channel's event bus (if any handlers are registered) and return the [`Channel`].
    ///
    /// The returned channel has no active bundle. Call
    /// [`reload_config_transactions`](Channel::reload_config_transactions) before delivering any
    /// block to it.
    pub fn start(self) -> Channel<V, N> {
        let event_handlers = EventHandlers::new(
            self.configuration.log_events,
            self.on_reload_config,
            self.on_commit_config,
            self.on_apply_bundle,
            self.on_update_orderers,
            self.on_discard_config,
        );

        let (event_publisher, event_bus, event_bus_shutdown) = if event_handlers.is_empty() {
            (None, None, None)
        } else {
            let (event_publisher, event_subscriber) = std::sync::mpsc::channel();
            let (event_bus_shutdown, event_bus_shutdown_receiver) = std::sync::mpsc::channel();
            let event_bus =
                start_event_bus(event_handlers, event_subscriber, event_bus_shutdown_receiver);
            (Some(event_publisher), Some(event_bus), Some(event_bus_shutdown))
        };

        Channel {
            channel_id: self.configuration.channel_id,
            orderer_connection_timeout: self.configuration.orderer_connection_timeout,
            vault: self.vault,
            orderer_update_handle: OrdererUpdateHandle::new(self.network),
            bundle_builder: self.bundle_builder,
            apply_lock: Mutex::new(()),
            resources: RwLock::new(None),
            event_publisher,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// The configuration committer of one channel. When this value is dropped, the event bus thread is
/// shut down after it has handled every event already published.
///
/// `Channel` is `Sync`: share it between the block-delivery thread and readers of
/// [`resources`](Channel::resources) by wrapping it in an [`Arc`].
pub struct Channel<V: Vault, N: Network> {
    channel_id: ChannelID,
    orderer_connection_timeout: Duration,
    vault: V,
    orderer_update_handle: OrdererUpdateHandle<N>,
    bundle_builder: Box<dyn BundleBuilder>,
    apply_lock: Mutex<()>,
    resources: RwLock<Option<Arc<Bundle>>>,
    event_publisher: Option<Sender<Event>>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

impl<V: Vault, N: Network> Channel<V, N> {
    pub fn channel_id(&self) -> &ChannelID {
        &self.channel_id
    }

    /// Get the active bundle, or `None` if no configuration has been applied yet.
    ///
    /// The returned bundle stays valid, unchanged, for as long as the caller holds it, even if a
    /// newer bundle is activated in the meantime.
    pub fn resources(&self) -> Option<Arc<Bundle>> {
        committer::read(&self.resources).clone()
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }
}

impl<V: Vault, N: Network> Drop for Channel<V, N> {
    fn drop(&mut self) {
        self.event_bus_shutdown.iter().for_each(|shutdown| {
            let _ = shutdown.send(());
        });
        if let Some(event_bus) = self.event_bus.take() {
            let _ = event_bus.join();
        }
    }
}
