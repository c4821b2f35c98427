/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The configuration tree of a channel.
//!
//! A [`Config`] is the complete, self-describing configuration of a channel at a given
//! [`Sequence`]. It is carried inside a [`ConfigEnvelope`](super::envelope::ConfigEnvelope) and is
//! turned into an immutable [`Bundle`](crate::bundle::Bundle) before it takes effect.
//!
//! ```text
//! Config
//! └── ChannelGroup
//!     ├── capabilities
//!     ├── admins (AdminPolicy)
//!     ├── application: Option<ApplicationGroup>
//!     │   ├── capabilities
//!     │   └── organizations: [OrganizationGroup { name, msp }]
//!     └── orderer: Option<OrdererGroup>
//!         ├── consensus_type
//!         └── organizations: [OrdererOrganizationGroup { name, msp, endpoints }]
//! ```

use std::collections::BTreeSet;

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::hash,
    data_types::{CryptoHash, Sequence, VerifyingKeyBytes},
};

/// A full channel configuration.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Config {
    /// Position of this configuration in the channel's configuration log.
    pub sequence: Sequence,
    pub channel: ChannelGroup,
}

impl Config {
    /// Compute the SHA256 digest of the Borsh encoding of this configuration.
    ///
    /// Configuration updates commit to this digest, and bundles remember the digest of the
    /// configuration they were built from.
    pub fn digest(&self) -> CryptoHash {
        hash(&self.try_to_vec().unwrap())
    }
}

/// The root group of a channel configuration.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ChannelGroup {
    /// Names of the channel-level capabilities every node must support.
    pub capabilities: BTreeSet<String>,
    /// The policy that authorizes updates to this configuration.
    pub admins: AdminPolicy,
    pub application: Option<ApplicationGroup>,
    pub orderer: Option<OrdererGroup>,
}

/// Application-level section of a channel configuration.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct ApplicationGroup {
    /// Names of the application-level capabilities every node must support.
    pub capabilities: BTreeSet<String>,
    pub organizations: Vec<OrganizationGroup>,
}

/// Ordering-service section of a channel configuration.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OrdererGroup {
    pub consensus_type: String,
    pub organizations: Vec<OrdererOrganizationGroup>,
}

/// A member organization of the application section.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OrganizationGroup {
    pub name: String,
    pub msp: MSPConfig,
}

/// An organization that runs ordering nodes, together with the network endpoints of those nodes.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OrdererOrganizationGroup {
    pub name: String,
    pub msp: MSPConfig,
    /// Endpoints of the organization's ordering nodes, in `host:port` form.
    pub endpoints: Vec<String>,
}

/// Root-of-trust material of an organization's membership service provider.
///
/// Certificates are kept as opaque byte strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MSPConfig {
    pub msp_id: String,
    pub root_certs: Vec<Vec<u8>>,
    pub intermediate_certs: Vec<Vec<u8>>,
    pub tls_root_certs: Vec<Vec<u8>>,
    pub tls_intermediate_certs: Vec<Vec<u8>>,
}

/// An N-of-M signature policy over Ed25519 keys.
///
/// A configuration update is authorized if at least `threshold` distinct keys in `admins` signed it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct AdminPolicy {
    pub threshold: u32,
    pub admins: Vec<VerifyingKeyBytes>,
}
