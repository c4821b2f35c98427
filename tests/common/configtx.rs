//! Builders for channel configurations and the signed transactions that carry them.

use std::collections::BTreeSet;

use borsh::BorshSerialize;
use configtx_rs::{
    channel::{Channel, ChannelSpec, Configuration},
    types::{
        config::{
            AdminPolicy, ApplicationGroup, ChannelGroup, Config, MSPConfig, OrdererGroup,
            OrdererOrganizationGroup, OrganizationGroup,
        },
        crypto_primitives::{sign, SigningKey},
        data_types::{BlockNumber, ChannelID, Sequence},
        envelope::{ConfigEnvelope, ConfigSignature, ConfigUpdate, ConfigUpdateEnvelope, Envelope},
    },
};
use rand_core::OsRng;

use super::{faulty_vault::FaultyVault, mem_db::MemDB, network::RecordingNetwork};

pub(crate) const CHANNEL: &str = "testchannel";

pub(crate) fn channel_id() -> ChannelID {
    ChannelID::new(CHANNEL)
}

/// Start a channel named [`CHANNEL`] on top of `kv_store`, without reloading it.
pub(crate) fn start_channel(
    kv_store: MemDB,
    network: RecordingNetwork,
) -> Channel<FaultyVault, RecordingNetwork> {
    ChannelSpec::builder()
        .vault(FaultyVault::new(kv_store))
        .network(network)
        .configuration(
            Configuration::builder()
                .channel_id(channel_id())
                .log_events(true)
                .build(),
        )
        .build()
        .start()
}

/// A set of channel admins.
pub(crate) struct Admins(Vec<SigningKey>);

impl Admins {
    pub(crate) fn generate(n: usize) -> Admins {
        Admins((0..n).map(|_| SigningKey::generate(&mut OsRng)).collect())
    }

    pub(crate) fn policy(&self, threshold: u32) -> AdminPolicy {
        AdminPolicy {
            threshold,
            admins: self.0.iter().map(|key| key.verifying_key().to_bytes()).collect(),
        }
    }

    pub(crate) fn key(&self, index: usize) -> &SigningKey {
        &self.0[index]
    }

    /// The first `n` admins.
    pub(crate) fn first(&self, n: usize) -> Vec<&SigningKey> {
        self.0.iter().take(n).collect()
    }
}

pub(crate) fn msp(name: &str) -> MSPConfig {
    MSPConfig {
        msp_id: format!("{}MSP", name),
        root_certs: vec![format!("{} root cert", name).into_bytes()],
        intermediate_certs: Vec::new(),
        tls_root_certs: vec![format!("{} tls root cert", name).into_bytes()],
        tls_intermediate_certs: Vec::new(),
    }
}

pub(crate) fn orderer_group(name: &str, endpoints: &[&str]) -> OrdererGroup {
    OrdererGroup {
        consensus_type: String::from("etcdraft"),
        organizations: vec![OrdererOrganizationGroup {
            name: name.to_string(),
            msp: msp(name),
            endpoints: endpoints.iter().map(|endpoint| endpoint.to_string()).collect(),
        }],
    }
}

/// A sequence 1 configuration with one application organization and no orderer section.
pub(crate) fn genesis_config(admins: AdminPolicy) -> Config {
    Config {
        sequence: Sequence::first(),
        channel: ChannelGroup {
            capabilities: capabilities(&["V2_0"]),
            admins,
            application: Some(ApplicationGroup {
                capabilities: capabilities(&["V2_0"]),
                organizations: vec![OrganizationGroup {
                    name: String::from("Org1"),
                    msp: msp("Org1"),
                }],
            }),
            orderer: None,
        },
    }
}

/// A copy of `config` at the next sequence.
pub(crate) fn next_config(config: &Config) -> Config {
    let mut next = config.clone();
    next.sequence = config.sequence.next();
    next
}

pub(crate) fn capabilities(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// A configuration transaction as delivered in a block: the raw bytes and their decoded form.
pub(crate) struct ConfigTx {
    pub(crate) raw: Vec<u8>,
    pub(crate) envelope: Envelope,
}

impl ConfigTx {
    pub(crate) fn commit_to(
        &self,
        channel: &Channel<FaultyVault, RecordingNetwork>,
        block: u64,
    ) -> Result<(), configtx_rs::channel::CommitError> {
        channel.commit_config(BlockNumber::new(block), &self.raw, Some(&self.envelope))
    }
}

/// Wrap a genesis configuration, which carries no signed update.
pub(crate) fn genesis_tx(config: Config) -> ConfigTx {
    into_tx(&channel_id(), ConfigEnvelope {
        config,
        last_update: None,
    })
}

/// Wrap `config` together with an update for [`CHANNEL`] signed by `signers`.
pub(crate) fn update_tx(config: Config, signers: &[&SigningKey]) -> ConfigTx {
    let update = ConfigUpdate {
        channel_id: channel_id(),
        sequence: config.sequence,
        config_digest: config.digest(),
    };
    signed_update_tx(config, &update, signers)
}

/// Wrap `config` together with an arbitrary `update` signed by `signers`.
pub(crate) fn signed_update_tx(
    config: Config,
    update: &ConfigUpdate,
    signers: &[&SigningKey],
) -> ConfigTx {
    let config_update = update.try_to_vec().unwrap();
    let signatures = signers
        .iter()
        .map(|signer| ConfigSignature {
            signer: signer.verifying_key().to_bytes(),
            signature: sign(signer, &config_update),
        })
        .collect();
    into_tx(&channel_id(), ConfigEnvelope {
        config,
        last_update: Some(ConfigUpdateEnvelope {
            config_update,
            signatures,
        }),
    })
}

pub(crate) fn into_tx(channel_id: &ChannelID, config_envelope: ConfigEnvelope) -> ConfigTx {
    let envelope = config_envelope.into_envelope(channel_id, 1_700_000_000);
    ConfigTx {
        raw: envelope.encode(),
        envelope,
    }
}
