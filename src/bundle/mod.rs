/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Immutable, fully parsed channel configurations.
//!
//! A [`Bundle`] is built once from a [`Config`] and never changes afterwards. Everything a node needs
//! to act on a channel's configuration is reachable from it:
//! - The [channel](ChannelConfig), [application](ApplicationConfig), and [orderer](OrdererConfig)
//!   sections, each with its required [capabilities](capabilities::CapabilitySet).
//! - The [membership service providers](MSP) of every member organization, keyed by MSP ID.
//! - The [validator](validator::ConfigTxValidator) that decides which configuration may succeed this
//!   one.
//!
//! ## Structural checks
//!
//! [`Bundle::new`] refuses configurations that are well-formed bytes but not a usable configuration:
//! - An organization with an empty MSP ID, or an MSP with no root certificates.
//! - Two organizations in the same section with the same name.
//! - Two organizations that use the same MSP ID with different MSP definitions.
//! - An orderer endpoint that is not of the form `host:port`.
//! - An admin policy whose threshold is zero or greater than the number of admins, or whose admin
//!   list contains duplicates or keys that are not valid Ed25519 points.

use std::{
    collections::{BTreeMap, HashSet},
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use crate::types::{
    config::{AdminPolicy, Config, MSPConfig},
    crypto_primitives::SignatureError,
    data_types::{ChannelID, CryptoHash, Sequence},
};

pub mod builder;

pub mod capabilities;

pub mod validator;

use capabilities::{CapabilityLevel, CapabilitySet};
use validator::{ConfigTxValidator, PolicyValidator};

/// An immutable, validated view of a channel configuration.
pub struct Bundle {
    channel_id: ChannelID,
    config: Config,
    config_digest: CryptoHash,
    channel_config: ChannelConfig,
    application_config: Option<ApplicationConfig>,
    orderer_config: Option<OrdererConfig>,
    msps: BTreeMap<String, MSP>,
    validator: Arc<dyn ConfigTxValidator>,
}

impl Bundle {
    /// Build a bundle of `config` for `channel_id`, whose successors are checked by a
    /// [`PolicyValidator`] over `config`'s admin policy.
    pub fn new(channel_id: ChannelID, config: Config) -> Result<Bundle, BundleError> {
        let validator =
            PolicyValidator::new(channel_id.clone(), config.sequence, &config.channel.admins)?;
        Bundle::with_validator(channel_id, config, Arc::new(validator))
    }

    /// Build a bundle of `config` for `channel_id` whose successors are checked by `validator`.
    pub fn with_validator(
        channel_id: ChannelID,
        config: Config,
        validator: Arc<dyn ConfigTxValidator>,
    ) -> Result<Bundle, BundleError> {
        let channel_group = &config.channel;
        check_admin_policy(&channel_group.admins)?;

        let mut msps = BTreeMap::new();

        let application_config = match &channel_group.application {
            Some(application) => {
                let mut organizations = BTreeMap::new();
                for org in &application.organizations {
                    let msp = MSP::new(&org.name, &org.msp)?;
                    register_msp(&mut msps, &msp)?;
                    let organization = Organization {
                        name: org.name.clone(),
                        msp,
                    };
                    if organizations
                        .insert(org.name.clone(), organization)
                        .is_some()
                    {
                        return Err(BundleError::DuplicateOrganization {
                            name: org.name.clone(),
                        });
                    }
                }
                Some(ApplicationConfig {
                    capabilities: CapabilitySet::new(
                        CapabilityLevel::Application,
                        application.capabilities.clone(),
                    ),
                    organizations,
                })
            }
            None => None,
        };

        let orderer_config = match &channel_group.orderer {
            Some(orderer) => {
                let mut names = HashSet::new();
                let mut organizations = Vec::with_capacity(orderer.organizations.len());
                for org in &orderer.organizations {
                    if !names.insert(org.name.as_str()) {
                        return Err(BundleError::DuplicateOrganization {
                            name: org.name.clone(),
                        });
                    }
                    let msp = MSP::new(&org.name, &org.msp)?;
                    register_msp(&mut msps, &msp)?;
                    for endpoint in &org.endpoints {
                        check_endpoint(&org.name, endpoint)?;
                    }
                    organizations.push(OrdererOrganization {
                        name: org.name.clone(),
                        msp,
                        endpoints: org.endpoints.clone(),
                    });
                }
                Some(OrdererConfig {
                    consensus_type: orderer.consensus_type.clone(),
                    organizations,
                })
            }
            None => None,
        };

        let channel_config = ChannelConfig {
            capabilities: CapabilitySet::new(
                CapabilityLevel::Channel,
                channel_group.capabilities.clone(),
            ),
            admins: channel_group.admins.clone(),
        };

        Ok(Bundle {
            channel_id,
            config_digest: config.digest(),
            config,
            channel_config,
            application_config,
            orderer_config,
            msps,
            validator,
        })
    }

    pub fn channel_id(&self) -> &ChannelID {
        &self.channel_id
    }

    pub fn sequence(&self) -> Sequence {
        self.config.sequence
    }

    /// The configuration this bundle was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_digest(&self) -> CryptoHash {
        self.config_digest
    }

    pub fn channel_config(&self) -> &ChannelConfig {
        &self.channel_config
    }

    /// The application section, if the configuration has one.
    pub fn application_config(&self) -> Option<&ApplicationConfig> {
        self.application_config.as_ref()
    }

    /// The orderer section, if the configuration has one.
    pub fn orderer_config(&self) -> Option<&OrdererConfig> {
        self.orderer_config.as_ref()
    }

    /// Get the MSP registered under `msp_id`.
    pub fn msp(&self, msp_id: &str) -> Option<&MSP> {
        self.msps.get(msp_id)
    }

    pub fn msp_ids(&self) -> impl Iterator<Item = &String> {
        self.msps.keys()
    }

    /// The validator that checks proposed successors of this configuration.
    pub fn configtx_validator(&self) -> &Arc<dyn ConfigTxValidator> {
        &self.validator
    }

    /// Check for configurations that are valid but probably not what the channel's admins intended.
    ///
    /// Findings are logged as warnings and also returned, so that callers can surface them.
    pub fn log_sanity_checks(&self) -> Vec<String> {
        let mut findings = Vec::new();

        match &self.orderer_config {
            None => findings.push("configuration has no orderer section".to_string()),
            Some(orderer) => {
                if orderer.organizations.is_empty() {
                    findings.push("orderer section has no organizations".to_string());
                }
                for org in &orderer.organizations {
                    if org.endpoints.is_empty() {
                        findings.push(format!(
                            "orderer organization {} lists no endpoints",
                            org.name
                        ));
                    }
                    if org.msp.tls_root_certs.is_empty() {
                        findings.push(format!(
                            "orderer organization {} has no TLS root certificates",
                            org.name
                        ));
                    }
                }
            }
        }

        match &self.application_config {
            None => findings.push("configuration has no application section".to_string()),
            Some(application) if application.organizations.is_empty() => {
                findings.push("application section has no organizations".to_string())
            }
            Some(_) => {}
        }

        for finding in &findings {
            log::warn!(
                "[channel: {}] config sequence {}: {}",
                self.channel_id,
                self.sequence(),
                finding
            );
        }

        findings
    }
}

/// Channel-level section of a [`Bundle`].
pub struct ChannelConfig {
    capabilities: CapabilitySet,
    admins: AdminPolicy,
}

impl ChannelConfig {
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn admin_policy(&self) -> &AdminPolicy {
        &self.admins
    }
}

/// Application section of a [`Bundle`].
pub struct ApplicationConfig {
    capabilities: CapabilitySet,
    organizations: BTreeMap<String, Organization>,
}

impl ApplicationConfig {
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Application organizations, keyed by organization name.
    pub fn organizations(&self) -> &BTreeMap<String, Organization> {
        &self.organizations
    }
}

/// Orderer section of a [`Bundle`].
pub struct OrdererConfig {
    consensus_type: String,
    organizations: Vec<OrdererOrganization>,
}

impl OrdererConfig {
    pub fn consensus_type(&self) -> &str {
        &self.consensus_type
    }

    /// Orderer organizations, in configuration order.
    pub fn organizations(&self) -> &[OrdererOrganization] {
        &self.organizations
    }
}

pub struct Organization {
    name: String,
    msp: MSP,
}

impl Organization {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn msp(&self) -> &MSP {
        &self.msp
    }
}

pub struct OrdererOrganization {
    name: String,
    msp: MSP,
    endpoints: Vec<String>,
}

impl OrdererOrganization {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn msp(&self) -> &MSP {
        &self.msp
    }

    /// Endpoints of this organization's ordering nodes, in `host:port` form.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

/// A membership service provider: the roots of trust of one organization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MSP {
    id: String,
    root_certs: Vec<Vec<u8>>,
    intermediate_certs: Vec<Vec<u8>>,
    tls_root_certs: Vec<Vec<u8>>,
    tls_intermediate_certs: Vec<Vec<u8>>,
}

impl MSP {
    fn new(organization: &str, config: &MSPConfig) -> Result<MSP, BundleError> {
        if config.msp_id.is_empty() {
            return Err(BundleError::EmptyMSPID {
                organization: organization.to_string(),
            });
        }
        if config.root_certs.is_empty() {
            return Err(BundleError::MissingRootCerts {
                msp_id: config.msp_id.clone(),
            });
        }
        Ok(MSP {
            id: config.msp_id.clone(),
            root_certs: config.root_certs.clone(),
            intermediate_certs: config.intermediate_certs.clone(),
            tls_root_certs: config.tls_root_certs.clone(),
            tls_intermediate_certs: config.tls_intermediate_certs.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root_certs(&self) -> &[Vec<u8>] {
        &self.root_certs
    }

    pub fn intermediate_certs(&self) -> &[Vec<u8>] {
        &self.intermediate_certs
    }

    pub fn tls_root_certs(&self) -> &[Vec<u8>] {
        &self.tls_root_certs
    }

    pub fn tls_intermediate_certs(&self) -> &[Vec<u8>] {
        &self.tls_intermediate_certs
    }
}

// The same organization may sit in both the application and the orderer section, so an MSP ID may
// repeat as long as it always names the same MSP.
fn register_msp(msps: &mut BTreeMap<String, MSP>, msp: &MSP) -> Result<(), BundleError> {
    match msps.get(&msp.id) {
        Some(existing) if existing != msp => Err(BundleError::ConflictingMSP {
            msp_id: msp.id.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            msps.insert(msp.id.clone(), msp.clone());
            Ok(())
        }
    }
}

fn check_endpoint(organization: &str, endpoint: &str) -> Result<(), BundleError> {
    let valid = match endpoint.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && matches!(port.parse::<u16>(), Ok(p) if p != 0),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(BundleError::InvalidEndpoint {
            organization: organization.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

fn check_admin_policy(policy: &AdminPolicy) -> Result<(), BundleError> {
    if policy.threshold == 0 || policy.threshold as usize > policy.admins.len() {
        return Err(BundleError::InvalidAdminPolicy {
            threshold: policy.threshold,
            admins: policy.admins.len(),
        });
    }
    let mut seen = HashSet::new();
    if !policy.admins.iter().all(|admin| seen.insert(admin)) {
        return Err(BundleError::DuplicateAdmin);
    }
    Ok(())
}

/// Reasons a [`Config`] cannot be turned into a [`Bundle`].
#[derive(Debug)]
pub enum BundleError {
    EmptyMSPID { organization: String },
    MissingRootCerts { msp_id: String },
    DuplicateOrganization { name: String },
    ConflictingMSP { msp_id: String },
    InvalidEndpoint { organization: String, endpoint: String },
    InvalidAdminPolicy { threshold: u32, admins: usize },
    DuplicateAdmin,
    InvalidAdminKey { source: SignatureError },
    /// Failure reported by a [`BundleBuilder`](builder::BundleBuilder) other than the standard one.
    Other { reason: String },
}

impl Display for BundleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::EmptyMSPID { organization } => {
                write!(f, "organization {} has an empty MSP ID", organization)
            }
            BundleError::MissingRootCerts { msp_id } => {
                write!(f, "MSP {} has no root certificates", msp_id)
            }
            BundleError::DuplicateOrganization { name } => {
                write!(f, "organization {} is defined more than once", name)
            }
            BundleError::ConflictingMSP { msp_id } => {
                write!(f, "MSP ID {} names two different MSPs", msp_id)
            }
            BundleError::InvalidEndpoint {
                organization,
                endpoint,
            } => write!(
                f,
                "orderer organization {} has malformed endpoint {:?}",
                organization, endpoint
            ),
            BundleError::InvalidAdminPolicy { threshold, admins } => write!(
                f,
                "admin policy threshold {} is not satisfiable by {} admins",
                threshold, admins
            ),
            BundleError::DuplicateAdmin => write!(f, "admin policy lists an admin more than once"),
            BundleError::InvalidAdminKey { source } => {
                write!(f, "admin policy contains an invalid key: {}", source)
            }
            BundleError::Other { reason } => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for BundleError {}
