/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use crate::{bundle::Bundle, types::data_types::Sequence};

pub trait Network: Clone + Send + 'static {
    /// Replace the set of ordering endpoints the node should talk to for this channel.
    fn set_config_orderers(&mut self, orderers: Vec<ConnectionConfig>);
}

/// How to reach and authenticate one ordering node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// `host:port` of the ordering node.
    pub address: String,
    pub connection_timeout: Duration,
    pub tls_enabled: bool,
    /// TLS root and intermediate certificates of the ordering node's organization.
    pub tls_root_certs: Vec<Vec<u8>>,
}

impl ConnectionConfig {
    /// Flatten the orderer section of `bundle` into one `ConnectionConfig` per endpoint, in
    /// configuration order.
    ///
    /// Returns `None` if the bundle has no orderer section.
    pub fn from_bundle(bundle: &Bundle, connection_timeout: Duration) -> Option<Vec<ConnectionConfig>> {
        let orderer = bundle.orderer_config()?;
        let mut connections = Vec::new();
        for org in orderer.organizations() {
            let msp = org.msp();
            let tls_root_certs: Vec<Vec<u8>> = msp
                .tls_root_certs()
                .iter()
                .chain(msp.tls_intermediate_certs())
                .cloned()
                .collect();
            for endpoint in org.endpoints() {
                connections.push(ConnectionConfig {
                    address: endpoint.clone(),
                    connection_timeout,
                    tls_enabled: true,
                    tls_root_certs: tls_root_certs.clone(),
                });
            }
        }
        Some(connections)
    }
}

/// The ordering endpoints of the bundle activated at `sequence`, waiting to be forwarded.
#[derive(Clone, Debug)]
pub(crate) struct OrdererUpdate {
    pub(crate) sequence: Sequence,
    pub(crate) orderers: Vec<ConnectionConfig>,
}

/// Handle for informing the network provider about changes to the ordering endpoints.
///
/// The handle remembers the sequence of the last list it forwarded and drops any list that is not
/// newer, so updates forwarded from different threads can never roll the network provider back to
/// an older configuration. The network provider itself is called without holding any lock.
pub(crate) struct OrdererUpdateHandle<N: Network> {
    latest: Mutex<LatestOrderers<N>>,
}

struct LatestOrderers<N: Network> {
    network: N,
    forwarded: Option<Sequence>,
}

impl<N: Network> OrdererUpdateHandle<N> {
    pub(crate) fn new(network: N) -> Self {
        Self {
            latest: Mutex::new(LatestOrderers {
                network,
                forwarded: None,
            }),
        }
    }

    /// Forward `update` to the network provider, unless a list from the same or a later sequence
    /// was already forwarded. Returns whether anything was forwarded.
    pub(crate) fn update_orderers(&self, update: OrdererUpdate) -> bool {
        let mut network = {
            let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
            if latest
                .forwarded
                .map_or(false, |forwarded| forwarded >= update.sequence)
            {
                return false;
            }
            latest.forwarded = Some(update.sequence);
            latest.network.clone()
        };
        network.set_config_orderers(update.orderers);
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Network for Recorder {
        fn set_config_orderers(&mut self, orderers: Vec<ConnectionConfig>) {
            let mut received = self.0.lock().unwrap();
            received.extend(orderers.into_iter().map(|orderer| orderer.address));
        }
    }

    fn update(sequence: u64, address: &str) -> OrdererUpdate {
        OrdererUpdate {
            sequence: Sequence::new(sequence),
            orderers: vec![ConnectionConfig {
                address: address.to_string(),
                connection_timeout: Duration::from_secs(10),
                tls_enabled: true,
                tls_root_certs: Vec::new(),
            }],
        }
    }

    #[test]
    fn stale_updates_are_dropped() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let handle = OrdererUpdateHandle::new(Recorder(received.clone()));

        assert!(handle.update_orderers(update(3, "orderer3:7050")));
        assert!(!handle.update_orderers(update(2, "orderer2:7050")));
        assert!(!handle.update_orderers(update(3, "orderer3:7050")));
        assert!(handle.update_orderers(update(4, "orderer4:7050")));

        assert_eq!(
            *received.lock().unwrap(),
            vec![String::from("orderer3:7050"), String::from("orderer4:7050")]
        );
    }
}
