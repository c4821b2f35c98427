use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use configtx_rs::{
    channel::{ChannelSpec, Configuration, DEFAULT_ORDERER_CONNECTION_TIMEOUT},
    types::data_types::Sequence,
};
use log::LevelFilter;

mod common;

use crate::common::{
    configtx::{
        channel_id, genesis_config, genesis_tx, next_config, orderer_group, start_channel,
        update_tx, Admins,
    },
    faulty_vault::FaultyVault,
    logging::setup_logger,
    mem_db::MemDB,
    network::RecordingNetwork,
};

#[test]
fn orderer_endpoints_are_propagated_test() {
    setup_logger(LevelFilter::Trace);

    // 1. Commit a genesis configuration without an orderer section.
    let network = RecordingNetwork::new();
    let channel = start_channel(MemDB::new(), network.clone());
    channel.reload_config_transactions().unwrap();
    let admins = Admins::generate(1);
    let genesis = genesis_config(admins.policy(1));
    genesis_tx(genesis.clone()).commit_to(&channel, 0).unwrap();
    assert!(network.updates().is_empty());

    // 2. Add one ordering organization with two endpoints and one TLS root certificate.
    log::debug!("Committing config-2 with an ordering organization.");
    let mut second = next_config(&genesis);
    second.channel.orderer = Some(orderer_group(
        "OrdererOrg",
        &["orderer0.example.com:7050", "orderer1.example.com:7050"],
    ));
    update_tx(second, &admins.first(1))
        .commit_to(&channel, 1)
        .unwrap();

    // 3. The network received exactly one list, with both endpoints.
    let updates = network.updates();
    assert_eq!(updates.len(), 1);
    let orderers = &updates[0];
    assert_eq!(orderers.len(), 2);
    assert_eq!(orderers[0].address, "orderer0.example.com:7050");
    assert_eq!(orderers[1].address, "orderer1.example.com:7050");
    for orderer in orderers {
        assert!(orderer.tls_enabled);
        assert_eq!(
            orderer.tls_root_certs,
            vec![b"OrdererOrg tls root cert".to_vec()]
        );
        assert_eq!(orderer.connection_timeout, DEFAULT_ORDERER_CONNECTION_TIMEOUT);
    }

    // 4. A configuration whose orderer organizations list no endpoints does not clear the list.
    log::debug!("Committing config-3 whose ordering organization has no endpoints.");
    let mut third = next_config(&next_config(&genesis));
    third.channel.orderer = Some(orderer_group("OrdererOrg", &[]));
    update_tx(third, &admins.first(1))
        .commit_to(&channel, 2)
        .unwrap();
    assert_eq!(channel.resources().unwrap().sequence(), Sequence::new(3));
    assert_eq!(network.updates().len(), 1);
}

#[test]
fn connection_configs_carry_intermediates_and_configured_timeout_test() {
    setup_logger(LevelFilter::Trace);

    let network = RecordingNetwork::new();
    let channel = ChannelSpec::builder()
        .vault(FaultyVault::new(MemDB::new()))
        .network(network.clone())
        .configuration(
            Configuration::builder()
                .channel_id(channel_id())
                .orderer_connection_timeout(Duration::from_secs(3))
                .log_events(false)
                .build(),
        )
        .build()
        .start();
    channel.reload_config_transactions().unwrap();

    // 1. A genesis configuration with two ordering organizations, one of which has a TLS intermediate.
    let mut genesis = genesis_config(Admins::generate(1).policy(1));
    let mut orderer = orderer_group("OrdererOrg1", &["orderer0.org1.example.com:7050"]);
    let mut second_org = orderer_group("OrdererOrg2", &["orderer0.org2.example.com:7050"]);
    second_org.organizations[0].msp.tls_intermediate_certs =
        vec![b"OrdererOrg2 tls intermediate cert".to_vec()];
    orderer.organizations.append(&mut second_org.organizations);
    genesis.channel.orderer = Some(orderer);
    genesis_tx(genesis).commit_to(&channel, 0).unwrap();

    // 2. One connection per endpoint, each with its own organization's certificates.
    let updates = network.updates();
    assert_eq!(updates.len(), 1);
    let orderers = &updates[0];
    assert_eq!(orderers.len(), 2);
    assert_eq!(
        orderers[0].tls_root_certs,
        vec![b"OrdererOrg1 tls root cert".to_vec()]
    );
    assert_eq!(
        orderers[1].tls_root_certs,
        vec![
            b"OrdererOrg2 tls root cert".to_vec(),
            b"OrdererOrg2 tls intermediate cert".to_vec()
        ]
    );
    assert!(orderers
        .iter()
        .all(|orderer| orderer.connection_timeout == Duration::from_secs(3)));
}

#[test]
fn lifecycle_events_are_published_test() {
    setup_logger(LevelFilter::Trace);

    let applied = Arc::new(Mutex::new(Vec::new()));
    let committed = Arc::new(Mutex::new(Vec::new()));
    let orderer_updates = Arc::new(Mutex::new(Vec::new()));
    let discarded = Arc::new(Mutex::new(Vec::new()));

    let channel = {
        let applied = applied.clone();
        let committed = committed.clone();
        let orderer_updates = orderer_updates.clone();
        let discarded = discarded.clone();
        ChannelSpec::builder()
            .vault(FaultyVault::new(MemDB::new()))
            .network(RecordingNetwork::new())
            .configuration(
                Configuration::builder()
                    .channel_id(channel_id())
                    .log_events(true)
                    .build(),
            )
            .on_apply_bundle(move |event| applied.lock().unwrap().push(event.sequence))
            .on_commit_config(move |event| {
                committed
                    .lock()
                    .unwrap()
                    .push((event.block, event.tx_id.clone()))
            })
            .on_update_orderers(move |event| {
                orderer_updates
                    .lock()
                    .unwrap()
                    .push(event.addresses.clone())
            })
            .on_discard_config(move |event| discarded.lock().unwrap().push(event.tx_id.clone()))
            .build()
            .start()
    };
    channel.reload_config_transactions().unwrap();

    // 1. Commit genesis with an orderer section, fail config-2 once, then commit it.
    let admins = Admins::generate(1);
    let mut genesis = genesis_config(admins.policy(1));
    genesis.channel.orderer = Some(orderer_group("OrdererOrg", &["orderer0.example.com:7050"]));
    genesis_tx(genesis.clone()).commit_to(&channel, 0).unwrap();

    let second_tx = update_tx(next_config(&genesis), &admins.first(1));
    channel.vault().fail_commit(true);
    assert!(second_tx.commit_to(&channel, 1).is_err());
    channel.vault().fail_commit(false);
    second_tx.commit_to(&channel, 1).unwrap();

    // 2. Dropping the channel lets the event bus drain.
    drop(channel);

    assert_eq!(
        *applied.lock().unwrap(),
        vec![Sequence::new(1), Sequence::new(2)]
    );
    let committed = committed.lock().unwrap();
    assert_eq!(committed.len(), 2);
    assert_eq!(committed[0].1.as_str(), "config-1");
    assert_eq!(committed[1].1.as_str(), "config-2");
    assert_eq!(orderer_updates.lock().unwrap().len(), 2);
    assert_eq!(
        orderer_updates.lock().unwrap()[0],
        vec![String::from("orderer0.example.com:7050")]
    );
    let discarded = discarded.lock().unwrap();
    assert_eq!(discarded.len(), 1);
    assert_eq!(discarded[0].as_str(), "config-2");
}
