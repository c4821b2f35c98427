use std::sync::{
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};

use configtx_rs::networking::network::{ConnectionConfig, Network};

/// A network stub that records every list of ordering endpoints it is given.
#[derive(Clone)]
pub(crate) struct RecordingNetwork {
    updates: Arc<Mutex<Vec<Vec<ConnectionConfig>>>>,
}

impl RecordingNetwork {
    pub(crate) fn new() -> RecordingNetwork {
        RecordingNetwork {
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every endpoint list received so far, oldest first.
    pub(crate) fn updates(&self) -> Vec<Vec<ConnectionConfig>> {
        self.updates.lock().unwrap().clone()
    }
}

impl Network for RecordingNetwork {
    fn set_config_orderers(&mut self, orderers: Vec<ConnectionConfig>) {
        self.updates.lock().unwrap().push(orderers);
    }
}

/// A network stub whose every `set_config_orderers` call announces itself on `entered` and then
/// blocks until the test sends on the release channel, like a connection pool that takes a long
/// time to reconnect.
#[derive(Clone)]
pub(crate) struct GatedNetwork {
    entered: Sender<Vec<ConnectionConfig>>,
    release: Arc<Mutex<Receiver<()>>>,
}

impl GatedNetwork {
    /// Returns the network, a receiver of the lists it is given, and the sender that lets each
    /// blocked call return.
    pub(crate) fn new() -> (GatedNetwork, Receiver<Vec<ConnectionConfig>>, Sender<()>) {
        let (entered, entered_receiver) = mpsc::channel();
        let (release_sender, release) = mpsc::channel();
        (
            GatedNetwork {
                entered,
                release: Arc::new(Mutex::new(release)),
            },
            entered_receiver,
            release_sender,
        )
    }
}

impl Network for GatedNetwork {
    fn set_config_orderers(&mut self, orderers: Vec<ConnectionConfig>) {
        self.entered.send(orderers).unwrap();
        self.release.lock().unwrap().recv().unwrap();
    }
}
