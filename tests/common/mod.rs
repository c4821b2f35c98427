pub(crate) mod configtx;

pub(crate) mod faulty_vault;

pub(crate) mod logging;

pub(crate) mod mem_db;

pub(crate) mod network;
