/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable connectivity to the ordering service.
//!
//! The channel never opens connections itself. Whenever a configuration with an orderer section
//! becomes active, it tells the node's [`Network`](network::Network) provider the new list of
//! ordering endpoints, and the provider decides how to (re)connect.

pub mod network;
