/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that are used across multiple components of the configuration committer.
//!
//! Types specific to single components can be found next to those components, e.g., the
//! [vault contract](crate::vault::pluggables) or the [bundle](crate::bundle).

pub mod config;

pub mod crypto_primitives;

pub mod data_types;

pub mod envelope;
