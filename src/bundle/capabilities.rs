/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Capabilities: named, versioned feature flags that a node must explicitly support before it may
//! process a configuration that requires them.
//!
//! A configuration lists required capabilities at two levels, the channel level and the application
//! level. A node that does not recognize a required capability name must refuse the configuration
//! rather than guess at its meaning.

use std::{
    collections::BTreeSet,
    fmt::{self, Display, Formatter},
};

/// Channel-level capabilities supported by this build.
pub const SUPPORTED_CHANNEL_CAPABILITIES: [&str; 5] = ["V3_0", "V2_0", "V1_4_3", "V1_4_2", "V1_3"];

/// Application-level capabilities supported by this build.
pub const SUPPORTED_APPLICATION_CAPABILITIES: [&str; 6] =
    ["V2_5", "V2_0", "V1_4_2", "V1_3", "V1_2", "V1_1"];

/// A set of required capabilities that can report whether this node supports all of them.
pub trait Capabilities {
    /// The capability names the configuration requires.
    fn required(&self) -> &BTreeSet<String>;

    /// Check that every required capability is supported by this node.
    fn supported(&self) -> Result<(), CapabilityError>;
}

/// The level of the configuration tree a capability set was declared at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityLevel {
    Channel,
    Application,
}

impl CapabilityLevel {
    fn supported_names(&self) -> &'static [&'static str] {
        match self {
            CapabilityLevel::Channel => &SUPPORTED_CHANNEL_CAPABILITIES,
            CapabilityLevel::Application => &SUPPORTED_APPLICATION_CAPABILITIES,
        }
    }
}

impl Display for CapabilityLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityLevel::Channel => write!(f, "Channel"),
            CapabilityLevel::Application => write!(f, "Application"),
        }
    }
}

/// Capabilities required at one [`CapabilityLevel`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySet {
    level: CapabilityLevel,
    required: BTreeSet<String>,
}

impl CapabilitySet {
    pub fn new(level: CapabilityLevel, required: BTreeSet<String>) -> Self {
        Self { level, required }
    }

    pub fn level(&self) -> CapabilityLevel {
        self.level
    }
}

impl Capabilities for CapabilitySet {
    fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    fn supported(&self) -> Result<(), CapabilityError> {
        let supported = self.level.supported_names();
        let unsupported: Vec<String> = self
            .required
            .iter()
            .filter(|name| !supported.contains(&name.as_str()))
            .cloned()
            .collect();

        if unsupported.is_empty() {
            Ok(())
        } else {
            Err(CapabilityError::Unsupported {
                level: self.level,
                names: unsupported,
            })
        }
    }
}

/// Error when a configuration requires capabilities this node does not support.
#[derive(Debug, PartialEq, Eq)]
pub enum CapabilityError {
    Unsupported {
        level: CapabilityLevel,
        names: Vec<String>,
    },
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityError::Unsupported { level, names } => write!(
                f,
                "{} capabilities not supported by this node: [{}]",
                level,
                names.join(", ")
            ),
        }
    }
}

impl std::error::Error for CapabilityError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn known_capabilities_are_supported() {
        let channel = CapabilitySet::new(CapabilityLevel::Channel, names(&["V2_0", "V1_3"]));
        assert_eq!(channel.supported(), Ok(()));

        let application = CapabilitySet::new(CapabilityLevel::Application, BTreeSet::new());
        assert_eq!(application.supported(), Ok(()));
    }

    #[test]
    fn every_unknown_capability_is_reported() {
        let application = CapabilitySet::new(
            CapabilityLevel::Application,
            names(&["V2_0", "V9_9", "V3_0"]),
        );
        assert_eq!(
            application.supported(),
            Err(CapabilityError::Unsupported {
                level: CapabilityLevel::Application,
                names: vec!["V3_0".to_string(), "V9_9".to_string()],
            })
        );
    }
}
