/*
    Copyright © 2024, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Composite keys and the reserved location of configuration entries.
//!
//! A composite key is formed from an object type and a list of attributes:
//!
//! ```text
//! "\u{0}" + object_type + "\u{0}" + attribute_0 + "\u{0}" + ... + attribute_n + "\u{0}"
//! ```
//!
//! Neither the object type nor any attribute may contain `U+0000` or `U+10FFFF`.

use std::fmt::{self, Display, Formatter};

use crate::types::data_types::Sequence;

/// Internal namespace that holds configuration entries. Application transactions cannot address it.
pub const CONFIGTX_NAMESPACE: &str = "_configtx";

/// Object type of the composite keys under which raw configuration envelopes are stored.
pub const CHANNEL_CONFIG_KEY: &str = "CHANNEL_CONFIG_ENV_BYTES";

const COMPOSITE_KEY_NAMESPACE: char = '\u{0}';
const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Form a composite key out of `object_type` and `attributes`.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> Result<String, KeyError> {
    validate_composite_key_attribute(object_type)?;
    let mut key = String::new();
    key.push(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_NAMESPACE);
    for attribute in attributes {
        validate_composite_key_attribute(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_NAMESPACE);
    }
    Ok(key)
}

/// Key, inside [`CONFIGTX_NAMESPACE`], of the raw envelope of the configuration at `sequence`.
pub fn config_entry_key(sequence: Sequence) -> Result<String, KeyError> {
    create_composite_key(CHANNEL_CONFIG_KEY, &[&sequence.int().to_string()])
}

fn validate_composite_key_attribute(attribute: &str) -> Result<(), KeyError> {
    if let Some(forbidden) = attribute
        .chars()
        .find(|c| *c == COMPOSITE_KEY_NAMESPACE || *c == MAX_UNICODE_RUNE)
    {
        return Err(KeyError::InvalidAttribute {
            attribute: attribute.to_string(),
            forbidden,
        });
    }
    Ok(())
}

/// Error when forming a composite key.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyError {
    InvalidAttribute { attribute: String, forbidden: char },
}

impl Display for KeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::InvalidAttribute {
                attribute,
                forbidden,
            } => write!(
                f,
                "input contains unicode {:#x} starting at position [{}]. {:#x} and {:#x} are not allowed in the input attribute of a composite key",
                *forbidden as u32,
                attribute.find(*forbidden).unwrap_or_default(),
                COMPOSITE_KEY_NAMESPACE as u32,
                MAX_UNICODE_RUNE as u32
            ),
        }
    }
}

impl std::error::Error for KeyError {}
