use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::state::UniqueIdentifier;

/// A node on the network, identified by name and its node-level key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Party {
    pub name: String,
    pub owning_key: PublicKey,
}

impl Party {
    pub fn new(name: impl Into<String>, owning_key: PublicKey) -> Self {
        Self {
            name: name.into(),
            owning_key,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A logical account hosted by a node.
///
/// Several accounts may share one host. Each account signs with its own
/// dedicated key, which is what ends up as lender or borrower on an IOU.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub name: String,
    pub host: Party,
    pub identifier: UniqueIdentifier,
    pub key: PublicKey,
}

impl AccountInfo {
    pub fn new(name: impl Into<String>, host: Party, key: PublicKey) -> Self {
        Self {
            name: name.into(),
            host,
            identifier: UniqueIdentifier::new(),
            key,
        }
    }
}
