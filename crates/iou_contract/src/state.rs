//! The IOU record and references to recorded versions of it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{PublicKey, SecureHash};

/// Identifier shared by every version of the same logical record.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UniqueIdentifier(Uuid);

impl UniqueIdentifier {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UniqueIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UniqueIdentifier {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for UniqueIdentifier {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for UniqueIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One version of an obligation of `borrower` towards `lender`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct IouState {
    pub value: i64,
    pub lender: PublicKey,
    pub borrower: PublicKey,
    pub linear_id: UniqueIdentifier,
}

impl IouState {
    /// New record with a fresh linear id.
    pub fn new(value: i64, lender: PublicKey, borrower: PublicKey) -> Self {
        Self {
            value,
            lender,
            borrower,
            linear_id: UniqueIdentifier::new(),
        }
    }

    /// Next version of this record carrying `value`.
    pub fn with_value(&self, value: i64) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    /// Keys entitled to see and required to sign changes to this record.
    pub fn participants(&self) -> [PublicKey; 2] {
        [self.lender, self.borrower]
    }
}

/// Points at output `index` of transaction `txhash`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateRef {
    pub txhash: SecureHash,
    pub index: u32,
}

impl StateRef {
    pub fn new(txhash: SecureHash, index: u32) -> Self {
        Self { txhash, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.txhash, self.index)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StateAndRef {
    pub state: IouState,
    #[serde(rename = "ref")]
    pub state_ref: StateRef,
}
