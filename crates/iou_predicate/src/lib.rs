//! Discretionary acceptance rules a node applies before countersigning.
//!
//! The IOU contract decides whether a transaction is *valid*. A node may still
//! refuse to sign a valid transaction for its own reasons, for example because
//! the amount is larger than it is willing to be party to. Those reasons are
//! expressed as predicates, loaded from TOML files named in the node config:
//!
//! ```toml
//! type = "or"
//! conditions = [
//!     { type = "max_value", max = 100 },
//!     { type = "whitelist", kind = "lender", accounts = ["Bank1"] },
//! ]
//! ```

pub mod context;
pub mod predicates;

use std::path::PathBuf;

pub use context::{ContextProvider, PredicateContext, Proposal};
pub use predicates::{AcceptancePolicy, Predicate, Refusal};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Predicate deserialization failed due to: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Failed to load predicate from file '{path}'")]
    LoadFromFile {
        source: std::io::Error,
        path: String,
    },
}

#[derive(serde::Deserialize, Debug, Default)]
pub struct Config {
    /// Path to enabled predicate configuration files
    #[serde(default)]
    pub predicates: Vec<PathBuf>,
}
