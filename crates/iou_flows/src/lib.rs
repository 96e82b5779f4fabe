//! Multi-party protocols that create and amend IOUs between accounts.
//!
//! A [`Node`] hosts any number of accounts. Flows started on a node build a
//! transaction, sign it with the account keys the node holds, collect the
//! remaining signatures from the hosts of the other accounts over
//! [`Session`]s, notarise it and have every participant record it.
pub mod directory;
pub mod error;
pub mod flows;
pub mod network;
pub mod node;
pub mod notary;
pub mod progress;

use std::time::Duration;

pub use directory::AccountDirectory;
pub use error::{FlowError, NotaryError, SessionError};
pub use flows::FlowKind;
pub use network::{
    MessageHandler, Messaging, MockNetwork, Rejection, Session, SessionMessage, SessionReply,
};
pub use node::Node;
pub use notary::{InMemoryNotary, NotaryService};
pub use progress::{ProgressTracker, Step};

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Config {
    /// How long a flow waits for a counterparty before giving up.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    /// How long a countersigned transaction is remembered while its
    /// finalised version has not arrived.
    #[serde(default = "default_finality_window_ms")]
    pub finality_window_ms: u64,
}

fn default_session_timeout_ms() -> u64 {
    10_000
}

fn default_finality_window_ms() -> u64 {
    60_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_timeout_ms: default_session_timeout_ms(),
            finality_window_ms: default_finality_window_ms(),
        }
    }
}

impl Config {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn finality_window(&self) -> Duration {
        Duration::from_millis(self.finality_window_ms)
    }
}
