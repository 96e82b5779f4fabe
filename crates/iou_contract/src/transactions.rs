pub mod builder;
pub mod signed;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::contract::{ContractViolation, IouContract};
use crate::crypto::{PublicKey, SecureHash};
use crate::identity::Party;
use crate::state::{IouState, StateAndRef, StateRef};

pub use builder::TransactionBuilder;
pub use signed::{SignedTransaction, TransactionSignature};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("missing signatures from: {}", display_keys(.0))]
    MissingSignatures(Vec<PublicKey>),

    #[error("invalid signature by {0}")]
    InvalidSignature(PublicKey),

    #[error("unable to resolve input state {0}")]
    UnresolvedInput(StateRef),

    #[error("transaction has no output at index {0}")]
    MissingOutput(u32),
}

fn display_keys(keys: &[PublicKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Intent of an IOU transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Commands {
    Create,
    Amend,
}

impl Commands {
    fn tag(&self) -> u8 {
        match self {
            Commands::Create => 0,
            Commands::Amend => 1,
        }
    }
}

/// A command together with the keys that must sign for it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub value: Commands,
    pub signers: BTreeSet<PublicKey>,
}

impl Command {
    pub fn new(value: Commands, signers: impl IntoIterator<Item = PublicKey>) -> Self {
        Self {
            value,
            signers: signers.into_iter().collect(),
        }
    }
}

/// The unsigned content of a transaction. Its hash is the transaction id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct WireTransaction {
    pub inputs: Vec<StateRef>,
    pub outputs: Vec<IouState>,
    pub commands: Vec<Command>,
    pub notary: Party,
}

impl WireTransaction {
    pub fn id(&self) -> SecureHash {
        let mut hasher = Sha256::new();
        hasher.update((self.inputs.len() as u32).to_be_bytes());
        for input in &self.inputs {
            hasher.update(input.txhash.as_bytes());
            hasher.update(input.index.to_be_bytes());
        }
        hasher.update((self.outputs.len() as u32).to_be_bytes());
        for output in &self.outputs {
            hasher.update(output.value.to_be_bytes());
            hasher.update(output.lender.as_bytes());
            hasher.update(output.borrower.as_bytes());
            hasher.update(output.linear_id.uuid().as_bytes());
        }
        hasher.update((self.commands.len() as u32).to_be_bytes());
        for command in &self.commands {
            hasher.update([command.value.tag()]);
            hasher.update((command.signers.len() as u32).to_be_bytes());
            for signer in &command.signers {
                hasher.update(signer.as_bytes());
            }
        }
        hasher.update((self.notary.name.len() as u32).to_be_bytes());
        hasher.update(self.notary.name.as_bytes());
        hasher.update(self.notary.owning_key.as_bytes());

        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        SecureHash::from(digest)
    }

    /// Union of the signers of every command.
    pub fn required_signing_keys(&self) -> BTreeSet<PublicKey> {
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect()
    }

    pub fn out_ref(&self, index: u32) -> Result<StateAndRef, TransactionError> {
        let state = self
            .outputs
            .get(index as usize)
            .ok_or(TransactionError::MissingOutput(index))?
            .clone();
        Ok(StateAndRef {
            state,
            state_ref: StateRef::new(self.id(), index),
        })
    }

    /// Resolves every input through `lookup`, producing a transaction the contract can verify.
    pub fn resolve<F>(&self, mut lookup: F) -> Result<LedgerTransaction, TransactionError>
    where
        F: FnMut(&StateRef) -> Option<IouState>,
    {
        let inputs = self
            .inputs
            .iter()
            .map(|state_ref| {
                lookup(state_ref)
                    .map(|state| StateAndRef {
                        state,
                        state_ref: *state_ref,
                    })
                    .ok_or(TransactionError::UnresolvedInput(*state_ref))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LedgerTransaction {
            id: self.id(),
            inputs,
            outputs: self.outputs.clone(),
            commands: self.commands.clone(),
            notary: self.notary.clone(),
        })
    }
}

/// A transaction with its inputs resolved to the states they consume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub id: SecureHash,
    pub inputs: Vec<StateAndRef>,
    pub outputs: Vec<IouState>,
    pub commands: Vec<Command>,
    pub notary: Party,
}

impl LedgerTransaction {
    pub fn verify(&self) -> Result<(), ContractViolation> {
        IouContract::verify(self)
    }

    pub fn input_states(&self) -> impl Iterator<Item = &IouState> {
        self.inputs.iter().map(|i| &i.state)
    }
}
