use crate::contract::ContractViolation;
use crate::crypto::KeyPair;
use crate::identity::Party;
use crate::state::{IouState, StateAndRef};

use super::{Command, LedgerTransaction, SignedTransaction, TransactionSignature, WireTransaction};

/// Accumulates inputs, outputs and commands for a proposed transaction.
///
/// Inputs are kept resolved, so the builder can run the contract before
/// anything is signed.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    notary: Party,
    inputs: Vec<StateAndRef>,
    outputs: Vec<IouState>,
    commands: Vec<Command>,
}

impl TransactionBuilder {
    pub fn new(notary: Party) -> Self {
        Self {
            notary,
            inputs: vec![],
            outputs: vec![],
            commands: vec![],
        }
    }

    pub fn add_input_state(mut self, input: StateAndRef) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn add_output_state(mut self, output: IouState) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn add_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn to_wire_transaction(&self) -> WireTransaction {
        WireTransaction {
            inputs: self.inputs.iter().map(|i| i.state_ref).collect(),
            outputs: self.outputs.clone(),
            commands: self.commands.clone(),
            notary: self.notary.clone(),
        }
    }

    pub fn to_ledger_transaction(&self) -> LedgerTransaction {
        let wtx = self.to_wire_transaction();
        LedgerTransaction {
            id: wtx.id(),
            inputs: self.inputs.clone(),
            outputs: wtx.outputs,
            commands: wtx.commands,
            notary: wtx.notary,
        }
    }

    pub fn verify(&self) -> Result<(), ContractViolation> {
        self.to_ledger_transaction().verify()
    }

    /// Signs the transaction with each of `keys`.
    pub fn sign_with<'a>(&self, keys: impl IntoIterator<Item = &'a KeyPair>) -> SignedTransaction {
        let tx = self.to_wire_transaction();
        let id = tx.id();
        let sigs = keys
            .into_iter()
            .map(|k| TransactionSignature::sign(k, &id))
            .collect();
        SignedTransaction { tx, sigs }
    }
}
