//! Validation rules every party runs before trusting an IOU transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::transactions::{Command, Commands, LedgerTransaction};

/// Reasons a transaction is rejected by [`IouContract`].
///
/// The messages are stable: callers and the HTTP API surface them verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractViolation {
    #[error("A single IOU command is required.")]
    MissingCommand,

    #[error("No inputs should be consumed when issuing an IOU.")]
    CreateConsumesInputs,

    #[error("Only one input state should be consumed when amending an IOU.")]
    AmendInputCount,

    #[error("Only one output state should be created.")]
    OutputCount,

    #[error("The lender and the borrower cannot be the same entity.")]
    LenderIsBorrower,

    #[error("All of the participants must be signers.")]
    MissingSigners,

    #[error("The IOU's value must be non-negative.")]
    NegativeValue,

    #[error("The linear ID must not change when amending an IOU.")]
    LinearIdChanged,

    #[error("The lender and the borrower cannot change when amending an IOU.")]
    PartiesChanged,
}

fn require(condition: bool, violation: ContractViolation) -> Result<(), ContractViolation> {
    if condition {
        Ok(())
    } else {
        Err(violation)
    }
}

pub struct IouContract;

impl IouContract {
    pub fn verify(tx: &LedgerTransaction) -> Result<(), ContractViolation> {
        let command = match tx.commands.as_slice() {
            [command] => command,
            _ => return Err(ContractViolation::MissingCommand),
        };

        let result = match command.value {
            Commands::Create => verify_create(tx, command),
            Commands::Amend => verify_amend(tx, command),
        };
        if let Err(violation) = &result {
            debug!(
                tx_id = %tx.id,
                command = ?command.value,
                %violation,
                "contract rejected transaction"
            );
        }
        result
    }
}

fn verify_create(tx: &LedgerTransaction, command: &Command) -> Result<(), ContractViolation> {
    require(tx.inputs.is_empty(), ContractViolation::CreateConsumesInputs)?;
    let out = match tx.outputs.as_slice() {
        [out] => out,
        _ => return Err(ContractViolation::OutputCount),
    };
    require(out.lender != out.borrower, ContractViolation::LenderIsBorrower)?;
    require(
        out.participants().iter().all(|p| command.signers.contains(p)),
        ContractViolation::MissingSigners,
    )?;
    require(out.value >= 0, ContractViolation::NegativeValue)
}

// Signers must cover the participants of both versions.
fn verify_amend(tx: &LedgerTransaction, command: &Command) -> Result<(), ContractViolation> {
    let input = match tx.inputs.as_slice() {
        [input] => &input.state,
        _ => return Err(ContractViolation::AmendInputCount),
    };
    let out = match tx.outputs.as_slice() {
        [out] => out,
        _ => return Err(ContractViolation::OutputCount),
    };
    require(
        input.linear_id == out.linear_id,
        ContractViolation::LinearIdChanged,
    )?;
    require(
        input.lender == out.lender && input.borrower == out.borrower,
        ContractViolation::PartiesChanged,
    )?;
    require(out.value >= 0, ContractViolation::NegativeValue)?;
    require(
        input
            .participants()
            .iter()
            .chain(out.participants().iter())
            .all(|p| command.signers.contains(p)),
        ContractViolation::MissingSigners,
    )
}
