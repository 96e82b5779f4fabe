//! IOU states, transactions and the contract that validates them.
//!
//! An IOU is a jointly owned record of `borrower` owing `value` to `lender`.
//! It is created by a transaction carrying a [`Commands::Create`] command and
//! amended by consuming the current version under [`Commands::Amend`]. Every
//! party that is asked to sign, and every node that records the result, runs
//! [`IouContract::verify`] over the resolved transaction first.

pub mod contract;
pub mod crypto;
pub mod identity;
pub mod state;
#[cfg(test)]
pub(crate) mod test_util;
pub mod transactions;

pub use contract::{ContractViolation, IouContract};
pub use crypto::{CryptoError, DigitalSignature, KeyPair, PublicKey, SecureHash};
pub use identity::{AccountInfo, Party};
pub use state::{IouState, StateAndRef, StateRef, UniqueIdentifier};
pub use transactions::{
    Command, Commands, LedgerTransaction, SignedTransaction, TransactionBuilder, TransactionError,
    TransactionSignature, WireTransaction,
};
