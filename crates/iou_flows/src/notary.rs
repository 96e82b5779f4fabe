use std::collections::HashMap;

use async_trait::async_trait;
use iou_contract::{KeyPair, Party, SecureHash, SignedTransaction, StateRef, TransactionSignature};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::NotaryError;

/// Orders spends of IOU states and signs the transactions it accepts.
#[async_trait]
pub trait NotaryService: Send + Sync {
    fn party(&self) -> Party;

    /// Checks no input was consumed by another transaction and returns the
    /// notary signature. Notarising the same transaction twice succeeds.
    async fn notarise(&self, stx: &SignedTransaction)
        -> Result<TransactionSignature, NotaryError>;
}

/// Single process notary keeping its spent states in memory.
///
/// The spent states and the notary key live only as long as the process,
/// while node vaults may be persistent. After a restart, states spent before
/// it are no longer guarded against a second spend.
pub struct InMemoryNotary {
    keys: KeyPair,
    party: Party,
    spent: Mutex<HashMap<StateRef, SecureHash>>,
}

impl InMemoryNotary {
    pub fn new(name: impl Into<String>) -> Self {
        let keys = KeyPair::generate();
        let party = Party::new(name, keys.public_key());
        Self {
            keys,
            party,
            spent: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl NotaryService for InMemoryNotary {
    fn party(&self) -> Party {
        self.party.clone()
    }

    async fn notarise(
        &self,
        stx: &SignedTransaction,
    ) -> Result<TransactionSignature, NotaryError> {
        if stx.tx.notary != self.party {
            return Err(NotaryError::WrongNotary(stx.tx.notary.name.clone()));
        }
        stx.verify_required_signatures()?;

        let id = stx.id();
        let mut spent = self.spent.lock();
        for input in &stx.tx.inputs {
            if let Some(consumed_by) = spent.get(input).filter(|by| **by != id) {
                warn!(
                    tx_id = %id,
                    input = %input,
                    consumed_by = %consumed_by,
                    "double spend refused"
                );
                return Err(NotaryError::Conflict {
                    state_ref: *input,
                    consumed_by: *consumed_by,
                });
            }
        }
        for input in &stx.tx.inputs {
            spent.insert(*input, id);
        }
        drop(spent);

        info!(tx_id = %id, inputs = stx.tx.inputs.len(), "notarised");
        Ok(TransactionSignature::sign(&self.keys, &id))
    }
}
