use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::crypto::{DigitalSignature, KeyPair, PublicKey, SecureHash};

use super::{TransactionError, WireTransaction};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionSignature {
    pub by: PublicKey,
    pub signature: DigitalSignature,
}

impl TransactionSignature {
    pub fn sign(keys: &KeyPair, id: &SecureHash) -> Self {
        Self {
            by: keys.public_key(),
            signature: keys.sign(id),
        }
    }

    pub fn is_valid(&self, id: &SecureHash) -> bool {
        self.by.verify(id, &self.signature)
    }
}

/// A wire transaction plus the signatures collected over its id so far.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: WireTransaction,
    pub sigs: Vec<TransactionSignature>,
}

impl SignedTransaction {
    pub fn id(&self) -> SecureHash {
        self.tx.id()
    }

    pub fn signers(&self) -> BTreeSet<PublicKey> {
        self.sigs.iter().map(|s| s.by).collect()
    }

    /// Adds signatures, ignoring any from a key that has already signed.
    pub fn with_additional_signatures(
        mut self,
        sigs: impl IntoIterator<Item = TransactionSignature>,
    ) -> Self {
        for sig in sigs {
            if !self.sigs.iter().any(|s| s.by == sig.by) {
                self.sigs.push(sig);
            }
        }
        self
    }

    /// Keys from the commands and the notary that have not signed yet.
    pub fn missing_signers(&self) -> BTreeSet<PublicKey> {
        let mut required = self.tx.required_signing_keys();
        required.insert(self.tx.notary.owning_key);
        let signed = self.signers();
        required.difference(&signed).copied().collect()
    }

    /// Checks every attached signature is valid and only keys in `allowed_to_be_missing`
    /// have yet to sign.
    pub fn verify_signatures_except(
        &self,
        allowed_to_be_missing: &BTreeSet<PublicKey>,
    ) -> Result<(), TransactionError> {
        let id = self.id();
        if let Some(bad) = self.sigs.iter().find(|s| !s.is_valid(&id)) {
            return Err(TransactionError::InvalidSignature(bad.by));
        }

        let missing: Vec<_> = self
            .missing_signers()
            .difference(allowed_to_be_missing)
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TransactionError::MissingSignatures(missing))
        }
    }

    /// Everything but the notary signature must be present.
    pub fn verify_required_signatures(&self) -> Result<(), TransactionError> {
        self.verify_signatures_except(&BTreeSet::from([self.tx.notary.owning_key]))
    }

    pub fn verify_signatures(&self) -> Result<(), TransactionError> {
        self.verify_signatures_except(&BTreeSet::new())
    }
}
