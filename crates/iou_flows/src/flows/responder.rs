//! Counterparty side of the flows.
//!
//! A signature request is only answered with signatures once the responder
//! has resolved the inputs itself, run the contract, checked the signatures
//! already attached and, for amendments, applied its acceptance policy.
use std::collections::BTreeSet;

use iou_contract::{
    AccountInfo, Commands, IouContract, LedgerTransaction, Party, PublicKey, SignedTransaction,
    TransactionSignature,
};
use iou_predicate::{ContextProvider, PredicateContext, Proposal};
use iou_store::IouStore;
use tracing::{info, warn};

use crate::{FlowError, FlowKind, Node, SessionError, SessionMessage, SessionReply};

pub(crate) async fn respond(node: &Node, from: &Party, message: SessionMessage) -> SessionReply {
    let result = match message {
        SessionMessage::SignatureRequest { flow, transaction } => {
            sign(node, from, flow, &transaction).map(SessionReply::Signatures)
        }
        SessionMessage::Finality { transaction } => {
            record(node, from, &transaction).map(|_| SessionReply::Recorded)
        }
        SessionMessage::Abandon { tx_id } => {
            if node.take_expected(from, &tx_id) {
                info!(node = node.name(), from = %from, %tx_id, "signed proposal abandoned");
            }
            Ok(SessionReply::Ack)
        }
        SessionMessage::ShareAccount { account } => {
            share_account(node, from, &account).map(|_| SessionReply::Ack)
        }
    };
    result.unwrap_or_else(|e| {
        warn!(node = node.name(), from = %from, error = %e, "request rejected");
        SessionReply::Rejected(e.into())
    })
}

fn sign(
    node: &Node,
    from: &Party,
    flow: FlowKind,
    stx: &SignedTransaction,
) -> Result<Vec<TransactionSignature>, FlowError> {
    let notary = node.notary().party();
    if stx.tx.notary != notary {
        return Err(FlowError::UnknownParty(stx.tx.notary.name.clone()));
    }

    let ltx = node.resolve(stx)?;
    IouContract::verify(&ltx)?;

    let keys = node.signing_keys(&stx.tx.required_signing_keys())?;
    if keys.is_empty() {
        return Err(FlowError::NotHostedLocally(
            "any of the required signers".to_owned(),
        ));
    }
    let mut allowed_missing: BTreeSet<PublicKey> = keys.iter().map(|k| k.public_key()).collect();
    allowed_missing.insert(notary.owning_key);
    stx.verify_signatures_except(&allowed_missing)?;

    if ltx.commands.iter().any(|c| c.value == Commands::Amend) {
        check_policy(node, &ltx)?;
    }

    let id = stx.id();
    node.expect_finality(from, id);
    info!(
        node = node.name(),
        from = %from,
        flow = flow.name(),
        tx_id = %id,
        keys = keys.len(),
        "signed proposal"
    );
    Ok(keys
        .iter()
        .map(|k| TransactionSignature::sign(k, &id))
        .collect())
}

fn check_policy(node: &Node, ltx: &LedgerTransaction) -> Result<(), FlowError> {
    let refused = |reason: String| FlowError::Refused {
        party: node.name().to_owned(),
        reason,
    };
    for output in &ltx.outputs {
        let previous = ltx
            .input_states()
            .find(|s| s.linear_id == output.linear_id);
        let context = PredicateContext {
            proposal: Proposal {
                value: output.value,
                previous_value: previous.map(|s| s.value),
                lender: output.lender.to_string(),
                borrower: output.borrower.to_string(),
            },
            provider: VaultAccounts(node.store()),
        };
        node.policy()
            .check(&context)
            .map_err(|refusal| refused(refusal.reason))?;
    }
    Ok(())
}

/// Resolves account keys to names through the vault.
struct VaultAccounts<'a>(&'a IouStore);

impl ContextProvider for VaultAccounts<'_> {
    fn account_name(&self, key: &str) -> Option<String> {
        let key: PublicKey = key.parse().ok()?;
        self.0
            .accounts()
            .by_key(&key)
            .ok()
            .flatten()
            .map(|a| a.name)
    }
}

fn record(node: &Node, from: &Party, stx: &SignedTransaction) -> Result<(), FlowError> {
    let id = stx.id();
    if !node.take_expected(from, &id) {
        return Err(SessionError::UnexpectedTransaction(id).into());
    }
    stx.verify_signatures()?;
    IouContract::verify(&node.resolve(stx)?)?;
    node.record(stx)?;
    Ok(())
}

fn share_account(node: &Node, from: &Party, account: &AccountInfo) -> Result<(), FlowError> {
    if account.host.name != from.name {
        return Err(FlowError::Refused {
            party: node.name().to_owned(),
            reason: format!("{} does not host account {}", from.name, account.name),
        });
    }
    node.store().accounts().add(account)?;
    info!(node = node.name(), account = %account.name, host = %from, "account received");
    Ok(())
}
