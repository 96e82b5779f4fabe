use iou_contract::SignedTransaction;
use tracing::{info, warn};

use crate::{FlowError, Node, Session};

/// Notarises a fully signed transaction, records it on `node` and hands it
/// to every counterparty in `sessions` to record as well.
pub async fn finalise(
    node: &Node,
    stx: SignedTransaction,
    sessions: &[Session],
) -> Result<SignedTransaction, FlowError> {
    stx.verify_required_signatures()?;
    let notary_sig = match node.notary().notarise(&stx).await {
        Ok(sig) => sig,
        Err(e) => {
            abandon(node, &stx, sessions).await;
            return Err(e.into());
        }
    };
    let stx = stx.with_additional_signatures([notary_sig]);
    stx.verify_signatures()?;

    node.record(&stx)?;
    for session in sessions {
        session.send_finality(&stx).await?;
    }
    info!(
        node = node.name(),
        tx_id = %stx.id(),
        counterparties = sessions.len(),
        "transaction finalised"
    );
    Ok(stx)
}

/// Releases counterparties from a transaction that will never be finalised.
async fn abandon(node: &Node, stx: &SignedTransaction, sessions: &[Session]) {
    let id = stx.id();
    for session in sessions {
        if let Err(e) = session.abandon(&id).await {
            warn!(
                node = node.name(),
                tx_id = %id,
                counterparty = %session.counterparty(),
                error = %e,
                "could not abandon transaction"
            );
        }
    }
}
