use iou_contract::{
    Command, Commands, IouState, SignedTransaction, TransactionBuilder, UniqueIdentifier,
};

use super::finality::finalise;
use super::signing::{SignatureCollector, SigningPlan};
use crate::progress::{ProgressTracker, Step};
use crate::{AccountDirectory, FlowError, FlowKind, Node};

/// Issues an IOU of `value` owed by `borrower` to `lender`.
///
/// At least one of the two accounts must be hosted by `node`. The host of
/// the other account checks the proposal and signs it before notarisation.
pub async fn create_iou(
    node: &Node,
    value: i64,
    lender: &UniqueIdentifier,
    borrower: &UniqueIdentifier,
) -> Result<SignedTransaction, FlowError> {
    let mut progress = ProgressTracker::start(node.store(), FlowKind::Create)?;
    let result = run(node, &mut progress, value, lender, borrower).await;
    progress.close(&result);
    result
}

async fn run(
    node: &Node,
    progress: &mut ProgressTracker,
    value: i64,
    lender: &UniqueIdentifier,
    borrower: &UniqueIdentifier,
) -> Result<SignedTransaction, FlowError> {
    progress.set_step(Step::Building)?;
    let lender = node.require_account(lender)?;
    let borrower = node.require_account(borrower)?;
    let state = IouState::new(value, lender.key, borrower.key);
    let builder = TransactionBuilder::new(node.notary().party())
        .add_output_state(state.clone())
        .add_command(Command::new(Commands::Create, state.participants()));
    builder.verify()?;

    progress.set_step(Step::Signing)?;
    let plan = SigningPlan::for_accounts(node, FlowKind::Create, &[&lender, &borrower])?;
    let unsigned = SignedTransaction {
        tx: builder.to_wire_transaction(),
        sigs: vec![],
    };
    progress.set_tx_id(&unsigned.id())?;
    let mut stx = plan.local.collect(unsigned).await?;

    progress.set_step(Step::Collecting)?;
    for signer in &plan.remote {
        stx = signer.collect(stx).await?;
    }

    progress.set_step(Step::Finalising)?;
    let stx = finalise(node, stx, &plan.sessions()).await?;

    progress.set_step(Step::Done)?;
    Ok(stx)
}
