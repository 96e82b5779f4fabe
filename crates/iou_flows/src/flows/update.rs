use iou_contract::{Command, Commands, SignedTransaction, TransactionBuilder, UniqueIdentifier};
use iou_store::StateStatus;

use super::finality::finalise;
use super::signing::{SignatureCollector, SigningPlan};
use crate::progress::{ProgressTracker, Step};
use crate::{AccountDirectory, FlowError, FlowKind, Node};

/// Amends the current version of IOU `linear_id` to `new_value`.
///
/// Runs on the borrower's host. When the lender lives on the same node no
/// counterparty is involved; otherwise the lender's host is asked to sign
/// and may refuse under its acceptance policy.
pub async fn update_iou(
    node: &Node,
    linear_id: &UniqueIdentifier,
    new_value: i64,
) -> Result<SignedTransaction, FlowError> {
    let mut progress = ProgressTracker::start(node.store(), FlowKind::Update)?;
    let result = run(node, &mut progress, linear_id, new_value).await;
    progress.close(&result);
    result
}

async fn run(
    node: &Node,
    progress: &mut ProgressTracker,
    linear_id: &UniqueIdentifier,
    new_value: i64,
) -> Result<SignedTransaction, FlowError> {
    let mut current = node.iou(linear_id, StateStatus::Unconsumed)?;
    let input = match current.len() {
        0 => return Err(FlowError::StateNotFound(*linear_id)),
        1 => current.remove(0).state_and_ref,
        count => {
            return Err(FlowError::AmbiguousState {
                linear_id: *linear_id,
                count,
            })
        }
    };

    progress.set_step(Step::Building)?;
    let borrower = node.require_account_by_key(&input.state.borrower)?;
    if !node.is_hosted_locally(&borrower)? {
        return Err(FlowError::NotHostedLocally(borrower.name));
    }
    let lender = node.require_account_by_key(&input.state.lender)?;
    let output = input.state.with_value(new_value);
    let builder = TransactionBuilder::new(node.notary().party())
        .add_input_state(input)
        .add_output_state(output.clone())
        .add_command(Command::new(Commands::Amend, output.participants()));
    builder.verify()?;

    progress.set_step(Step::Signing)?;
    let plan = SigningPlan::for_accounts(node, FlowKind::Update, &[&lender, &borrower])?;
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
