mod common;

use std::collections::BTreeSet;

use common::{account, signing_key, unconsumed, TestNetwork};
use iou_contract::{
    Command, Commands, ContractViolation, SignedTransaction, TransactionBuilder, UniqueIdentifier,
};
use iou_flows::flows::finality::finalise;
use iou_flows::progress::STATUS_STALLED;
use iou_flows::{Config, FlowError, FlowKind, NotaryService, SessionError};
use iou_predicate::AcceptancePolicy;
use iou_store::StateStatus;

#[tokio::test]
async fn test_create_on_one_node() {
    let net = TestNetwork::new();
    let bank = net.node("Bank");
    let bank1 = account(&bank, "Bank1", &[]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;

    let stx = bank
        .create_iou(1, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap();

    let ious = unconsumed(&bank);
    assert_eq!(ious.len(), 1);
    let iou = &ious[0].state_and_ref;
    assert_eq!(iou.state.value, 1);
    assert_eq!(iou.state.lender, bank1.key);
    assert_eq!(iou.state.borrower, bank2.key);
    assert_eq!(iou.state_ref.txhash, stx.id());
    assert!(stx.verify_signatures().is_ok());
    assert!(bank.checkpoints().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_across_nodes() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;

    bank.create_iou(2, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();

    let (on_bank, on_agent) = (unconsumed(&bank), unconsumed(&agent));
    assert_eq!(on_bank.len(), 1);
    assert_eq!(on_agent.len(), 1);
    assert_eq!(on_bank[0].state_and_ref.state.value, 2);
    assert_eq!(on_bank[0].state_and_ref, on_agent[0].state_and_ref);
    assert!(bank.checkpoints().unwrap().is_empty());
}

#[tokio::test]
async fn test_negative_value_is_rejected() {
    let net = TestNetwork::new();
    let bank = net.node("Bank");
    let bank1 = account(&bank, "Bank1", &[]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;

    let err = bank
        .create_iou(-1, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "The IOU's value must be non-negative.");
    assert!(unconsumed(&bank).is_empty());
    assert!(bank.checkpoints().unwrap().is_empty());
}

#[tokio::test]
async fn test_lender_cannot_be_borrower() {
    let net = TestNetwork::new();
    let bank = net.node("Bank");
    let bank1 = account(&bank, "Bank1", &[]).await;

    let err = bank
        .create_iou(1, &bank1.identifier, &bank1.identifier)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::Contract(ContractViolation::LenderIsBorrower)
    ));
}

#[tokio::test]
async fn test_update_on_one_node() {
    let net = TestNetwork::new();
    let bank = net.node("Bank");
    let bank1 = account(&bank, "Bank1", &[]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap();
    let linear_id = created.tx.outputs[0].linear_id;

    bank.update_iou(&linear_id, 5).await.unwrap();

    let current = bank.iou(&linear_id, StateStatus::Unconsumed).unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].state_and_ref.state.value, 5);
    assert!(unconsumed(&bank)
        .iter()
        .all(|i| i.state_and_ref.state.value != 1));
    assert_eq!(bank.iou(&linear_id, StateStatus::All).unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_across_nodes() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();
    let linear_id = created.tx.outputs[0].linear_id;

    let updated = agent.update_iou(&linear_id, 5).await.unwrap();

    for node in [&bank, &agent] {
        let current = node.iou(&linear_id, StateStatus::Unconsumed).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].state_and_ref.state.value, 5);
        assert_eq!(current[0].state_and_ref.state_ref.txhash, updated.id());

        let consumed = node.iou(&linear_id, StateStatus::Consumed).unwrap();
        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[0].state_and_ref.state.value, 1);
        assert_eq!(consumed[0].consumed_by, Some(updated.id()));
    }
}

#[tokio::test]
async fn test_lender_refuses_large_update() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();
    let linear_id = created.tx.outputs[0].linear_id;

    let err = agent.update_iou(&linear_id, 150).await.unwrap_err();
    assert_eq!(err.reason(), "IOUs with a value over 100 are not accepted.");
    assert!(matches!(&err, FlowError::Refused { party, .. } if party == "Bank"));

    for node in [&bank, &agent] {
        let current = node.iou(&linear_id, StateStatus::All).unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].state_and_ref.state.value, 1);
        assert_eq!(node.store().transactions().count().unwrap(), 1);
    }
    assert!(agent.checkpoints().unwrap().is_empty());
}

#[tokio::test]
async fn test_same_node_and_cross_node_paths_agree() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;

    let local = bank
        .create_iou(7, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap();
    let remote = bank
        .create_iou(7, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();

    let shape = |stx: &SignedTransaction| {
        (
            stx.tx.inputs.len(),
            stx.tx.outputs.len(),
            stx.tx.outputs[0].value,
            stx.tx.commands.iter().map(|c| c.value).collect::<Vec<_>>(),
            stx.sigs.len(),
            stx.missing_signers().is_empty(),
        )
    };
    assert_eq!(shape(&local), shape(&remote));

    let local = bank
        .update_iou(&local.tx.outputs[0].linear_id, 9)
        .await
        .unwrap();
    let remote = agent
        .update_iou(&remote.tx.outputs[0].linear_id, 9)
        .await
        .unwrap();
    assert_eq!(shape(&local), shape(&remote));
}

#[tokio::test]
async fn test_update_requires_borrower_on_this_node() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();

    let err = bank
        .update_iou(&created.tx.outputs[0].linear_id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NotHostedLocally(name) if name == "Agent1"));
}

#[tokio::test]
async fn test_lookup_failures() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[]).await;
    let agent2 = account(&agent, "Agent2", &[&bank]).await;

    let err = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::AccountNotFound(_)));

    let err = bank
        .update_iou(&UniqueIdentifier::new(), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::StateNotFound(_)));

    assert!(agent
        .create_iou(1, &bank1.identifier, &agent2.identifier)
        .await
        .is_ok());

    let err = bank
        .create_iou(1, &agent2.identifier, &agent2.identifier)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::Contract(_)));
}

#[tokio::test]
async fn test_neither_account_hosted_here() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let agent2 = account(&agent, "Agent2", &[&bank]).await;

    let err = bank
        .create_iou(1, &agent1.identifier, &agent2.identifier)
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NotHostedLocally(_)));
}

#[tokio::test]
async fn test_paused_counterparty_leaves_stalled_checkpoint() {
    let net = TestNetwork::new();
    let bank = net.node_with_config(
        "Bank",
        Config {
            session_timeout_ms: 100,
            ..Config::default()
        },
    );
    let agent = net.node("Agent");
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;

    net.network.pause("Agent");
    let err = bank
        .create_iou(3, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap_err();
    assert!(matches!(&err, FlowError::Timeout { party } if party == "Agent"));
    assert!(!err.is_retryable());

    let checkpoints = bank.checkpoints().unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].status, STATUS_STALLED);
    assert_eq!(checkpoints[0].step, "Collecting");
    assert_eq!(checkpoints[0].flow_name, FlowKind::Create.name());
    assert!(checkpoints[0].tx_id.is_some());
    assert!(unconsumed(&bank).is_empty());
    assert!(unconsumed(&agent).is_empty());
}

#[tokio::test]
async fn test_double_spend_is_retryable() {
    let net = TestNetwork::new();
    let bank = net.node("Bank");
    let bank1 = account(&bank, "Bank1", &[]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap();
    let input = created.tx.out_ref(0).unwrap();
    let keys = [signing_key(&bank, &bank1.key), signing_key(&bank, &bank2.key)];

    let amend = |value| {
        let output = input.state.with_value(value);
        TransactionBuilder::new(bank.notary().party())
            .add_input_state(input.clone())
            .add_output_state(output.clone())
            .add_command(Command::new(Commands::Amend, output.participants()))
            .sign_with(&keys)
    };

    finalise(&bank, amend(2), &[]).await.unwrap();
    let err = finalise(&bank, amend(3), &[]).await.unwrap_err();
    assert!(matches!(err, FlowError::Notary(_)));
    assert!(err.is_retryable());

    let current = unconsumed(&bank);
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].state_and_ref.state.value, 2);
}

#[tokio::test]
async fn test_amend_without_every_participant_signing_is_refused() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();

    let input = created.tx.out_ref(0).unwrap();
    let output = input.state.with_value(4);
    let stx = TransactionBuilder::new(agent.notary().party())
        .add_input_state(input)
        .add_output_state(output)
        .add_command(Command::new(Commands::Amend, [agent1.key]))
        .sign_with([&signing_key(&agent, &agent1.key)]);

    let err = agent
        .session(bank.identity())
        .request_signatures(FlowKind::Update, &stx, &BTreeSet::from([bank1.key]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FlowError::Contract(ContractViolation::MissingSigners)
    ));
    assert_eq!(bank.store().transactions().count().unwrap(), 1);
}

#[tokio::test]
async fn test_unsolicited_finality_is_refused() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap();

    let err = bank
        .session(agent.identity())
        .send_finality(&created)
        .await
        .unwrap_err();
    let expected = SessionError::UnexpectedTransaction(created.id()).to_string();
    assert!(matches!(err, FlowError::Refused { reason, .. } if reason == expected));
    assert_eq!(agent.store().transactions().count().unwrap(), 0);
}

#[tokio::test]
async fn test_only_hosted_accounts_are_shared() {
    let net = TestNetwork::new();
    let (bank, agent, other) = (net.node("Bank"), net.node("Agent"), net.node("Other"));
    let agent1 = account(&agent, "Agent1", &[&bank]).await;

    assert_eq!(bank.accounts().unwrap(), vec![agent1.clone()]);
    let err = bank
        .share_account_info(&agent1.identifier, other.identity())
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::NotHostedLocally(_)));
    assert!(other.accounts().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_refuses_ambiguous_linear_id() {
    let net = TestNetwork::new();
    let bank = net.node("Bank");
    let bank1 = account(&bank, "Bank1", &[]).await;
    let bank2 = account(&bank, "Bank2", &[]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &bank2.identifier)
        .await
        .unwrap();
    let linear_id = created.tx.outputs[0].linear_id;

    let duplicate = TransactionBuilder::new(bank.notary().party())
        .add_output_state(created.tx.outputs[0].with_value(7))
        .sign_with([&signing_key(&bank, &bank1.key)]);
    assert!(bank
        .store()
        .transactions()
        .record(&duplicate, |_| true)
        .unwrap());
    assert_eq!(unconsumed(&bank).len(), 2);

    let err = bank.update_iou(&linear_id, 5).await.unwrap_err();
    assert!(matches!(
        err,
        FlowError::AmbiguousState { linear_id: id, count: 2 } if id == linear_id
    ));
    assert_eq!(bank.store().transactions().count().unwrap(), 2);
    assert_eq!(unconsumed(&bank).len(), 2);
    assert!(bank.checkpoints().unwrap().is_empty());
}

#[tokio::test]
async fn test_lost_notary_race_releases_counterparty() {
    let net = TestNetwork::new();
    let (bank, agent) = (net.node("Bank"), net.node("Agent"));
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();
    let input = created.tx.out_ref(0).unwrap();

    let output = input.state.with_value(2);
    let competing = TransactionBuilder::new(bank.notary().party())
        .add_input_state(input)
        .add_output_state(output.clone())
        .add_command(Command::new(Commands::Amend, output.participants()))
        .sign_with([
            &signing_key(&bank, &bank1.key),
            &signing_key(&agent, &agent1.key),
        ]);
    net.notary.notarise(&competing).await.unwrap();

    let err = agent.update_iou(&output.linear_id, 5).await.unwrap_err();
    assert!(matches!(err, FlowError::Notary(_)));
    assert!(err.is_retryable());
    assert_eq!(bank.awaiting_finality(), 0);
    assert_eq!(agent.awaiting_finality(), 0);
}

#[tokio::test]
async fn test_unfinalised_signature_expires() {
    let net = TestNetwork::new();
    let bank = net.node_with_config(
        "Bank",
        Config {
            finality_window_ms: 0,
            ..Config::default()
        },
    );
    let agent = net.node("Agent");
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(1, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();

    let input = created.tx.out_ref(0).unwrap();
    let output = input.state.with_value(4);
    let stx = TransactionBuilder::new(agent.notary().party())
        .add_input_state(input)
        .add_output_state(output.clone())
        .add_command(Command::new(Commands::Amend, output.participants()))
        .sign_with([&signing_key(&agent, &agent1.key)]);
    agent
        .session(bank.identity())
        .request_signatures(FlowKind::Update, &stx, &BTreeSet::from([bank1.key]))
        .await
        .unwrap();

    assert_eq!(bank.awaiting_finality(), 0);
}

#[tokio::test]
async fn test_lender_limits_raise_over_current_value() {
    let net = TestNetwork::new();
    let max_increase = serde_json::from_value(serde_json::json!({
        "type": "max_increase",
        "max": 3,
    }))
    .unwrap();
    let bank = net.node_with_policy("Bank", AcceptancePolicy::new(vec![max_increase]));
    let agent = net.node("Agent");
    let bank1 = account(&bank, "Bank1", &[&agent]).await;
    let agent1 = account(&agent, "Agent1", &[&bank]).await;
    let created = bank
        .create_iou(50, &bank1.identifier, &agent1.identifier)
        .await
        .unwrap();
    let linear_id = created.tx.outputs[0].linear_id;

    agent.update_iou(&linear_id, 53).await.unwrap();
    let err = agent.update_iou(&linear_id, 57).await.unwrap_err();
    assert_eq!(err.reason(), "IOUs may not be raised by more than 3.");

    let current = unconsumed(&agent);
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].state_and_ref.state.value, 53);
}
