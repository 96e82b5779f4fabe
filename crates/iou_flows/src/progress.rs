use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use iou_contract::SecureHash;
use iou_store::{Checkpoint, IouStore};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{FlowError, FlowKind};

pub const STATUS_RUNNING: &str = "running";
pub const STATUS_STALLED: &str = "stalled";

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Querying,
    Building,
    Signing,
    Collecting,
    Finalising,
    Done,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Querying => "Querying existing state.",
            Step::Building => "Building a new transaction.",
            Step::Signing => "Signing the transaction with our private key.",
            Step::Collecting => "Collecting the counterparty's signature.",
            Step::Finalising => "Obtaining notary signature and recording transaction.",
            Step::Done => "Done.",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Logs every step of a flow run and keeps its checkpoint current.
pub struct ProgressTracker {
    store: IouStore,
    checkpoint: Checkpoint,
    step: Step,
}

impl ProgressTracker {
    pub fn start(store: &IouStore, flow: FlowKind) -> Result<Self, FlowError> {
        let step = Step::Querying;
        let checkpoint = Checkpoint {
            flow_id: Uuid::new_v4().to_string(),
            flow_name: flow.name().to_owned(),
            step: step.to_string(),
            status: STATUS_RUNNING.to_owned(),
            tx_id: None,
            updated_at: now(),
        };
        store.checkpoints().save(&checkpoint)?;
        info!(
            flow_id = %checkpoint.flow_id,
            flow = flow.name(),
            step = step.label(),
            "flow started"
        );
        Ok(Self {
            store: store.clone(),
            checkpoint,
            step,
        })
    }

    pub fn flow_id(&self) -> &str {
        &self.checkpoint.flow_id
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn set_step(&mut self, step: Step) -> Result<(), FlowError> {
        info!(
            flow_id = %self.checkpoint.flow_id,
            flow = %self.checkpoint.flow_name,
            step = step.label()
        );
        self.step = step;
        self.checkpoint.step = step.to_string();
        self.save()
    }

    pub fn set_tx_id(&mut self, id: &SecureHash) -> Result<(), FlowError> {
        self.checkpoint.tx_id = Some(id.to_string());
        self.save()
    }

    /// Ends the run. A flow that timed out waiting on a counterparty keeps a
    /// stalled checkpoint, anything else is cleared.
    pub fn close<T>(mut self, result: &Result<T, FlowError>) {
        let flow_id = self.checkpoint.flow_id.clone();
        let outcome = match result {
            Ok(_) => self.store.checkpoints().remove(&flow_id),
            Err(e @ FlowError::Timeout { .. }) => {
                warn!(flow_id = %flow_id, step = %self.step, error = %e, "flow stalled");
                self.checkpoint.status = STATUS_STALLED.to_owned();
                self.checkpoint.updated_at = now();
                self.store.checkpoints().save(&self.checkpoint)
            }
            Err(e) => {
                warn!(flow_id = %flow_id, step = %self.step, error = %e, "flow failed");
                self.store.checkpoints().remove(&flow_id)
            }
        };
        if let Err(e) = outcome {
            error!(flow_id = %flow_id, error = %e, "unable to update checkpoint");
        }
    }

    fn save(&mut self) -> Result<(), FlowError> {
        self.checkpoint.updated_at = now();
        Ok(self.store.checkpoints().save(&self.checkpoint)?)
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iou_store::Update;

    fn store() -> IouStore {
        let store = IouStore::open_in_memory().unwrap();
        store.update().unwrap();
        store
    }

    #[test]
    fn test_checkpoint_follows_steps() {
        let store = store();
        let mut progress = ProgressTracker::start(&store, FlowKind::Create).unwrap();
        progress.set_step(Step::Collecting).unwrap();

        let saved = store.checkpoints().get(progress.flow_id()).unwrap().unwrap();
        assert_eq!(saved.flow_name, "create_iou");
        assert_eq!(saved.step, "Collecting");
        assert_eq!(saved.status, STATUS_RUNNING);

        progress.close(&Ok::<(), FlowError>(()));
        assert!(store.checkpoints().all().unwrap().is_empty());
    }

    #[test]
    fn test_timeout_leaves_stalled_checkpoint() {
        let store = store();
        let mut progress = ProgressTracker::start(&store, FlowKind::Update).unwrap();
        progress.set_step(Step::Collecting).unwrap();
        progress.close(&Err::<(), _>(FlowError::Timeout {
            party: "Bank".to_owned(),
        }));

        let stalled = store.checkpoints().with_status(STATUS_STALLED).unwrap();
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].step, "Collecting");
    }

    #[test]
    fn test_failure_clears_checkpoint() {
        let store = store();
        let progress = ProgressTracker::start(&store, FlowKind::Create).unwrap();
        progress.close(&Err::<(), _>(FlowError::AccountNotFound("x".to_owned())));
        assert!(store.checkpoints().all().unwrap().is_empty());
    }
}
