use iou_contract::{ContractViolation, SecureHash, StateRef, TransactionError, UniqueIdentifier};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotaryError {
    #[error("input {state_ref} was already consumed by transaction {consumed_by}")]
    Conflict {
        state_ref: StateRef,
        consumed_by: SecureHash,
    },

    #[error("transaction is assigned to notary {0}")]
    WrongNotary(String),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no node named {0} is reachable")]
    UnknownParty(String),

    #[error("session with {0} closed before replying")]
    Closed(String),

    #[error("{0} sent an unexpected reply")]
    UnexpectedReply(String),

    #[error("transaction {0} was not expected for finality")]
    UnexpectedTransaction(SecureHash),
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("{party} refused the proposal: {reason}")]
    Refused { party: String, reason: String },

    #[error("account {0} not found")]
    AccountNotFound(String),

    #[error("no unconsumed IOU with linear id {0}")]
    StateNotFound(UniqueIdentifier),

    #[error("{count} unconsumed IOUs share linear id {linear_id}")]
    AmbiguousState {
        linear_id: UniqueIdentifier,
        count: usize,
    },

    #[error("{0} is not hosted on this node")]
    NotHostedLocally(String),

    #[error("notary error: {0}")]
    Notary(#[from] NotaryError),

    #[error("{party} did not respond in time")]
    Timeout { party: String },

    #[error(transparent)]
    Transaction(TransactionError),

    #[error("store error: {0}")]
    Store(#[from] iou_store::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("unknown party {0}")]
    UnknownParty(String),
}

impl From<TransactionError> for FlowError {
    fn from(e: TransactionError) -> Self {
        match e {
            TransactionError::Contract(violation) => FlowError::Contract(violation),
            e => FlowError::Transaction(e),
        }
    }
}

impl FlowError {
    /// The rejection message shown to users. Contract and policy rejections
    /// are passed through verbatim.
    pub fn reason(&self) -> String {
        match self {
            FlowError::Contract(violation) => violation.to_string(),
            FlowError::Refused { reason, .. } => reason.clone(),
            e => e.to_string(),
        }
    }

    /// Whether running the same flow again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FlowError::Notary(NotaryError::Conflict { .. }))
    }
}
