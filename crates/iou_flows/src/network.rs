//! Point to point messaging between nodes.
//!
//! [`MockNetwork`] delivers messages between nodes living in one process.
//! Each registered node gets an inbox drained by its own task, so a node can
//! be paused to hold its messages unanswered.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iou_contract::{
    AccountInfo, ContractViolation, Party, PublicKey, SecureHash, SignedTransaction,
    TransactionSignature,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::{FlowError, FlowKind, SessionError};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionMessage {
    /// Asks the counterparty to check and sign a proposed transaction.
    SignatureRequest {
        flow: FlowKind,
        transaction: SignedTransaction,
    },
    /// A notarised transaction the counterparty signed earlier.
    Finality { transaction: SignedTransaction },
    /// The initiator gave up on a transaction the counterparty signed.
    Abandon { tx_id: SecureHash },
    ShareAccount { account: AccountInfo },
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum SessionReply {
    Signatures(Vec<TransactionSignature>),
    Rejected(Rejection),
    Recorded,
    Ack,
}

/// Why a counterparty would not go along with a request.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    Contract(ContractViolation),
    Policy(String),
    Invalid(String),
}

impl From<FlowError> for Rejection {
    fn from(e: FlowError) -> Self {
        match e {
            FlowError::Contract(violation) => Rejection::Contract(violation),
            FlowError::Refused { reason, .. } => Rejection::Policy(reason),
            e => Rejection::Invalid(e.to_string()),
        }
    }
}

impl Rejection {
    pub fn into_error(self, party: &Party) -> FlowError {
        match self {
            Rejection::Contract(violation) => FlowError::Contract(violation),
            Rejection::Policy(reason) | Rejection::Invalid(reason) => FlowError::Refused {
                party: party.name.clone(),
                reason,
            },
        }
    }
}

#[async_trait]
pub trait Messaging: Send + Sync {
    async fn send_and_receive(
        &self,
        from: &Party,
        to: &Party,
        message: SessionMessage,
    ) -> Result<SessionReply, SessionError>;

    /// Well known party registered under `name`.
    fn party(&self, name: &str) -> Option<Party>;

    fn parties(&self) -> Vec<Party>;
}

/// Receiving end of [`Messaging`], implemented by nodes.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, from: &Party, message: SessionMessage) -> SessionReply;
}

/// A conversation with one counterparty.
#[derive(Clone)]
pub struct Session {
    messaging: Arc<dyn Messaging>,
    ours: Party,
    counterparty: Party,
    timeout: Duration,
}

impl Session {
    pub fn open(
        messaging: Arc<dyn Messaging>,
        ours: Party,
        counterparty: Party,
        timeout: Duration,
    ) -> Self {
        Self {
            messaging,
            ours,
            counterparty,
            timeout,
        }
    }

    pub fn counterparty(&self) -> &Party {
        &self.counterparty
    }

    pub async fn send_and_receive(
        &self,
        message: SessionMessage,
    ) -> Result<SessionReply, FlowError> {
        let exchange = self
            .messaging
            .send_and_receive(&self.ours, &self.counterparty, message);
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(reply) => Ok(reply?),
            Err(_) => Err(FlowError::Timeout {
                party: self.counterparty.name.clone(),
            }),
        }
    }

    /// Asks the counterparty to sign `stx`. Only signatures that are valid
    /// and made by one of `expected` are returned.
    pub async fn request_signatures(
        &self,
        flow: FlowKind,
        stx: &SignedTransaction,
        expected: &BTreeSet<PublicKey>,
    ) -> Result<Vec<TransactionSignature>, FlowError> {
        let reply = self
            .send_and_receive(SessionMessage::SignatureRequest {
                flow,
                transaction: stx.clone(),
            })
            .await?;
        let sigs = match reply {
            SessionReply::Signatures(sigs) => sigs,
            SessionReply::Rejected(rejection) => {
                return Err(rejection.into_error(&self.counterparty))
            }
            _ => return Err(self.unexpected_reply()),
        };

        let id = stx.id();
        let sigs: Vec<_> = sigs
            .into_iter()
            .filter(|s| expected.contains(&s.by) && s.is_valid(&id))
            .collect();
        let signed: BTreeSet<_> = sigs.iter().map(|s| s.by).collect();
        if let Some(missing) = expected.difference(&signed).next() {
            return Err(FlowError::Refused {
                party: self.counterparty.name.clone(),
                reason: format!("no valid signature was returned for {missing}"),
            });
        }
        Ok(sigs)
    }

    /// Hands the notarised transaction to the counterparty for recording.
    pub async fn send_finality(&self, stx: &SignedTransaction) -> Result<(), FlowError> {
        let reply = self
            .send_and_receive(SessionMessage::Finality {
                transaction: stx.clone(),
            })
            .await?;
        match reply {
            SessionReply::Recorded => Ok(()),
            SessionReply::Rejected(rejection) => Err(rejection.into_error(&self.counterparty)),
            _ => Err(self.unexpected_reply()),
        }
    }

    /// Tells the counterparty that `tx_id` will not be finalised.
    pub async fn abandon(&self, tx_id: &SecureHash) -> Result<(), FlowError> {
        let reply = self
            .send_and_receive(SessionMessage::Abandon { tx_id: *tx_id })
            .await?;
        match reply {
            SessionReply::Ack => Ok(()),
            SessionReply::Rejected(rejection) => Err(rejection.into_error(&self.counterparty)),
            _ => Err(self.unexpected_reply()),
        }
    }

    pub async fn share_account(&self, account: &AccountInfo) -> Result<(), FlowError> {
        let reply = self
            .send_and_receive(SessionMessage::ShareAccount {
                account: account.clone(),
            })
            .await?;
        match reply {
            SessionReply::Ack => Ok(()),
            SessionReply::Rejected(rejection) => Err(rejection.into_error(&self.counterparty)),
            _ => Err(self.unexpected_reply()),
        }
    }

    fn unexpected_reply(&self) -> FlowError {
        SessionError::UnexpectedReply(self.counterparty.name.clone()).into()
    }
}

struct Envelope {
    from: Party,
    message: SessionMessage,
    reply: oneshot::Sender<SessionReply>,
}

struct Endpoint {
    party: Party,
    inbox: mpsc::UnboundedSender<Envelope>,
    paused: bool,
    parked: Vec<Envelope>,
}

/// In-process network. Must be used from within a tokio runtime.
#[derive(Default)]
pub struct MockNetwork {
    endpoints: Mutex<BTreeMap<String, Endpoint>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts serving messages addressed to `party` with `handler`.
    pub fn register(&self, party: Party, handler: Arc<dyn MessageHandler>) {
        let (inbox, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let name = party.name.clone();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let reply = handler.handle(&envelope.from, envelope.message).await;
                    if envelope.reply.send(reply).is_err() {
                        debug!(from = %envelope.from, "requester stopped waiting");
                    }
                });
            }
            debug!(node = %name, "inbox closed");
        });
        info!(node = %party.name, "registered on network");
        self.endpoints.lock().insert(
            party.name.clone(),
            Endpoint {
                party,
                inbox,
                paused: false,
                parked: Vec::new(),
            },
        );
    }

    /// Holds every message for `name` until [`MockNetwork::resume`] is called.
    pub fn pause(&self, name: &str) -> bool {
        match self.endpoints.lock().get_mut(name) {
            Some(endpoint) => {
                info!(node = name, "paused");
                endpoint.paused = true;
                true
            }
            None => false,
        }
    }

    /// Delivers parked messages and lets new ones through again.
    pub fn resume(&self, name: &str) -> bool {
        match self.endpoints.lock().get_mut(name) {
            Some(endpoint) => {
                endpoint.paused = false;
                let parked = std::mem::take(&mut endpoint.parked);
                info!(node = name, parked = parked.len(), "resumed");
                for envelope in parked {
                    // Inbox only closes when the network is dropped.
                    let _ = endpoint.inbox.send(envelope);
                }
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Messaging for MockNetwork {
    async fn send_and_receive(
        &self,
        from: &Party,
        to: &Party,
        message: SessionMessage,
    ) -> Result<SessionReply, SessionError> {
        let (reply, reply_rx) = oneshot::channel();
        let envelope = Envelope {
            from: from.clone(),
            message,
            reply,
        };
        {
            let mut endpoints = self.endpoints.lock();
            let endpoint = endpoints
                .get_mut(&to.name)
                .ok_or_else(|| SessionError::UnknownParty(to.name.clone()))?;
            if endpoint.paused {
                debug!(from = %from, to = %to, "parking message for paused node");
                endpoint.parked.push(envelope);
            } else {
                endpoint
                    .inbox
                    .send(envelope)
                    .map_err(|_| SessionError::Closed(to.name.clone()))?;
            }
        }
        reply_rx
            .await
            .map_err(|_| SessionError::Closed(to.name.clone()))
    }

    fn party(&self, name: &str) -> Option<Party> {
        self.endpoints.lock().get(name).map(|e| e.party.clone())
    }

    fn parties(&self) -> Vec<Party> {
        self.endpoints
            .lock()
            .values()
            .map(|e| e.party.clone())
            .collect()
    }
}
