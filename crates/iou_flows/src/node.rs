use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use iou_contract::{
    AccountInfo, KeyPair, LedgerTransaction, Party, PublicKey, SecureHash, SignedTransaction,
    UniqueIdentifier,
};
use iou_predicate::AcceptancePolicy;
use iou_store::{Checkpoint, IouStore, RecordedIou, StateStatus};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::flows::{create, responder, update};
use crate::{AccountDirectory, Config, FlowError, MessageHandler, Messaging, NotaryService, Session};
use crate::{SessionMessage, SessionReply};

struct NodeInner {
    identity: Party,
    store: IouStore,
    notary: Arc<dyn NotaryService>,
    messaging: Arc<dyn Messaging>,
    policy: AcceptancePolicy,
    config: Config,
    /// Transactions signed as a counterparty, keyed by the requesting node,
    /// with the time they were signed.
    awaiting_finality: Mutex<HashMap<(String, SecureHash), Instant>>,
}

/// A network node hosting accounts. Cheap to clone.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        store: IouStore,
        notary: Arc<dyn NotaryService>,
        messaging: Arc<dyn Messaging>,
        policy: AcceptancePolicy,
        config: Config,
    ) -> Self {
        let identity = Party::new(name, KeyPair::generate().public_key());
        Self {
            inner: Arc::new(NodeInner {
                identity,
                store,
                notary,
                messaging,
                policy,
                config,
                awaiting_finality: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn identity(&self) -> &Party {
        &self.inner.identity
    }

    pub fn name(&self) -> &str {
        &self.inner.identity.name
    }

    pub fn store(&self) -> &IouStore {
        &self.inner.store
    }

    pub fn notary(&self) -> &dyn NotaryService {
        self.inner.notary.as_ref()
    }

    pub fn policy(&self) -> &AcceptancePolicy {
        &self.inner.policy
    }

    pub fn messaging(&self) -> &Arc<dyn Messaging> {
        &self.inner.messaging
    }

    pub fn session(&self, counterparty: &Party) -> Session {
        Session::open(
            self.inner.messaging.clone(),
            self.inner.identity.clone(),
            counterparty.clone(),
            self.inner.config.session_timeout(),
        )
    }

    /// Creates an account hosted here with a fresh signing key.
    pub fn create_account(&self, name: &str) -> Result<AccountInfo, FlowError> {
        let keys = KeyPair::generate();
        let account = AccountInfo::new(name, self.inner.identity.clone(), keys.public_key());
        self.store().keys().add(&keys)?;
        self.store().accounts().add(&account)?;
        info!(node = self.name(), account = name, id = %account.identifier, "account created");
        Ok(account)
    }

    /// Sends the details of an account hosted here to `with`.
    pub async fn share_account_info(
        &self,
        id: &UniqueIdentifier,
        with: &Party,
    ) -> Result<(), FlowError> {
        let account = self.require_account(id)?;
        if !self.is_hosted_locally(&account)? {
            return Err(FlowError::NotHostedLocally(account.name));
        }
        self.session(with).share_account(&account).await?;
        info!(node = self.name(), account = %account.name, with = %with, "account shared");
        Ok(())
    }

    pub fn accounts(&self) -> Result<Vec<AccountInfo>, FlowError> {
        Ok(self.store().accounts().all()?)
    }

    pub fn ious(&self, status: StateStatus) -> Result<Vec<RecordedIou>, FlowError> {
        Ok(self.store().ious().query(status)?)
    }

    pub fn iou(
        &self,
        linear_id: &UniqueIdentifier,
        status: StateStatus,
    ) -> Result<Vec<RecordedIou>, FlowError> {
        Ok(self.store().ious().by_linear_id(linear_id, status)?)
    }

    pub fn checkpoints(&self) -> Result<Vec<Checkpoint>, FlowError> {
        Ok(self.store().checkpoints().all()?)
    }

    pub async fn create_iou(
        &self,
        value: i64,
        lender: &UniqueIdentifier,
        borrower: &UniqueIdentifier,
    ) -> Result<SignedTransaction, FlowError> {
        create::create_iou(self, value, lender, borrower).await
    }

    pub async fn update_iou(
        &self,
        linear_id: &UniqueIdentifier,
        new_value: i64,
    ) -> Result<SignedTransaction, FlowError> {
        update::update_iou(self, linear_id, new_value).await
    }

    /// Signing keys this node holds among `keys`.
    pub(crate) fn signing_keys<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a PublicKey>,
    ) -> Result<Vec<KeyPair>, FlowError> {
        let mut found = Vec::new();
        for key in keys {
            if let Some(pair) = self.store().keys().get(key)? {
                found.push(pair);
            }
        }
        Ok(found)
    }

    /// Resolves the inputs of `stx` against transactions recorded here.
    pub(crate) fn resolve(&self, stx: &SignedTransaction) -> Result<LedgerTransaction, FlowError> {
        let mut states = HashMap::new();
        for input in &stx.tx.inputs {
            if let Some(state) = self.store().transactions().resolve_state(input)? {
                states.insert(*input, state);
            }
        }
        Ok(stx.tx.resolve(|r| states.get(r).cloned())?)
    }

    /// Records a finalised transaction, tracking the outputs that involve a
    /// key held by this node.
    pub(crate) fn record(&self, stx: &SignedTransaction) -> Result<bool, FlowError> {
        let participants: BTreeSet<PublicKey> = stx
            .tx
            .outputs
            .iter()
            .flat_map(|s| s.participants())
            .collect();
        let hosted: HashSet<PublicKey> = self
            .signing_keys(&participants)?
            .iter()
            .map(KeyPair::public_key)
            .collect();
        let recorded = self
            .store()
            .transactions()
            .record(stx, |s| s.participants().iter().any(|k| hosted.contains(k)))?;
        if recorded {
            info!(node = self.name(), tx_id = %stx.id(), "transaction recorded");
        }
        Ok(recorded)
    }

    /// Number of transactions signed here whose finalised version has not
    /// arrived yet.
    pub fn awaiting_finality(&self) -> usize {
        let mut awaiting = self.inner.awaiting_finality.lock();
        self.prune_expected(&mut awaiting);
        awaiting.len()
    }

    pub(crate) fn expect_finality(&self, from: &Party, id: SecureHash) {
        let mut awaiting = self.inner.awaiting_finality.lock();
        self.prune_expected(&mut awaiting);
        awaiting.insert((from.name.clone(), id), Instant::now());
    }

    /// Clears and reports whether `id` was signed here for `from`.
    pub(crate) fn take_expected(&self, from: &Party, id: &SecureHash) -> bool {
        let mut awaiting = self.inner.awaiting_finality.lock();
        self.prune_expected(&mut awaiting);
        awaiting.remove(&(from.name.clone(), *id)).is_some()
    }

    fn prune_expected(&self, awaiting: &mut HashMap<(String, SecureHash), Instant>) {
        let window = self.inner.config.finality_window();
        awaiting.retain(|(from, id), signed_at| {
            let keep = signed_at.elapsed() < window;
            if !keep {
                debug!(node = self.name(), %from, tx_id = %id, "finality no longer expected");
            }
            keep
        });
    }
}

impl AccountDirectory for Node {
    fn account_info(&self, id: &UniqueIdentifier) -> Result<Option<AccountInfo>, FlowError> {
        Ok(self.store().accounts().by_id(id)?)
    }

    fn account_info_by_key(&self, key: &PublicKey) -> Result<Option<AccountInfo>, FlowError> {
        Ok(self.store().accounts().by_key(key)?)
    }

    fn is_hosted_locally(&self, account: &AccountInfo) -> Result<bool, FlowError> {
        Ok(account.host.name == self.name() && self.store().keys().contains(&account.key)?)
    }
}

#[async_trait]
impl MessageHandler for Node {
    async fn handle(&self, from: &Party, message: SessionMessage) -> SessionReply {
        responder::respond(self, from, message).await
    }
}
