//! Signature collection. Keys held by the running node are used directly,
//! every other host is asked over a session. Both go through
//! [`SignatureCollector`] so a flow does not care where its signers live.
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use iou_contract::{AccountInfo, KeyPair, Party, PublicKey, SignedTransaction, TransactionSignature};
use tracing::debug;

use crate::{AccountDirectory, FlowError, FlowKind, Node, Session};

#[async_trait]
pub trait SignatureCollector: Send + Sync {
    async fn collect(&self, stx: SignedTransaction) -> Result<SignedTransaction, FlowError>;
}

/// Signs with keys held by this node.
pub struct LocalSigner {
    keys: Vec<KeyPair>,
}

impl LocalSigner {
    pub fn new(keys: Vec<KeyPair>) -> Self {
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl SignatureCollector for LocalSigner {
    async fn collect(&self, stx: SignedTransaction) -> Result<SignedTransaction, FlowError> {
        let id = stx.id();
        let sigs: Vec<_> = self
            .keys
            .iter()
            .map(|k| TransactionSignature::sign(k, &id))
            .collect();
        Ok(stx.with_additional_signatures(sigs))
    }
}

/// Asks the host of one or more accounts to sign.
pub struct RemoteSigner {
    session: Session,
    flow: FlowKind,
    keys: BTreeSet<PublicKey>,
}

impl RemoteSigner {
    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[async_trait]
impl SignatureCollector for RemoteSigner {
    async fn collect(&self, stx: SignedTransaction) -> Result<SignedTransaction, FlowError> {
        debug!(
            counterparty = %self.session.counterparty(),
            keys = self.keys.len(),
            "requesting signatures"
        );
        let sigs = self
            .session
            .request_signatures(self.flow, &stx, &self.keys)
            .await?;
        Ok(stx.with_additional_signatures(sigs))
    }
}

/// Who signs for each required account.
pub struct SigningPlan {
    pub local: LocalSigner,
    pub remote: Vec<RemoteSigner>,
}

impl SigningPlan {
    /// Splits `signers` by host. Fails with [`FlowError::NotHostedLocally`]
    /// unless at least one of them is hosted by `node`.
    pub fn for_accounts(
        node: &Node,
        flow: FlowKind,
        signers: &[&AccountInfo],
    ) -> Result<Self, FlowError> {
        let mut local = Vec::new();
        let mut remote: BTreeMap<String, (Party, BTreeSet<PublicKey>)> = BTreeMap::new();
        for account in signers {
            if node.is_hosted_locally(account)? {
                local.push(account.key);
            } else {
                remote
                    .entry(account.host.name.clone())
                    .or_insert_with(|| (account.host.clone(), BTreeSet::new()))
                    .1
                    .insert(account.key);
            }
        }
        local.sort();
        local.dedup();

        let local = LocalSigner::new(node.signing_keys(&local)?);
        if local.is_empty() {
            let names: Vec<_> = signers.iter().map(|a| a.name.as_str()).collect();
            return Err(FlowError::NotHostedLocally(names.join(", ")));
        }
        let remote = remote
            .into_values()
            .map(|(host, keys)| RemoteSigner {
                session: node.session(&host),
                flow,
                keys,
            })
            .collect();
        Ok(Self { local, remote })
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.remote.iter().map(|r| r.session.clone()).collect()
    }
}
