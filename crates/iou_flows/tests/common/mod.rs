use std::sync::Arc;

use iou_contract::{AccountInfo, KeyPair, PublicKey};
use iou_flows::{Config, InMemoryNotary, MockNetwork, Node};
use iou_predicate::AcceptancePolicy;
use iou_store::{IouStore, RecordedIou, StateStatus, Update};

pub struct TestNetwork {
    pub network: Arc<MockNetwork>,
    pub notary: Arc<InMemoryNotary>,
}

impl TestNetwork {
    pub fn new() -> Self {
        Self {
            network: Arc::new(MockNetwork::new()),
            notary: Arc::new(InMemoryNotary::new("Notary")),
        }
    }

    pub fn node(&self, name: &str) -> Node {
        self.node_with_config(name, Config::default())
    }

    pub fn node_with_config(&self, name: &str, config: Config) -> Node {
        self.build(name, AcceptancePolicy::default(), config)
    }

    pub fn node_with_policy(&self, name: &str, policy: AcceptancePolicy) -> Node {
        self.build(name, policy, Config::default())
    }

    fn build(&self, name: &str, policy: AcceptancePolicy, config: Config) -> Node {
        let store = IouStore::open_in_memory().unwrap();
        store.update().unwrap();
        let notary = self.notary.clone();
        let node = Node::new(name, store, notary, self.network.clone(), policy, config);
        self.network.register(node.identity().clone(), Arc::new(node.clone()));
        node
    }
}

/// Creates `name` on `host` and shares it with every node in `others`.
pub async fn account(host: &Node, name: &str, others: &[&Node]) -> AccountInfo {
    let account = host.create_account(name).unwrap();
    for other in others {
        host.share_account_info(&account.identifier, other.identity())
            .await
            .unwrap();
    }
    account
}

pub fn unconsumed(node: &Node) -> Vec<RecordedIou> {
    node.ious(StateStatus::Unconsumed).unwrap()
}

pub fn signing_key(node: &Node, key: &PublicKey) -> KeyPair {
    node.store().keys().get(key).unwrap().unwrap()
}
