use std::collections::BTreeSet;
use std::sync::Arc;

use config::{Environment, File};
use iou_flows::{AccountDirectory, InMemoryNotary, MockNetwork, Node, NotaryService};
use iou_predicate::AcceptancePolicy;
use iou_server::{Server, ServerState};
use iou_store::{IouStore, Update};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] iou_store::Error),

    #[error(transparent)]
    Server(#[from] iou_server::Error),

    #[error(transparent)]
    Flow(#[from] iou_flows::FlowError),

    #[error("Failed to load acceptance predicates specified in config file")]
    LoadPredicate(#[from] iou_predicate::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("node {0} is configured more than once")]
    DuplicateNode(String),
}

#[derive(serde::Deserialize, Debug)]
pub struct NodeConfig {
    pub name: String,
    /// Accounts created on first start and shared with every other node.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Overrides the network wide acceptance predicates for this node.
    pub acceptance: Option<iou_predicate::Config>,
}

#[derive(serde::Deserialize, Debug)]
pub struct IouConfig {
    server: iou_server::Config,
    #[serde(default)]
    store: iou_store::Config,
    #[serde(default)]
    network: iou_flows::Config,
    #[serde(default)]
    acceptance: iou_predicate::Config,
    #[serde(default = "default_notary")]
    notary: String,
    #[serde(default)]
    nodes: Vec<NodeConfig>,
}

fn default_notary() -> String {
    "Notary".to_owned()
}

impl IouConfig {
    pub fn new() -> Result<Self, Error> {
        let c = config::Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("iou").separator("__"))
            .build()?;

        Ok(c.try_deserialize()?)
    }
}

/// Facade class encompassing all components that make up the `iou` application.
pub struct IouApp {
    config: IouConfig,
}

impl IouApp {
    pub fn new(config: IouConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<(), Error> {
        let nodes = self.start_nodes().await?;

        // listenfd is used to enable auto-reloading in development
        // otherwise fallback to standard tcp listener
        let listener = match listenfd::ListenFd::from_env().take_tcp_listener(0)? {
            Some(listener) => listener,
            None => std::net::TcpListener::bind(format!(
                "{}:{}",
                self.config.server.url, self.config.server.port
            ))?,
        };

        Ok(Server::serve(listener, ServerState::new(nodes)).await?)
    }

    /// Opens every configured node on one in-process network and seeds
    /// their accounts.
    pub async fn start_nodes(&self) -> Result<Vec<Node>, Error> {
        let mut names = BTreeSet::new();
        if let Some(dup) = self.config.nodes.iter().find(|n| !names.insert(&n.name)) {
            return Err(Error::DuplicateNode(dup.name.clone()));
        }

        let network = Arc::new(MockNetwork::new());
        let notary: Arc<dyn NotaryService> = Arc::new(InMemoryNotary::new(&self.config.notary));

        let mut nodes = Vec::with_capacity(self.config.nodes.len());
        for node_config in &self.config.nodes {
            let store = IouStore::open_for_node(&self.config.store, &node_config.name)?;
            if store.has_updates()? {
                info!("apply updates to {} store", node_config.name);
                store.update()?;
            }

            let acceptance = node_config
                .acceptance
                .as_ref()
                .unwrap_or(&self.config.acceptance);
            let policy = AcceptancePolicy::from_config(acceptance)?;
            info!(
                "loaded {} acceptance predicates for {}",
                policy.predicates().len(),
                node_config.name
            );

            let node = Node::new(
                node_config.name.as_str(),
                store,
                notary.clone(),
                network.clone(),
                policy,
                self.config.network.clone(),
            );
            network.register(node.identity().clone(), Arc::new(node.clone()));
            nodes.push(node);
        }

        for (node, node_config) in nodes.iter().zip(&self.config.nodes) {
            for name in &node_config.accounts {
                seed_account(node, name, &nodes).await?;
            }
        }
        Ok(nodes)
    }
}

/// Makes sure `node` hosts an account called `name` and every other node
/// knows about it.
async fn seed_account(node: &Node, name: &str, nodes: &[Node]) -> Result<(), Error> {
    let mut existing = None;
    for account in node.store().accounts().by_name(name)? {
        if node.is_hosted_locally(&account)? {
            existing = Some(account);
            break;
        }
    }
    let account = match existing {
        Some(account) => account,
        None => node.create_account(name)?,
    };

    for other in nodes.iter().filter(|n| n.name() != node.name()) {
        node.share_account_info(&account.identifier, other.identity())
            .await?;
    }
    Ok(())
}
