//! iou-server
//!
//! HTTP front end for a network of IOU nodes. Every node hosts accounts
//! which lend to and borrow from each other through IOUs. All routes below
//! `/api/v1/nodes/:node` act on behalf of one node:
//!
//! - `accounts`: create accounts and share them with other nodes
//! - `ious`: issue IOUs, list the vault and amend existing IOUs
//! - `flows`: checkpoints of flows that have not completed
//! - `acceptance`: predicates the node applies before agreeing to an amendment

pub(crate) mod acceptance;
pub(crate) mod accounts;
pub(crate) mod api;
pub mod app;
pub mod error;
pub(crate) mod flows;
pub(crate) mod ious;
pub(crate) mod nodes;
pub(crate) mod openapi;

pub use app::{Server, ServerState};
pub use error::Error;

#[derive(serde::Deserialize, Debug)]
pub struct Config {
    pub url: String,
    pub port: u16,
}
