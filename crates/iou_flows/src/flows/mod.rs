pub mod create;
pub mod finality;
pub mod responder;
pub mod signing;
pub mod update;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Create,
    Update,
}

impl FlowKind {
    pub fn name(&self) -> &'static str {
        match self {
            FlowKind::Create => "create_iou",
            FlowKind::Update => "update_iou",
        }
    }
}
