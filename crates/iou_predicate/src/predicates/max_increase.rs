use crate::context::{ContextProvider, PredicateContext};
use crate::predicates::Accept;
use serde::{Deserialize, Serialize};

/// Limits how much an amendment may raise the value of an existing IOU.
/// Proposals without a previous version always pass.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MaxIncrease {
    pub(crate) max: i64,
}

impl Accept for MaxIncrease {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        match context.proposal.previous_value {
            Some(previous) => context.proposal.value.saturating_sub(previous) <= self.max,
            None => true,
        }
    }

    fn refusal_reason(&self) -> String {
        format!("IOUs may not be raised by more than {}.", self.max)
    }
}
