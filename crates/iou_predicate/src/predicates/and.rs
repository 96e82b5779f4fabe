use crate::context::{ContextProvider, PredicateContext};
use crate::predicates::{Accept, Predicate};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct And {
    conditions: Vec<Predicate>,
}

impl Accept for And {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        self.conditions.iter().all(|c| c.accept(context))
    }

    fn refusal_reason(&self) -> String {
        let reasons = self
            .conditions
            .iter()
            .map(|c| c.refusal_reason())
            .collect::<Vec<_>>();
        format!("All of the acceptance conditions must be met: {}", reasons.join(" "))
    }
}
