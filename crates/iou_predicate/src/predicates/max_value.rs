use crate::context::{ContextProvider, PredicateContext};
use crate::predicates::Accept;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct MaxValue {
    pub(crate) max: i64,
}

impl Accept for MaxValue {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        context.proposal.value <= self.max
    }

    fn refusal_reason(&self) -> String {
        format!("IOUs with a value over {} are not accepted.", self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_util::context;

    #[test]
    fn test_accepts_up_to_max() {
        let p = MaxValue { max: 100 };

        assert!(p.accept(&context(0)));
        assert!(p.accept(&context(100)));
        assert!(!p.accept(&context(101)));
    }
}
