use crate::context::{ContextProvider, PredicateContext};
use crate::predicates::{Accept, Predicate};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Or {
    conditions: Vec<Predicate>,
}

impl Accept for Or {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        for condition in &self.conditions {
            if condition.accept(context) {
                return true;
            }
        }

        false
    }

    fn refusal_reason(&self) -> String {
        let reasons = self
            .conditions
            .iter()
            .map(|c| c.refusal_reason())
            .collect::<Vec<_>>();
        format!("None of the acceptance conditions were met: {}", reasons.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_util::context;
    use crate::predicates::{max_value::MaxValue, whitelist::AccountKind, whitelist::Whitelist};

    fn predicate() -> Or {
        Or {
            conditions: vec![
                Predicate::Whitelist(Whitelist {
                    accounts: vec!["Bank2".to_string()],
                    kind: AccountKind::Lender,
                }),
                Predicate::MaxValue(MaxValue { max: 100 }),
            ],
        }
    }

    #[test]
    fn test_returns_true_if_any_condition_returns_true() {
        assert!(predicate().accept(&context(50)))
    }

    #[test]
    fn test_returns_false_if_all_conditions_return_false() {
        let p = predicate();

        assert!(!p.accept(&context(500)));
        assert_eq!(
            p.refusal_reason(),
            "None of the acceptance conditions were met: The lender account is not whitelisted. IOUs with a value over 100 are not accepted."
        );
    }
}
