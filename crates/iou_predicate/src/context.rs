/// The parts of a proposed IOU transaction predicates look at.
///
/// Keys are base58 encoded account keys.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub value: i64,
    pub previous_value: Option<i64>,
    pub lender: String,
    pub borrower: String,
}

pub trait ContextProvider {
    /// Name of the account owning `key`, if the node knows it.
    fn account_name(&self, key: &str) -> Option<String>;
}

pub struct PredicateContext<P: ContextProvider> {
    pub proposal: Proposal,
    pub provider: P,
}

impl<P: ContextProvider> PredicateContext<P> {
    /// True if `key` or the name of the account behind it is in `accounts`.
    pub(crate) fn matches_any(&self, key: &str, accounts: &[String]) -> bool {
        accounts.iter().any(|a| a == key)
            || self
                .provider
                .account_name(key)
                .map(|name| accounts.contains(&name))
                .unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    pub struct TestAccount {
        pub key: String,
        pub name: String,
    }

    pub struct TestContextProvider {
        pub accounts: Vec<TestAccount>,
    }

    impl ContextProvider for TestContextProvider {
        fn account_name(&self, key: &str) -> Option<String> {
            self.accounts
                .iter()
                .find(|a| a.key == key)
                .map(|a| a.name.clone())
        }
    }

    pub fn context(value: i64) -> PredicateContext<TestContextProvider> {
        PredicateContext {
            proposal: Proposal {
                value,
                previous_value: None,
                lender: "lender_key".to_owned(),
                borrower: "borrower_key".to_owned(),
            },
            provider: TestContextProvider {
                accounts: vec![
                    TestAccount {
                        key: "lender_key".to_owned(),
                        name: "Bank1".to_owned(),
                    },
                    TestAccount {
                        key: "borrower_key".to_owned(),
                        name: "Agent1".to_owned(),
                    },
                ],
            },
        }
    }
}
