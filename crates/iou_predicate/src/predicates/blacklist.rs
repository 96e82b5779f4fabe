use crate::context::{ContextProvider, PredicateContext};
use crate::predicates::whitelist::AccountKind;
use crate::predicates::Accept;
use serde::{Deserialize, Serialize};

/// Refuse when the account in the given role is listed, by name or key.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Blacklist {
    pub(crate) accounts: Vec<String>,
    pub(crate) kind: AccountKind,
}

impl Accept for Blacklist {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        !context.matches_any(self.kind.key(context), &self.accounts)
    }

    fn refusal_reason(&self) -> String {
        format!("The {} account is blacklisted.", self.kind.as_str())
    }
}
