use crate::context::{ContextProvider, PredicateContext};
use crate::predicates::Accept;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Lender,
    Borrower,
}

impl AccountKind {
    pub(crate) fn key<'a, P: ContextProvider>(&self, context: &'a PredicateContext<P>) -> &'a str {
        match self {
            AccountKind::Lender => &context.proposal.lender,
            AccountKind::Borrower => &context.proposal.borrower,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Lender => "lender",
            AccountKind::Borrower => "borrower",
        }
    }
}

/// Only sign when the account in the given role is listed, by name or key.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Whitelist {
    pub(crate) accounts: Vec<String>,
    pub(crate) kind: AccountKind,
}

impl Accept for Whitelist {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        context.matches_any(self.kind.key(context), &self.accounts)
    }

    fn refusal_reason(&self) -> String {
        format!("The {} account is not whitelisted.", self.kind.as_str())
    }
}
