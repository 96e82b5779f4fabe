use crate::context::{ContextProvider, PredicateContext};
use crate::{Config, Error};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

pub mod and;
pub mod blacklist;
pub mod max_increase;
pub mod max_value;
pub mod or;
pub mod whitelist;

pub trait Accept {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool;

    /// Human readable reason given to the initiator when `accept` is false.
    fn refusal_reason(&self) -> String;
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    Or(or::Or),
    And(and::And),
    MaxValue(max_value::MaxValue),
    MaxIncrease(max_increase::MaxIncrease),
    Whitelist(whitelist::Whitelist),
    Blacklist(blacklist::Blacklist),
}

impl Predicate {
    pub fn from_file(path: &PathBuf) -> Result<Self, Error> {
        let s = std::fs::read_to_string(path).map_err(|e| Error::LoadFromFile {
            source: e,
            path: path.display().to_string(),
        })?;

        Ok(toml::from_str(&s)?)
    }
}

impl Accept for Predicate {
    fn accept<P: ContextProvider>(&self, context: &PredicateContext<P>) -> bool {
        match self {
            Predicate::Or(p) => p.accept(context),
            Predicate::And(p) => p.accept(context),
            Predicate::MaxValue(p) => p.accept(context),
            Predicate::MaxIncrease(p) => p.accept(context),
            Predicate::Whitelist(p) => p.accept(context),
            Predicate::Blacklist(p) => p.accept(context),
        }
    }

    fn refusal_reason(&self) -> String {
        match self {
            Predicate::Or(p) => p.refusal_reason(),
            Predicate::And(p) => p.refusal_reason(),
            Predicate::MaxValue(p) => p.refusal_reason(),
            Predicate::MaxIncrease(p) => p.refusal_reason(),
            Predicate::Whitelist(p) => p.refusal_reason(),
            Predicate::Blacklist(p) => p.refusal_reason(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct Refusal {
    pub reason: String,
}

/// Every predicate must accept for a proposal to be signed.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(transparent)]
pub struct AcceptancePolicy {
    predicates: Vec<Predicate>,
}

impl AcceptancePolicy {
    pub const DEFAULT_MAX_VALUE: i64 = 100;

    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    /// Loads the predicate files named in `config`, falling back to the default
    /// policy when none are configured.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        if config.predicates.is_empty() {
            return Ok(Self::default());
        }
        let predicates = config
            .predicates
            .iter()
            .map(Predicate::from_file)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(predicates))
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn check<P: ContextProvider>(&self, context: &PredicateContext<P>) -> Result<(), Refusal> {
        match self.predicates.iter().find(|p| !p.accept(context)) {
            Some(p) => {
                debug!(?p, value = context.proposal.value, "proposal refused");
                Err(Refusal {
                    reason: p.refusal_reason(),
                })
            }
            None => Ok(()),
        }
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self::new(vec![Predicate::MaxValue(max_value::MaxValue {
            max: Self::DEFAULT_MAX_VALUE,
        })])
    }
}
