use crate::error::parse;
use crate::schema;
use crate::ConnectionPool;
use crate::Error;
use diesel::prelude::*;
use iou_contract::{IouState, SecureHash, StateAndRef, StateRef, UniqueIdentifier};
use serde::{Deserialize, Serialize};
use std::borrow::BorrowMut;

#[derive(Queryable, Selectable)]
#[diesel(table_name = schema::ious)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct IouRow {
    pub id: i32,
    pub tx_id: String,
    pub output_index: i32,
    pub linear_id: String,
    pub value: i64,
    pub lender: String,
    pub borrower: String,
    pub consumed_by: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = schema::ious)]
pub(crate) struct NewIou {
    tx_id: String,
    output_index: i32,
    linear_id: String,
    value: i64,
    lender: String,
    borrower: String,
}

impl NewIou {
    pub(crate) fn new(tx_id: &str, output_index: i32, state: &IouState) -> Self {
        Self {
            tx_id: tx_id.to_owned(),
            output_index,
            linear_id: state.linear_id.to_string(),
            value: state.value,
            lender: state.lender.to_string(),
            borrower: state.borrower.to_string(),
        }
    }
}

/// Which vault states a query returns.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StateStatus {
    #[default]
    Unconsumed,
    Consumed,
    All,
}

/// An IOU state known to the vault.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RecordedIou {
    #[serde(flatten)]
    pub state_and_ref: StateAndRef,
    /// Transaction that consumed the state, if any.
    pub consumed_by: Option<SecureHash>,
}

impl RecordedIou {
    pub fn is_consumed(&self) -> bool {
        self.consumed_by.is_some()
    }
}

impl TryFrom<IouRow> for RecordedIou {
    type Error = Error;

    fn try_from(row: IouRow) -> Result<Self, Self::Error> {
        let index = u32::try_from(row.output_index).map_err(|e| Error::Decode {
            field: "output_index",
            reason: e.to_string(),
        })?;
        Ok(Self {
            state_and_ref: StateAndRef {
                state: IouState {
                    value: row.value,
                    lender: parse("lender", &row.lender)?,
                    borrower: parse("borrower", &row.borrower)?,
                    linear_id: parse("linear_id", &row.linear_id)?,
                },
                state_ref: StateRef::new(parse("tx_id", &row.tx_id)?, index),
            },
            consumed_by: row
                .consumed_by
                .as_deref()
                .map(|s| parse("consumed_by", s))
                .transpose()?,
        })
    }
}

pub struct IouRepository {
    pool: ConnectionPool,
}

impl IouRepository {
    pub(crate) fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn query(&self, status: StateStatus) -> Result<Vec<RecordedIou>, Error> {
        self.load(status, None)
    }

    /// Every version of one IOU, oldest first.
    pub fn by_linear_id(
        &self,
        linear_id: &UniqueIdentifier,
        status: StateStatus,
    ) -> Result<Vec<RecordedIou>, Error> {
        self.load(status, Some(linear_id))
    }

    fn load(
        &self,
        status: StateStatus,
        linear_id: Option<&UniqueIdentifier>,
    ) -> Result<Vec<RecordedIou>, Error> {
        let mut conn = self.pool.get()?;
        let mut query = schema::ious::table.into_boxed();
        match status {
            StateStatus::Unconsumed => query = query.filter(schema::ious::consumed_by.is_null()),
            StateStatus::Consumed => query = query.filter(schema::ious::consumed_by.is_not_null()),
            StateStatus::All => {}
        }
        if let Some(linear_id) = linear_id {
            query = query.filter(schema::ious::linear_id.eq(linear_id.to_string()));
        }
        query
            .order(schema::ious::id.asc())
            .select(IouRow::as_select())
            .load::<IouRow>(conn.borrow_mut())?
            .into_iter()
            .map(RecordedIou::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::store;
    use iou_contract::{Command, Commands, KeyPair, Party, TransactionBuilder};

    #[test]
    fn test_by_linear_id_filters_other_ious() {
        let store = store();
        let notary = Party::new("Notary", KeyPair::generate().public_key());
        let (lender, borrower) = (KeyPair::generate(), KeyPair::generate());
        let mut ids = vec![];
        for value in [1, 2] {
            let state = IouState::new(value, lender.public_key(), borrower.public_key());
            ids.push(state.linear_id);
            let stx = TransactionBuilder::new(notary.clone())
                .add_output_state(state.clone())
                .add_command(Command::new(Commands::Create, state.participants()))
                .sign_with([&lender, &borrower]);
            store.transactions().record(&stx, |_| true).unwrap();
        }

        let found = store
            .ious()
            .by_linear_id(&ids[1], StateStatus::Unconsumed)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].state_and_ref.state.value, 2);
        assert!(!found[0].is_consumed());
        assert!(store
            .ious()
            .by_linear_id(&UniqueIdentifier::new(), StateStatus::All)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_state_status_from_json() {
        let status: StateStatus = serde_json::from_str("\"consumed\"").unwrap();
        assert_eq!(status, StateStatus::Consumed);
        assert_eq!(StateStatus::default(), StateStatus::Unconsumed);
    }
}
