use crate::ious::NewIou;
use crate::schema;
use crate::ConnectionPool;
use crate::Error;
use diesel::prelude::*;
use iou_contract::{IouState, SecureHash, SignedTransaction, StateRef};
use std::borrow::BorrowMut;
use tracing::debug;

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct TransactionRow {
    id: String,
    /// JSON encoded [`SignedTransaction`].
    body: String,
}

pub struct TransactionRepository {
    pool: ConnectionPool,
}

impl TransactionRepository {
    pub(crate) fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Records a finalised transaction.
    ///
    /// Inputs known to this vault are marked consumed and every output for
    /// which `is_relevant` holds becomes a vault state. Returns `false` when
    /// the transaction was already recorded, in which case nothing changes.
    pub fn record<F>(&self, stx: &SignedTransaction, is_relevant: F) -> Result<bool, Error>
    where
        F: Fn(&IouState) -> bool,
    {
        let id = stx.id().to_string();
        let body = serde_json::to_string(stx)?;
        let mut conn = self.pool.get()?;
        conn.borrow_mut().transaction::<bool, Error, _>(|conn| {
            let inserted = diesel::insert_or_ignore_into(schema::transactions::table)
                .values(&TransactionRow {
                    id: id.clone(),
                    body,
                })
                .execute(conn)?;
            if inserted == 0 {
                debug!(tx_id = %id, "transaction already recorded");
                return Ok(false);
            }

            for input in &stx.tx.inputs {
                diesel::update(
                    schema::ious::table
                        .filter(schema::ious::tx_id.eq(input.txhash.to_string()))
                        .filter(schema::ious::output_index.eq(input.index as i32)),
                )
                .set(schema::ious::consumed_by.eq(Some(id.clone())))
                .execute(conn)?;
            }

            let new_ious: Vec<NewIou> = stx
                .tx
                .outputs
                .iter()
                .enumerate()
                .filter(|(_, state)| is_relevant(state))
                .map(|(index, state)| NewIou::new(&id, index as i32, state))
                .collect();
            if !new_ious.is_empty() {
                diesel::insert_into(schema::ious::table)
                    .values(&new_ious)
                    .execute(conn)?;
            }

            debug!(
                tx_id = %id,
                consumed = stx.tx.inputs.len(),
                produced = new_ious.len(),
                "recorded transaction"
            );
            Ok(true)
        })
    }

    pub fn get(&self, id: &SecureHash) -> Result<Option<SignedTransaction>, Error> {
        let mut conn = self.pool.get()?;
        let body = schema::transactions::table
            .find(id.to_string())
            .select(schema::transactions::body)
            .first::<String>(conn.borrow_mut())
            .optional()?;
        Ok(body.map(|b| serde_json::from_str(&b)).transpose()?)
    }

    pub fn contains(&self, id: &SecureHash) -> Result<bool, Error> {
        let mut conn = self.pool.get()?;
        let count: i64 = schema::transactions::table
            .find(id.to_string())
            .count()
            .get_result(conn.borrow_mut())?;
        Ok(count > 0)
    }

    /// Looks up the state a reference points at in a recorded transaction.
    pub fn resolve_state(&self, state_ref: &StateRef) -> Result<Option<IouState>, Error> {
        Ok(self
            .get(&state_ref.txhash)?
            .and_then(|stx| stx.tx.outputs.get(state_ref.index as usize).cloned()))
    }

    pub fn count(&self) -> Result<i64, Error> {
        let mut conn = self.pool.get()?;
        Ok(schema::transactions::table
            .count()
            .get_result(conn.borrow_mut())?)
    }
}
