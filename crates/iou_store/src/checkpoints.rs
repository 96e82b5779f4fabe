use crate::schema;
use crate::ConnectionPool;
use crate::Error;
use diesel::prelude::*;
use serde::Serialize;
use std::borrow::BorrowMut;

/// Last known progress of a flow that has not completed yet.
#[derive(Queryable, Selectable, Insertable, Serialize, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = schema::checkpoints)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Checkpoint {
    pub flow_id: String,
    pub flow_name: String,
    pub step: String,
    pub status: String,
    pub tx_id: Option<String>,
    /// Unix time in seconds.
    pub updated_at: i64,
}

pub struct CheckpointRepository {
    pool: ConnectionPool,
}

impl CheckpointRepository {
    pub(crate) fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), Error> {
        let mut conn = self.pool.get()?;
        diesel::replace_into(schema::checkpoints::table)
            .values(checkpoint)
            .execute(conn.borrow_mut())?;
        Ok(())
    }

    pub fn get(&self, flow_id: &str) -> Result<Option<Checkpoint>, Error> {
        let mut conn = self.pool.get()?;
        Ok(schema::checkpoints::table
            .find(flow_id)
            .select(Checkpoint::as_select())
            .first(conn.borrow_mut())
            .optional()?)
    }

    pub fn all(&self) -> Result<Vec<Checkpoint>, Error> {
        let mut conn = self.pool.get()?;
        Ok(schema::checkpoints::table
            .order(schema::checkpoints::updated_at.asc())
            .select(Checkpoint::as_select())
            .load(conn.borrow_mut())?)
    }

    pub fn with_status(&self, status: &str) -> Result<Vec<Checkpoint>, Error> {
        let mut conn = self.pool.get()?;
        Ok(schema::checkpoints::table
            .filter(schema::checkpoints::status.eq(status))
            .order(schema::checkpoints::updated_at.asc())
            .select(Checkpoint::as_select())
            .load(conn.borrow_mut())?)
    }

    pub fn remove(&self, flow_id: &str) -> Result<(), Error> {
        let mut conn = self.pool.get()?;
        diesel::delete(schema::checkpoints::table.find(flow_id)).execute(conn.borrow_mut())?;
        Ok(())
    }
}
