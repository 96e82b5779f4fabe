use crate::schema;
use crate::ConnectionPool;
use crate::Error;
use diesel::prelude::*;
use iou_contract::{KeyPair, PublicKey};
use std::borrow::BorrowMut;

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::signing_keys)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct SigningKeyRow {
    public_key: String,
    secret: Vec<u8>,
}

/// Private keys of the accounts this node hosts.
pub struct KeyRepository {
    pool: ConnectionPool,
}

impl KeyRepository {
    pub(crate) fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn add(&self, keys: &KeyPair) -> Result<(), Error> {
        let mut conn = self.pool.get()?;
        diesel::insert_or_ignore_into(schema::signing_keys::table)
            .values(&SigningKeyRow {
                public_key: keys.public_key().to_string(),
                secret: keys.secret_bytes(),
            })
            .execute(conn.borrow_mut())?;
        Ok(())
    }

    pub fn get(&self, key: &PublicKey) -> Result<Option<KeyPair>, Error> {
        let mut conn = self.pool.get()?;
        let secret = schema::signing_keys::table
            .find(key.to_string())
            .select(schema::signing_keys::secret)
            .first::<Vec<u8>>(conn.borrow_mut())
            .optional()?;
        secret
            .map(|bytes| {
                KeyPair::from_secret_bytes(&bytes).map_err(|e| Error::Decode {
                    field: "secret",
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn contains(&self, key: &PublicKey) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some())
    }
}
