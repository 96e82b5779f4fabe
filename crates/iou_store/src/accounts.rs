use crate::error::parse;
use crate::schema;
use crate::ConnectionPool;
use crate::Error;
use diesel::prelude::*;
use iou_contract::{AccountInfo, Party, PublicKey, UniqueIdentifier};
use std::borrow::BorrowMut;

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct AccountRow {
    id: String,
    name: String,
    host_name: String,
    host_key: String,
    public_key: String,
}

impl From<&AccountInfo> for AccountRow {
    fn from(account: &AccountInfo) -> Self {
        Self {
            id: account.identifier.to_string(),
            name: account.name.clone(),
            host_name: account.host.name.clone(),
            host_key: account.host.owning_key.to_string(),
            public_key: account.key.to_string(),
        }
    }
}

impl TryFrom<AccountRow> for AccountInfo {
    type Error = Error;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(AccountInfo {
            name: row.name,
            host: Party::new(row.host_name, parse("host_key", &row.host_key)?),
            identifier: parse("id", &row.id)?,
            key: parse("public_key", &row.public_key)?,
        })
    }
}

/// Accounts created locally or shared by other nodes.
pub struct AccountRepository {
    pool: ConnectionPool,
}

impl AccountRepository {
    pub(crate) fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Stores an account, replacing any earlier copy with the same identifier.
    pub fn add(&self, account: &AccountInfo) -> Result<(), Error> {
        let mut conn = self.pool.get()?;
        diesel::replace_into(schema::accounts::table)
            .values(&AccountRow::from(account))
            .execute(conn.borrow_mut())?;
        Ok(())
    }

    pub fn by_id(&self, id: &UniqueIdentifier) -> Result<Option<AccountInfo>, Error> {
        let mut conn = self.pool.get()?;
        schema::accounts::table
            .find(id.to_string())
            .select(AccountRow::as_select())
            .first::<AccountRow>(conn.borrow_mut())
            .optional()?
            .map(AccountInfo::try_from)
            .transpose()
    }

    pub fn by_key(&self, key: &PublicKey) -> Result<Option<AccountInfo>, Error> {
        let mut conn = self.pool.get()?;
        schema::accounts::table
            .filter(schema::accounts::public_key.eq(key.to_string()))
            .select(AccountRow::as_select())
            .first::<AccountRow>(conn.borrow_mut())
            .optional()?
            .map(AccountInfo::try_from)
            .transpose()
    }

    /// Account names are not unique across hosts.
    pub fn by_name(&self, name: &str) -> Result<Vec<AccountInfo>, Error> {
        let mut conn = self.pool.get()?;
        schema::accounts::table
            .filter(schema::accounts::name.eq(name))
            .select(AccountRow::as_select())
            .load::<AccountRow>(conn.borrow_mut())?
            .into_iter()
            .map(AccountInfo::try_from)
            .collect()
    }

    pub fn all(&self) -> Result<Vec<AccountInfo>, Error> {
        let mut conn = self.pool.get()?;
        schema::accounts::table
            .order(schema::accounts::name.asc())
            .select(AccountRow::as_select())
            .load::<AccountRow>(conn.borrow_mut())?
            .into_iter()
            .map(AccountInfo::try_from)
            .collect()
    }

}
