//! Per-node vault: recorded transactions, the IOU states they produced,
//! known accounts, signing keys and in-flight flow checkpoints.
pub mod accounts;
pub mod checkpoints;
pub mod error;
pub mod ious;
pub mod keys;
pub mod schema;
pub mod transactions;

use accounts::AccountRepository;
use checkpoints::CheckpointRepository;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
pub use error::Error;
use ious::IouRepository;
use keys::KeyRepository;
use std::borrow::BorrowMut;
use std::path::PathBuf;
use transactions::TransactionRepository;

pub use checkpoints::Checkpoint;
pub use ious::{RecordedIou, StateStatus};

#[derive(serde::Deserialize, Debug, Clone)]
pub struct Config {
    /// Directory holding one database file per node, or `:memory:`.
    pub path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: ":memory:".to_owned(),
        }
    }
}

impl Config {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    pub fn database_url(&self, node: &str) -> String {
        if self.is_in_memory() {
            return self.path.clone();
        }
        let file = format!("{}.sqlite", node.to_lowercase().replace(' ', "_"));
        PathBuf::from(&self.path)
            .join(file)
            .to_string_lossy()
            .into_owned()
    }
}

pub trait Update {
    fn has_updates(&self) -> Result<bool, Error>;
    fn update(&self) -> Result<(), Error>;
}

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
type ConnectionType = SqliteConnection;
type ConnectionPool = Pool<ConnectionManager<ConnectionType>>;

#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<ConnectionType, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut ConnectionType) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

#[derive(Clone)]
pub struct IouStore {
    pool: ConnectionPool,
}

impl IouStore {
    pub fn open<S: Into<String>>(store_url: S) -> Result<Self, Error> {
        let manager = ConnectionManager::<ConnectionType>::new(store_url);

        Ok(Self {
            pool: Pool::builder()
                .connection_customizer(Box::new(ConnectionOptions))
                .build(manager)?,
        })
    }

    /// Every connection to `:memory:` is a fresh database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn open_in_memory() -> Result<Self, Error> {
        let manager = ConnectionManager::<ConnectionType>::new(":memory:");

        Ok(Self {
            pool: Pool::builder()
                .max_size(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connection_customizer(Box::new(ConnectionOptions))
                .build(manager)?,
        })
    }

    pub fn open_for_node(config: &Config, node: &str) -> Result<Self, Error> {
        if config.is_in_memory() {
            Self::open_in_memory()
        } else {
            std::fs::create_dir_all(&config.path)
                .map_err(|e| Error::Migration(format!("cannot create {}: {e}", config.path)))?;
            Self::open(config.database_url(node))
        }
    }

    pub fn ious(&self) -> IouRepository {
        IouRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    pub fn accounts(&self) -> AccountRepository {
        AccountRepository::new(self.pool.clone())
    }

    pub fn keys(&self) -> KeyRepository {
        KeyRepository::new(self.pool.clone())
    }

    pub fn checkpoints(&self) -> CheckpointRepository {
        CheckpointRepository::new(self.pool.clone())
    }
}

impl Update for IouStore {
    fn has_updates(&self) -> Result<bool, Error> {
        self.pool
            .get()?
            .borrow_mut()
            .has_pending_migration(MIGRATIONS)
            .map_err(|e| Error::Migration(e.to_string()))
    }

    fn update(&self) -> Result<(), Error> {
        self.pool
            .get()?
            .borrow_mut()
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }
}
