//! SQLite storage bootstrap, schema migrations and database handles.
//!
//! # Responsibility
//! - Open and configure SQLite connections for DAO consumers.
//! - Apply application-supplied schema migrations in deterministic order.
//! - Own the connection behind a handle that runs units of work.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - DAO code must not read/write application data before migrations succeed.
//! - Every unit of work on a `Database` is serialized through one lock.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod database;
pub mod migrations;
mod open;

pub use database::{Database, DatabaseDefinition, TransactionExecutor};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Migration list is not strictly increasing at `version`.
    InvalidMigrationOrder {
        version: u32,
    },
    /// A unit of work tried to take the handle it is already running on.
    ReentrantUnitOfWork(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidMigrationOrder { version } => write!(
                f,
                "migration version {version} is not greater than the previous migration"
            ),
            Self::ReentrantUnitOfWork(name) => write!(
                f,
                "database `{name}` is already held by the current unit of work"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidMigrationOrder { .. } => None,
            Self::ReentrantUnitOfWork(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
