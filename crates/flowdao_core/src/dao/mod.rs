//! Generic data access objects.
//!
//! # Responsibility
//! - Define the entity-generic CRUD/count contract (`BaseDao`).
//! - Bind that contract to one entity table and one injected database.
//!
//! # Invariants
//! - Every read/write except `delete_all` runs inside one transaction.
//! - Absent entities or sequences short-circuit without touching storage.
//! - Storage errors propagate unchanged (wrapped, with original `source()`).

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod base_dao;
pub mod sqlite_dao;

pub use base_dao::BaseDao;
pub use sqlite_dao::SqliteDao;

pub type DaoResult<T> = Result<T, DaoError>;

/// Error for DAO, statement and model operations.
#[derive(Debug)]
pub enum DaoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Table or column name is not a plain identifier.
    InvalidIdentifier(String),
    /// Condition operands do not fit its operator.
    InvalidCondition(String),
    /// Model description or persisted data is inconsistent.
    InvalidData(String),
    /// Entity table is missing from the connected schema.
    MissingRequiredTable(&'static str),
    /// Declared entity column is missing from its table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for DaoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(name) => write!(f, "invalid SQL identifier `{name}`"),
            Self::InvalidCondition(message) => write!(f, "invalid condition: {message}"),
            Self::InvalidData(message) => write!(f, "invalid model data: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "dao requires table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "dao requires column `{column}` in table `{table}`")
            }
        }
    }
}

impl Error for DaoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidIdentifier(_) => None,
            Self::InvalidCondition(_) => None,
            Self::InvalidData(_) => None,
            Self::MissingRequiredTable(_) => None,
            Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<DbError> for DaoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for DaoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
