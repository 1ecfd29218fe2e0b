//! Generic data access objects over SQLite for mobile app storage.
//! Each DAO operation wraps one statement in one transaction on an
//! explicitly injected database handle.

pub mod dao;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;

pub use dao::{BaseDao, DaoError, DaoResult, SqliteDao};
pub use db::migrations::Migration;
pub use db::{Database, DatabaseDefinition, DbError, DbResult, TransactionExecutor};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
};
pub use model::Model;
pub use query::{Column, Condition, Count, Delete, Literal, Operator, Order, Select};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
