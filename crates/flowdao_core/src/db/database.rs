//! Database handle and unit-of-work executor.
//!
//! # Responsibility
//! - Own one bootstrapped SQLite connection per logical database.
//! - Run units of work inside `BEGIN ... COMMIT`, rolling back on failure.
//!
//! # Invariants
//! - Units of work never overlap on the same handle (single writer).
//! - A failed unit of work leaves no partial writes behind.
//! - A unit of work re-entering its own handle fails fast instead of blocking.
//! - A panicking unit of work does not disable the handle for later callers.

use super::migrations::{current_user_version, latest_version, Migration};
use super::open::{open_db, open_db_in_memory};
use super::{DbError, DbResult};
use log::{debug, warn};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Static description of one application database.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseDefinition {
    /// Logical name used in logs and error messages.
    pub name: &'static str,
    /// Schema steps in strictly increasing version order.
    pub migrations: &'static [Migration],
}

impl DatabaseDefinition {
    pub const fn new(name: &'static str, migrations: &'static [Migration]) -> Self {
        Self { name, migrations }
    }

    /// Schema version this definition migrates to.
    pub fn version(&self) -> u32 {
        latest_version(self.migrations)
    }
}

/// Runs units of work against a live connection.
///
/// DAOs are generic over this trait so callers can inject any handle
/// (or a wrapping decorator) instead of resolving one globally.
pub trait TransactionExecutor {
    /// Runs `unit` inside one transaction. Commits when `unit` returns `Ok`,
    /// rolls back otherwise.
    fn execute_transaction<T, E>(
        &self,
        unit: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>;

    /// Runs `unit` on the connection without opening an explicit transaction.
    /// Each statement commits on its own (SQLite autocommit).
    fn execute_direct<T, E>(&self, unit: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>;
}

/// Handle to one logical SQLite database.
///
/// Shareable across threads via `Arc<Database>`; all access is serialized.
/// The handle is not re-entrant: work composed inside a unit must use the
/// `&Connection` the unit receives, not call back into a DAO on this handle.
pub struct Database {
    name: String,
    conn: Mutex<Connection>,
    holder: Mutex<Option<ThreadId>>,
}

impl Database {
    /// Opens (and migrates) a database file for `definition`.
    pub fn open(path: impl AsRef<Path>, definition: &DatabaseDefinition) -> DbResult<Self> {
        let conn = open_db(path, definition)?;
        Ok(Self::from_connection(definition.name, conn))
    }

    /// Opens (and migrates) a private in-memory database for `definition`.
    pub fn open_in_memory(definition: &DatabaseDefinition) -> DbResult<Self> {
        let conn = open_db_in_memory(definition)?;
        Ok(Self::from_connection(definition.name, conn))
    }

    /// Adopts an already configured connection as-is.
    pub fn from_connection(name: impl Into<String>, conn: Connection) -> Self {
        Self {
            name: name.into(),
            conn: Mutex::new(conn),
            holder: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current `PRAGMA user_version` of the underlying connection.
    pub fn schema_version(&self) -> DbResult<u32> {
        let conn = self.lock()?;
        current_user_version(&conn)
    }

    fn lock(&self) -> DbResult<HeldConnection<'_>> {
        let current = thread::current().id();
        if *self.holder_slot() == Some(current) {
            warn!(
                "event=db_lock module=db status=reentrant database={}",
                self.name
            );
            return Err(DbError::ReentrantUnitOfWork(self.name.clone()));
        }

        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => self.recover(poisoned)?,
        };
        *self.holder_slot() = Some(current);
        Ok(HeldConnection {
            guard,
            holder: &self.holder,
        })
    }

    fn holder_slot(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes over a connection whose previous holder panicked. Any transaction
    /// the panic left open is rolled back before the connection is reused.
    fn recover<'a>(
        &'a self,
        poisoned: PoisonError<MutexGuard<'a, Connection>>,
    ) -> DbResult<MutexGuard<'a, Connection>> {
        let guard = poisoned.into_inner();
        self.conn.clear_poison();
        if !guard.is_autocommit() {
            guard.execute_batch("ROLLBACK;")?;
        }
        warn!(
            "event=db_lock module=db status=recovered database={}",
            self.name
        );
        Ok(guard)
    }
}

/// Connection guard that records which thread holds the handle.
struct HeldConnection<'a> {
    guard: MutexGuard<'a, Connection>,
    holder: &'a Mutex<Option<ThreadId>>,
}

impl Deref for HeldConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.guard
    }
}

impl DerefMut for HeldConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.guard
    }
}

impl Drop for HeldConnection<'_> {
    fn drop(&mut self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TransactionExecutor for Database {
    fn execute_transaction<T, E>(
        &self,
        unit: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(DbError::from)?;

        match unit(&*tx) {
            Ok(value) => {
                tx.commit().map_err(DbError::from)?;
                debug!(
                    "event=db_transaction module=db status=ok database={}",
                    self.name
                );
                Ok(value)
            }
            Err(err) => {
                // Dropping `tx` rolls back.
                drop(tx);
                warn!(
                    "event=db_transaction module=db status=rollback database={}",
                    self.name
                );
                Err(err)
            }
        }
    }

    fn execute_direct<T, E>(&self, unit: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let conn = self.lock()?;
        unit(&*conn)
    }
}

#[cfg(test)]
mod tests {
    use super::{Database, DatabaseDefinition, TransactionExecutor};
    use crate::db::migrations::Migration;
    use crate::db::DbError;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    const DEFINITION: DatabaseDefinition = DatabaseDefinition::new(
        "unit",
        &[Migration::new(
            1,
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT NOT NULL);",
        )],
    );

    fn count_items(db: &Database) -> i64 {
        db.execute_direct(|conn| {
            conn.query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
                .map_err(DbError::from)
        })
        .unwrap()
    }

    #[test]
    fn open_in_memory_reports_definition_version() {
        let db = Database::open_in_memory(&DEFINITION).unwrap();
        assert_eq!(db.name(), "unit");
        assert_eq!(db.schema_version().unwrap(), DEFINITION.version());
    }

    #[test]
    fn committed_unit_is_visible() {
        let db = Database::open_in_memory(&DEFINITION).unwrap();
        db.execute_transaction(|conn| {
            conn.execute("INSERT INTO items (label) VALUES ('a');", [])
                .map_err(DbError::from)
        })
        .unwrap();

        assert_eq!(count_items(&db), 1);
    }

    #[test]
    fn failed_unit_rolls_back_earlier_writes() {
        let db = Database::open_in_memory(&DEFINITION).unwrap();
        let result: Result<(), DbError> = db.execute_transaction(|conn| {
            conn.execute("INSERT INTO items (label) VALUES ('a');", [])?;
            conn.execute("INSERT INTO items (label) VALUES (NULL);", [])?;
            Ok(())
        });

        assert!(matches!(result, Err(DbError::Sqlite(_))));
        assert_eq!(count_items(&db), 0);
    }

    #[test]
    fn nested_unit_on_same_handle_fails_instead_of_blocking() {
        let db = Database::open_in_memory(&DEFINITION).unwrap();
        let result: Result<i64, DbError> = db.execute_transaction(|_conn| {
            db.execute_direct(|conn| {
                conn.query_row("SELECT COUNT(*) FROM items;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
        });

        assert!(matches!(result, Err(DbError::ReentrantUnitOfWork(name)) if name == "unit"));
        assert_eq!(count_items(&db), 0);
    }

    #[test]
    fn panicking_unit_rolls_back_and_leaves_handle_usable() {
        let db = Database::open_in_memory(&DEFINITION).unwrap();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), DbError> = db.execute_transaction(|conn| {
                conn.execute("INSERT INTO items (label) VALUES ('a');", [])?;
                panic!("unit of work failed mid-way");
            });
        }));
        assert!(outcome.is_err());

        assert_eq!(count_items(&db), 0);
        db.execute_transaction(|conn| {
            conn.execute("INSERT INTO items (label) VALUES ('b');", [])
                .map_err(DbError::from)
        })
        .unwrap();
        assert_eq!(count_items(&db), 1);
    }

    #[test]
    fn panicking_direct_unit_with_open_transaction_is_rolled_back() {
        let db = Database::open_in_memory(&DEFINITION).unwrap();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), DbError> = db.execute_direct(|conn| {
                conn.execute_batch("BEGIN; INSERT INTO items (label) VALUES ('a');")?;
                panic!("manual transaction abandoned");
            });
        }));
        assert!(outcome.is_err());

        assert_eq!(count_items(&db), 0);
        assert_eq!(db.schema_version().unwrap(), DEFINITION.version());
    }
}
