//! SQLite-backed generic DAO.
//!
//! # Responsibility
//! - Implement `BaseDao` for any `Model` over an injected executor.
//! - Expose base statements so entity-specific DAOs can compose queries.
//!
//! # Invariants
//! - Table name and executor are fixed at construction.
//! - Each operation runs exactly one statement (or one entity loop) per
//!   transaction; `delete_all` runs as a single autocommit statement.

use super::{BaseDao, DaoError, DaoResult};
use crate::db::{Database, TransactionExecutor};
use crate::model::Model;
use crate::query::{Condition, Count, Delete, Select};
use log::debug;
use rusqlite::Connection;
use std::marker::PhantomData;

/// Generic DAO bound to the `E::TABLE` table of one database.
pub struct SqliteDao<'db, E, X = Database> {
    table: &'static str,
    db: &'db X,
    _entity: PhantomData<fn() -> E>,
}

impl<'db, E: Model, X: TransactionExecutor> SqliteDao<'db, E, X> {
    /// Binds a DAO without inspecting the schema.
    pub fn new(db: &'db X) -> Self {
        Self {
            table: E::TABLE,
            db,
            _entity: PhantomData,
        }
    }

    /// Binds a DAO after checking that `E::TABLE` and all `E::COLUMNS` exist.
    pub fn try_new(db: &'db X) -> DaoResult<Self> {
        db.execute_direct(ensure_entity_table::<E>)?;
        Ok(Self::new(db))
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn database(&self) -> &'db X {
        self.db
    }

    /// `SELECT * FROM <table>` for composing ordered or paginated queries.
    pub fn base_select(&self) -> Select {
        Select::from(self.table)
    }

    pub fn base_delete(&self) -> Delete {
        Delete::from(self.table)
    }

    pub fn base_count(&self) -> Count {
        Count::from(self.table)
    }

    /// Runs `unit` inside one transaction on the bound database.
    ///
    /// Compose further work through the `&Connection` passed to `unit`;
    /// calling back into a DAO on the same database fails fast.
    pub fn execute_transaction<T>(
        &self,
        unit: impl FnOnce(&Connection) -> DaoResult<T>,
    ) -> DaoResult<T> {
        self.db.execute_transaction(unit)
    }
}

impl<E: Model, X: TransactionExecutor> BaseDao<E> for SqliteDao<'_, E, X> {
    fn query_all(&self) -> DaoResult<Vec<E>> {
        let select = self.base_select();
        let rows = self.execute_transaction(|conn| select.query_list::<E>(conn))?;
        debug!(
            "event=dao_query module=dao status=ok table={} rows={}",
            self.table,
            rows.len()
        );
        Ok(rows)
    }

    fn query_single(&self, conditions: &[Condition]) -> DaoResult<Option<E>> {
        let select = self.base_select().where_all(conditions);
        self.execute_transaction(|conn| select.query_single::<E>(conn))
    }

    fn query(&self, conditions: &[Condition]) -> DaoResult<Vec<E>> {
        let select = self.base_select().where_all(conditions);
        self.execute_transaction(|conn| select.query_list::<E>(conn))
    }

    fn delete(&self, conditions: &[Condition]) -> DaoResult<()> {
        let delete = self.base_delete().where_all(conditions);
        self.execute_transaction(|conn| delete.execute(conn))?;
        Ok(())
    }

    fn delete_entity(&self, entity: Option<&E>) -> DaoResult<bool> {
        let Some(entity) = entity else {
            return Ok(true);
        };

        self.execute_transaction(|conn| entity.delete(conn))
    }

    fn delete_entities(&self, entities: Option<&[E]>) -> DaoResult<()> {
        let Some(entities) = entities else {
            return Ok(());
        };

        self.execute_transaction(|conn| {
            for entity in entities {
                entity.delete(conn)?;
            }
            Ok(())
        })
    }

    fn delete_all(&self) -> DaoResult<()> {
        // A lone DELETE is atomic under autocommit, so no wrapping transaction.
        let delete = self.base_delete();
        let removed = self.db.execute_direct(|conn| delete.execute(conn))?;
        debug!(
            "event=dao_delete_all module=dao status=ok table={} rows={}",
            self.table, removed
        );
        Ok(())
    }

    fn query_count(&self, conditions: &[Condition]) -> DaoResult<i64> {
        let count = self.base_count().where_all(conditions);
        self.execute_transaction(|conn| count.long_value(conn))
    }

    fn save_entity(&self, entity: Option<&E>) -> DaoResult<bool> {
        let Some(entity) = entity else {
            return Ok(false);
        };

        self.execute_transaction(|conn| {
            entity.save(conn)?;
            Ok(true)
        })
    }

    fn save_entities(&self, entities: Option<&[E]>) -> DaoResult<usize> {
        let entities = match entities {
            Some(entities) if !entities.is_empty() => entities,
            _ => return Ok(0),
        };

        let saved = self.execute_transaction(|conn| {
            for entity in entities {
                entity.save(conn)?;
            }
            Ok(entities.len())
        })?;
        debug!(
            "event=dao_save module=dao status=ok table={} rows={}",
            self.table, saved
        );
        Ok(saved)
    }
}

fn ensure_entity_table<E: Model>(conn: &Connection) -> DaoResult<()> {
    if !table_exists(conn, E::TABLE)? {
        return Err(DaoError::MissingRequiredTable(E::TABLE));
    }

    for &column in E::COLUMNS {
        if !table_has_column(conn, E::TABLE, column)? {
            return Err(DaoError::MissingRequiredColumn {
                table: E::TABLE,
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> DaoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> DaoResult<bool> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let mut rows = stmt.query([table])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(0)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
