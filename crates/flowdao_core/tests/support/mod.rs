#![allow(dead_code)]

use flowdao_core::{Database, DatabaseDefinition, DbError, Migration, Model, TransactionExecutor};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use std::cell::Cell;
use uuid::Uuid;

pub const CONTACTS_DB: DatabaseDefinition = DatabaseDefinition::new(
    "contacts",
    &[
        Migration::new(
            1,
            "CREATE TABLE contacts (
                id TEXT PRIMARY KEY NOT NULL,
                name TEXT NOT NULL,
                age INTEGER NOT NULL CHECK (age >= 0)
            );",
        ),
        Migration::new(2, "ALTER TABLE contacts ADD COLUMN email TEXT;"),
    ],
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

impl Contact {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: None,
            age,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

impl Model for Contact {
    const TABLE: &'static str = "contacts";
    const COLUMNS: &'static [&'static str] = &["id", "name", "email", "age"];
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            age: row.get("age")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.clone()),
            Value::from(self.name.clone()),
            Value::from(self.email.clone()),
            Value::from(self.age),
        ]
    }
}

pub fn contacts_db() -> Database {
    Database::open_in_memory(&CONTACTS_DB).unwrap()
}

pub fn sorted(mut contacts: Vec<Contact>) -> Vec<Contact> {
    contacts.sort_by(|a, b| a.id.cmp(&b.id));
    contacts
}

/// Executor decorator that records how many units of work reach storage.
pub struct CountingExecutor {
    inner: Database,
    transactions: Cell<usize>,
    direct: Cell<usize>,
}

impl CountingExecutor {
    pub fn new(inner: Database) -> Self {
        Self {
            inner,
            transactions: Cell::new(0),
            direct: Cell::new(0),
        }
    }

    pub fn transactions(&self) -> usize {
        self.transactions.get()
    }

    pub fn direct_calls(&self) -> usize {
        self.direct.get()
    }
}

impl TransactionExecutor for CountingExecutor {
    fn execute_transaction<T, E>(
        &self,
        unit: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        self.transactions.set(self.transactions.get() + 1);
        self.inner.execute_transaction(unit)
    }

    fn execute_direct<T, E>(&self, unit: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        self.direct.set(self.direct.get() + 1);
        self.inner.execute_direct(unit)
    }
}
