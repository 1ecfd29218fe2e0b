//! `Model` trait and its default row-level SQL.

use crate::dao::{DaoError, DaoResult};
use crate::query::condition::checked_identifier;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};

/// A record type persisted as one row of `TABLE`.
///
/// Implementors describe their shape; the default methods generate the
/// row-level statements. Every method takes the connection it must use,
/// which is how DAOs keep them inside a surrounding transaction.
pub trait Model: Sized {
    /// Backing table name.
    const TABLE: &'static str;
    /// Persisted columns, in `to_values()` order.
    const COLUMNS: &'static [&'static str];
    /// Identity columns (subset of `COLUMNS`).
    const PRIMARY_KEY: &'static [&'static str];

    /// Maps one `SELECT *` row back to the record.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Column values, one per `COLUMNS` entry.
    fn to_values(&self) -> Vec<Value>;

    /// Inserts the row, or updates it in place when the identity exists.
    ///
    /// Returns whether a row was written. The identity must be set by the
    /// caller: an auto-assigned rowid is never written back to `self`, so a
    /// record with a NULL `INTEGER PRIMARY KEY` is inserted again on every
    /// call. For such tables, `insert` first and read
    /// `Connection::last_insert_rowid()` in the same unit of work.
    fn save(&self, conn: &Connection) -> DaoResult<bool> {
        let values = checked_values(self)?;
        let columns = checked_columns::<Self>()?;
        let keys = key_columns::<Self>()?.join(", ");
        let data_columns = data_columns::<Self>();

        let conflict = if data_columns.is_empty() {
            "DO NOTHING".to_string()
        } else {
            let assignments = data_columns
                .iter()
                .map(|column| format!("{column} = excluded.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET {assignments}")
        };

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({keys}) {conflict};",
            checked_identifier(Self::TABLE)?,
            columns.join(", "),
            placeholders(columns.len()),
        );
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(changed > 0)
    }

    /// Inserts the row; fails on an identity conflict.
    fn insert(&self, conn: &Connection) -> DaoResult<bool> {
        let values = checked_values(self)?;
        let columns = checked_columns::<Self>()?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            checked_identifier(Self::TABLE)?,
            columns.join(", "),
            placeholders(columns.len()),
        );
        let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(changed > 0)
    }

    /// Updates the row matching this identity. Returns `false` when no row
    /// matched.
    fn update(&self, conn: &Connection) -> DaoResult<bool> {
        let values = checked_values(self)?;
        let keys = key_columns::<Self>()?;
        let data_columns = data_columns::<Self>();
        if data_columns.is_empty() {
            return self.exists(conn);
        }

        let assignments = data_columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {};",
            checked_identifier(Self::TABLE)?,
            key_filter(&keys),
        );

        let mut binds = Vec::with_capacity(values.len());
        for (column, value) in Self::COLUMNS.iter().zip(values.iter()) {
            if !Self::PRIMARY_KEY.contains(column) {
                binds.push(value);
            }
        }
        binds.extend(key_values::<Self>(&values));

        let changed = conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed > 0)
    }

    /// Deletes the row matching this identity. Returns `false` when no row
    /// matched.
    fn delete(&self, conn: &Connection) -> DaoResult<bool> {
        let values = checked_values(self)?;
        let keys = key_columns::<Self>()?;
        let sql = format!(
            "DELETE FROM {} WHERE {};",
            checked_identifier(Self::TABLE)?,
            key_filter(&keys),
        );
        let changed = conn.execute(&sql, params_from_iter(key_values::<Self>(&values)))?;
        Ok(changed > 0)
    }

    /// Returns whether a row with this identity is stored.
    fn exists(&self, conn: &Connection) -> DaoResult<bool> {
        let values = checked_values(self)?;
        let keys = key_columns::<Self>()?;
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {});",
            checked_identifier(Self::TABLE)?,
            key_filter(&keys),
        );
        let exists: i64 = conn.query_row(
            &sql,
            params_from_iter(key_values::<Self>(&values)),
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn checked_values<M: Model>(entity: &M) -> DaoResult<Vec<Value>> {
    let values = entity.to_values();
    if values.len() != M::COLUMNS.len() {
        return Err(DaoError::InvalidData(format!(
            "model `{}` produced {} values for {} columns",
            M::TABLE,
            values.len(),
            M::COLUMNS.len()
        )));
    }
    Ok(values)
}

fn checked_columns<M: Model>() -> DaoResult<Vec<&'static str>> {
    M::COLUMNS
        .iter()
        .map(|column| checked_identifier(column).map(|_| *column))
        .collect()
}

fn key_columns<M: Model>() -> DaoResult<Vec<&'static str>> {
    if M::PRIMARY_KEY.is_empty() {
        return Err(DaoError::InvalidData(format!(
            "model `{}` declares no primary key",
            M::TABLE
        )));
    }

    for key in M::PRIMARY_KEY {
        checked_identifier(key)?;
        if !M::COLUMNS.contains(key) {
            return Err(DaoError::InvalidData(format!(
                "primary key `{key}` of model `{}` is not a declared column",
                M::TABLE
            )));
        }
    }
    Ok(M::PRIMARY_KEY.to_vec())
}

fn data_columns<M: Model>() -> Vec<&'static str> {
    M::COLUMNS
        .iter()
        .copied()
        .filter(|column| !M::PRIMARY_KEY.contains(column))
        .collect()
}

/// Identity values, in `PRIMARY_KEY` order.
fn key_values<'v, M: Model>(values: &'v [Value]) -> Vec<&'v Value> {
    M::PRIMARY_KEY
        .iter()
        .filter_map(|key| {
            M::COLUMNS
                .iter()
                .position(|column| column == key)
                .map(|index| &values[index])
        })
        .collect()
}

fn key_filter(keys: &[&str]) -> String {
    keys.iter()
        .map(|key| format!("{key} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::Model;
    use crate::dao::DaoError;
    use rusqlite::types::Value;
    use rusqlite::{Connection, Row};

    #[derive(Debug, Clone, PartialEq)]
    struct Setting {
        key: String,
        value: Option<String>,
    }

    impl Model for Setting {
        const TABLE: &'static str = "settings";
        const COLUMNS: &'static [&'static str] = &["key", "value"];
        const PRIMARY_KEY: &'static [&'static str] = &["key"];

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                key: row.get("key")?,
                value: row.get("value")?,
            })
        }

        fn to_values(&self) -> Vec<Value> {
            vec![Value::from(self.key.clone()), Value::from(self.value.clone())]
        }
    }

    struct Broken;

    impl Model for Broken {
        const TABLE: &'static str = "settings";
        const COLUMNS: &'static [&'static str] = &["key", "value"];
        const PRIMARY_KEY: &'static [&'static str] = &["missing"];

        fn from_row(_row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self)
        }

        fn to_values(&self) -> Vec<Value> {
            vec![Value::Null, Value::Null]
        }
    }

    fn settings_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE settings (key TEXT PRIMARY KEY NOT NULL, value TEXT);")
            .unwrap();
        conn
    }

    fn setting(key: &str, value: &str) -> Setting {
        Setting {
            key: key.to_string(),
            value: Some(value.to_string()),
        }
    }

    fn stored_value(conn: &Connection, key: &str) -> Option<String> {
        conn.query_row("SELECT value FROM settings WHERE key = ?1;", [key], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn save_inserts_then_updates_in_place() {
        let conn = settings_conn();
        assert!(setting("theme", "dark").save(&conn).unwrap());
        assert!(setting("theme", "light").save(&conn).unwrap());

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(stored_value(&conn, "theme").as_deref(), Some("light"));
    }

    #[test]
    fn insert_rejects_duplicate_identity() {
        let conn = settings_conn();
        setting("lang", "en").insert(&conn).unwrap();
        let err = setting("lang", "fr").insert(&conn).unwrap_err();
        assert!(matches!(err, DaoError::Db(_)));
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let conn = settings_conn();
        let missing = setting("absent", "x");
        assert!(!missing.update(&conn).unwrap());
        assert!(!missing.delete(&conn).unwrap());

        missing.insert(&conn).unwrap();
        assert!(missing.exists(&conn).unwrap());
        assert!(setting("absent", "y").update(&conn).unwrap());
        assert_eq!(stored_value(&conn, "absent").as_deref(), Some("y"));
        assert!(missing.delete(&conn).unwrap());
        assert!(!missing.exists(&conn).unwrap());
    }

    #[test]
    fn undeclared_primary_key_is_invalid_data() {
        let conn = settings_conn();
        let err = Broken.delete(&conn).unwrap_err();
        assert!(matches!(err, DaoError::InvalidData(_)));
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Option<i64>,
        body: String,
    }

    impl Model for Note {
        const TABLE: &'static str = "notes";
        const COLUMNS: &'static [&'static str] = &["id", "body"];
        const PRIMARY_KEY: &'static [&'static str] = &["id"];

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                body: row.get("body")?,
            })
        }

        fn to_values(&self) -> Vec<Value> {
            vec![Value::from(self.id), Value::from(self.body.clone())]
        }
    }

    fn notes_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);")
            .unwrap();
        conn
    }

    fn note_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn save_without_identity_inserts_a_new_row_each_time() {
        let conn = notes_conn();
        let draft = Note {
            id: None,
            body: "draft".to_string(),
        };

        assert!(draft.save(&conn).unwrap());
        assert!(draft.save(&conn).unwrap());
        assert_eq!(note_count(&conn), 2);
    }

    #[test]
    fn assigned_rowid_makes_later_saves_update_in_place() {
        let conn = notes_conn();
        let mut note = Note {
            id: None,
            body: "draft".to_string(),
        };

        assert!(note.insert(&conn).unwrap());
        note.id = Some(conn.last_insert_rowid());
        note.body = "final".to_string();
        assert!(note.save(&conn).unwrap());

        assert_eq!(note_count(&conn), 1);
        let stored = conn
            .query_row("SELECT * FROM notes;", [], |row| Note::from_row(row))
            .unwrap();
        assert_eq!(stored, note);
    }
}
