//! Select/delete/count statement builders for one table.
//!
//! # Invariants
//! - Table and column identifiers are validated before rendering.
//! - All operand values travel as bound parameters.

use super::condition::{checked_identifier, render_where, Condition};
use crate::dao::DaoResult;
use crate::model::Model;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Sort direction for `Select::order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// `SELECT * FROM <table>` with optional filter, ordering and paging.
#[derive(Debug, Clone)]
pub struct Select {
    table: String,
    conditions: Vec<Condition>,
    ordering: Vec<(String, Order)>,
    limit: Option<u32>,
    offset: u32,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            ordering: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Adds every condition; all of them must hold for a row to match.
    pub fn where_all(mut self, conditions: &[Condition]) -> Self {
        self.conditions.extend_from_slice(conditions);
        self
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.ordering.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Renders SQL text and bind values.
    pub fn to_sql(&self) -> DaoResult<(String, Vec<Value>)> {
        let mut binds = Vec::new();
        let mut sql = format!("SELECT * FROM {}", checked_identifier(&self.table)?);

        if let Some(filter) = render_where(&self.conditions, &mut binds)? {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }

        if !self.ordering.is_empty() {
            let terms = self
                .ordering
                .iter()
                .map(|(column, order)| {
                    checked_identifier(column).map(|column| format!("{column} {}", order.as_sql()))
                })
                .collect::<DaoResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                binds.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(Value::Integer(i64::from(self.offset)));
        }

        Ok((sql, binds))
    }

    /// Executes and maps every matching row.
    pub fn query_list<E: Model>(&self, conn: &Connection) -> DaoResult<Vec<E>> {
        let (sql, binds) = self.to_sql()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds.iter()))?;
        let mut items = Vec::new();

        while let Some(row) = rows.next()? {
            items.push(E::from_row(row)?);
        }

        Ok(items)
    }

    /// Executes and maps the first matching row, if any.
    pub fn query_single<E: Model>(&self, conn: &Connection) -> DaoResult<Option<E>> {
        let first = if self.limit.is_some() {
            self.clone()
        } else {
            self.clone().limit(1)
        };
        Ok(first.query_list(conn)?.into_iter().next())
    }
}

/// `DELETE FROM <table>` with optional filter.
#[derive(Debug, Clone)]
pub struct Delete {
    table: String,
    conditions: Vec<Condition>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
        }
    }

    pub fn where_all(mut self, conditions: &[Condition]) -> Self {
        self.conditions.extend_from_slice(conditions);
        self
    }

    pub fn to_sql(&self) -> DaoResult<(String, Vec<Value>)> {
        let mut binds = Vec::new();
        let mut sql = format!("DELETE FROM {}", checked_identifier(&self.table)?);
        if let Some(filter) = render_where(&self.conditions, &mut binds)? {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        Ok((sql, binds))
    }

    /// Executes and returns the number of deleted rows.
    pub fn execute(&self, conn: &Connection) -> DaoResult<usize> {
        let (sql, binds) = self.to_sql()?;
        let changed = conn.execute(&sql, params_from_iter(binds.iter()))?;
        Ok(changed)
    }
}

/// `SELECT COUNT(*) FROM <table>` with optional filter.
#[derive(Debug, Clone)]
pub struct Count {
    table: String,
    conditions: Vec<Condition>,
}

impl Count {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
        }
    }

    pub fn where_all(mut self, conditions: &[Condition]) -> Self {
        self.conditions.extend_from_slice(conditions);
        self
    }

    pub fn to_sql(&self) -> DaoResult<(String, Vec<Value>)> {
        let mut binds = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", checked_identifier(&self.table)?);
        if let Some(filter) = render_where(&self.conditions, &mut binds)? {
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        Ok((sql, binds))
    }

    pub fn long_value(&self, conn: &Connection) -> DaoResult<i64> {
        let (sql, binds) = self.to_sql()?;
        let count = conn.query_row(&sql, params_from_iter(binds.iter()), |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::{Count, Delete, Order, Select};
    use crate::dao::DaoError;
    use crate::query::Column;
    use rusqlite::types::Value;

    #[test]
    fn select_renders_filter_order_and_paging() {
        let (sql, binds) = Select::from("contacts")
            .where_all(&[Column::new("age").gt(30)])
            .order_by("name", Order::Ascending)
            .order_by("age", Order::Descending)
            .limit(10)
            .offset(20)
            .to_sql()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT * FROM contacts WHERE age > ? ORDER BY name ASC, age DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            binds,
            vec![Value::Integer(30), Value::Integer(10), Value::Integer(20)]
        );
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let (sql, _) = Select::from("contacts").offset(3).to_sql().unwrap();
        assert_eq!(sql, "SELECT * FROM contacts LIMIT -1 OFFSET ?");
    }

    #[test]
    fn unfiltered_delete_and_count() {
        assert_eq!(Delete::from("contacts").to_sql().unwrap().0, "DELETE FROM contacts");
        assert_eq!(
            Count::from("contacts").to_sql().unwrap().0,
            "SELECT COUNT(*) FROM contacts"
        );
    }

    #[test]
    fn rejects_invalid_table_and_order_column() {
        assert!(matches!(
            Count::from("contacts x").to_sql(),
            Err(DaoError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            Select::from("contacts")
                .order_by("name--", Order::Ascending)
                .to_sql(),
            Err(DaoError::InvalidIdentifier(_))
        ));
    }
}
