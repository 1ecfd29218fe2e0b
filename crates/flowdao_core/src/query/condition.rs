//! Filter conditions attached to select/delete/count statements.
//!
//! # Invariants
//! - Column names are validated identifiers; values are always bound, never
//!   interpolated into SQL text.
//! - Several conditions on one statement combine with `AND`.

use crate::dao::{DaoError, DaoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Returns `name` when it is a plain SQL identifier.
pub(crate) fn checked_identifier(name: &str) -> DaoResult<&str> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(name)
    } else {
        Err(DaoError::InvalidIdentifier(name.to_string()))
    }
}

/// Bindable operand value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        match value {
            Literal::Null => Value::Null,
            Literal::Integer(v) => Value::Integer(v),
            Literal::Real(v) => Value::Real(v),
            Literal::Text(v) => Value::Text(v),
            Literal::Blob(v) => Value::Blob(v),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for Literal {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Comparison applied between a column and its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    Glob,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Between,
}

impl Operator {
    fn binary_sql(self) -> Option<&'static str> {
        match self {
            Self::Eq => Some("="),
            Self::NotEq => Some("!="),
            Self::Lt => Some("<"),
            Self::LtEq => Some("<="),
            Self::Gt => Some(">"),
            Self::GtEq => Some(">="),
            Self::Like => Some("LIKE"),
            Self::NotLike => Some("NOT LIKE"),
            Self::Glob => Some("GLOB"),
            _ => None,
        }
    }
}

/// One `column <op> operand(s)` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    #[serde(default)]
    pub operands: Vec<Literal>,
}

impl Condition {
    pub fn new(column: impl Into<String>, operator: Operator, operands: Vec<Literal>) -> Self {
        Self {
            column: column.into(),
            operator,
            operands,
        }
    }

    /// Renders this predicate with `?` placeholders, appending its binds.
    pub fn render(&self, binds: &mut Vec<Value>) -> DaoResult<String> {
        let column = checked_identifier(&self.column)?;

        if let Some(op) = self.operator.binary_sql() {
            let operand = self.single_operand()?;
            binds.push(operand.clone().into());
            return Ok(format!("{column} {op} ?"));
        }

        match self.operator {
            Operator::IsNull => {
                self.expect_operands(0)?;
                Ok(format!("{column} IS NULL"))
            }
            Operator::IsNotNull => {
                self.expect_operands(0)?;
                Ok(format!("{column} IS NOT NULL"))
            }
            Operator::In | Operator::NotIn => {
                let negate = self.operator == Operator::NotIn;
                if self.operands.is_empty() {
                    // `x IN ()` is not valid SQLite; keep the statement well-formed.
                    return Ok(if negate { "1 = 1" } else { "1 = 0" }.to_string());
                }
                let placeholders = vec!["?"; self.operands.len()].join(", ");
                binds.extend(self.operands.iter().cloned().map(Value::from));
                let keyword = if negate { "NOT IN" } else { "IN" };
                Ok(format!("{column} {keyword} ({placeholders})"))
            }
            Operator::Between => {
                self.expect_operands(2)?;
                binds.extend(self.operands.iter().cloned().map(Value::from));
                Ok(format!("{column} BETWEEN ? AND ?"))
            }
            _ => Err(self.arity_error("unsupported operator")),
        }
    }

    fn single_operand(&self) -> DaoResult<&Literal> {
        self.expect_operands(1)?;
        Ok(&self.operands[0])
    }

    fn expect_operands(&self, expected: usize) -> DaoResult<()> {
        if self.operands.len() == expected {
            return Ok(());
        }
        Err(self.arity_error(&format!(
            "expected {expected} operand(s), got {}",
            self.operands.len()
        )))
    }

    fn arity_error(&self, message: &str) -> DaoError {
        DaoError::InvalidCondition(format!(
            "{:?} on `{}`: {message}",
            self.operator, self.column
        ))
    }
}

/// Renders a conjunction of conditions, or `None` when there are none.
pub(crate) fn render_where(
    conditions: &[Condition],
    binds: &mut Vec<Value>,
) -> DaoResult<Option<String>> {
    if conditions.is_empty() {
        return Ok(None);
    }

    let parts = conditions
        .iter()
        .map(|condition| condition.render(binds))
        .collect::<DaoResult<Vec<_>>>()?;
    Ok(Some(parts.join(" AND ")))
}

/// Named column used to build conditions.
///
/// ```ignore
/// let adults = Column::new("age").gt_eq(18);
/// ```
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn unary(&self, operator: Operator) -> Condition {
        Condition::new(self.name.clone(), operator, Vec::new())
    }

    fn binary(&self, operator: Operator, value: impl Into<Literal>) -> Condition {
        Condition::new(self.name.clone(), operator, vec![value.into()])
    }

    pub fn eq(&self, value: impl Into<Literal>) -> Condition {
        self.binary(Operator::Eq, value)
    }

    pub fn not_eq(&self, value: impl Into<Literal>) -> Condition {
        self.binary(Operator::NotEq, value)
    }

    pub fn lt(&self, value: impl Into<Literal>) -> Condition {
        self.binary(Operator::Lt, value)
    }

    pub fn lt_eq(&self, value: impl Into<Literal>) -> Condition {
        self.binary(Operator::LtEq, value)
    }

    pub fn gt(&self, value: impl Into<Literal>) -> Condition {
        self.binary(Operator::Gt, value)
    }

    pub fn gt_eq(&self, value: impl Into<Literal>) -> Condition {
        self.binary(Operator::GtEq, value)
    }

    pub fn like(&self, pattern: impl Into<String>) -> Condition {
        self.binary(Operator::Like, pattern.into())
    }

    pub fn not_like(&self, pattern: impl Into<String>) -> Condition {
        self.binary(Operator::NotLike, pattern.into())
    }

    pub fn glob(&self, pattern: impl Into<String>) -> Condition {
        self.binary(Operator::Glob, pattern.into())
    }

    pub fn is_null(&self) -> Condition {
        self.unary(Operator::IsNull)
    }

    pub fn is_not_null(&self) -> Condition {
        self.unary(Operator::IsNotNull)
    }

    pub fn is_in<I, V>(&self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Condition::new(
            self.name.clone(),
            Operator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in<I, V>(&self, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Condition::new(
            self.name.clone(),
            Operator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn between(&self, low: impl Into<Literal>, high: impl Into<Literal>) -> Condition {
        Condition::new(
            self.name.clone(),
            Operator::Between,
            vec![low.into(), high.into()],
        )
    }
}
