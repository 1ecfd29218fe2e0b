//! Entity persistence capability.
//!
//! # Responsibility
//! - Describe how an application record maps to one SQLite table.
//! - Provide row-level save/insert/update/delete/exists against a live
//!   connection, so DAOs can run them inside their own transactions.
//!
//! # Invariants
//! - `to_values()` yields exactly one value per entry in `COLUMNS`, in order.
//! - Every `PRIMARY_KEY` column also appears in `COLUMNS`.

pub mod entity;

pub use entity::Model;
