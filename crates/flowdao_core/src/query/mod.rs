//! Statement building on top of raw SQLite.
//!
//! # Responsibility
//! - Express filters as opaque, serializable `Condition` values.
//! - Build select/delete/count statements for one entity table.
//!
//! # Invariants
//! - Statements never interpolate caller values into SQL text.

pub mod condition;
pub mod statement;

pub use condition::{Column, Condition, Literal, Operator};
pub use statement::{Count, Delete, Order, Select};
