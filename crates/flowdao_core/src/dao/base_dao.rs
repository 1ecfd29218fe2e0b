//! Entity-generic DAO contract.

use super::DaoResult;
use crate::model::Model;
use crate::query::Condition;

/// CRUD and count operations for one entity type.
///
/// Condition slices combine with `AND`; an empty slice means "no filter".
pub trait BaseDao<E: Model> {
    /// Returns every stored row.
    fn query_all(&self) -> DaoResult<Vec<E>>;
    /// Returns the first row matching all conditions.
    fn query_single(&self, conditions: &[Condition]) -> DaoResult<Option<E>>;
    /// Returns every row matching all conditions.
    fn query(&self, conditions: &[Condition]) -> DaoResult<Vec<E>>;
    /// Deletes every row matching all conditions.
    fn delete(&self, conditions: &[Condition]) -> DaoResult<()>;
    /// Deletes one entity. `None` is a no-op that reports `true`.
    fn delete_entity(&self, entity: Option<&E>) -> DaoResult<bool>;
    /// Deletes each entity in order. `None` is a no-op.
    fn delete_entities(&self, entities: Option<&[E]>) -> DaoResult<()>;
    /// Deletes every row of the entity table.
    fn delete_all(&self) -> DaoResult<()>;
    /// Counts rows matching all conditions.
    fn query_count(&self, conditions: &[Condition]) -> DaoResult<i64>;
    /// Counts every row.
    fn count(&self) -> DaoResult<i64> {
        self.query_count(&[])
    }
    /// Saves one entity. `None` is a no-op that reports `false`.
    fn save_entity(&self, entity: Option<&E>) -> DaoResult<bool>;
    /// Saves each entity in order and returns how many were saved.
    /// `None` or an empty slice is a no-op.
    fn save_entities(&self, entities: Option<&[E]>) -> DaoResult<usize>;
}
