//! Sibling Hierarchy Operations
//!
//! Parent-child queries and moving an entity between parents.

use async_trait::async_trait;
use rusqlite::params;

use super::db::now_millis;
use super::sibling_positioning::reindex;
use super::sibling_repo::{children, require, require_parent, SiblingRepository, SiblingTable};
use crate::domain::{DomainError, DomainResult};

/// Trait for sibling hierarchy operations
#[async_trait]
pub trait SiblingHierarchyOperations<T> {
    /// Children of a parent, ordered by position
    async fn children(&self, parent_id: u32) -> DomainResult<Vec<T>>;

    /// Move `id` from `source_parent_id` to `new_order` in `dest_parent_id`.
    ///
    /// Both parents end up numbered 1..n. Fails with `Conflict` when the
    /// entity is no longer under `source_parent_id`.
    async fn move_to(
        &self,
        id: u32,
        source_parent_id: u32,
        dest_parent_id: u32,
        new_order: u32,
    ) -> DomainResult<T>;
}

#[async_trait]
impl<T: SiblingTable> SiblingHierarchyOperations<T> for SiblingRepository<T> {
    async fn children(&self, parent_id: u32) -> DomainResult<Vec<T>> {
        let conn = self.conn.lock().await;
        require_parent::<T>(&conn, parent_id)?;
        children::<T>(&conn, parent_id)
    }

    async fn move_to(
        &self,
        id: u32,
        source_parent_id: u32,
        dest_parent_id: u32,
        new_order: u32,
    ) -> DomainResult<T> {
        if new_order == 0 {
            return Err(DomainError::InvalidInput("positions start at 1".to_string()));
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let entity = require::<T>(&tx, id)?;
        if entity.parent_id() != source_parent_id {
            return Err(DomainError::Conflict(format!(
                "{} {} is in {} {}, not {}",
                T::NAME,
                id,
                T::PARENT_TABLE,
                entity.parent_id(),
                source_parent_id
            )));
        }
        require_parent::<T>(&tx, dest_parent_id)?;

        // Close the gap in the source
        let close = format!(
            "UPDATE {} SET position = position - 1 WHERE {} = ?1 AND position > ?2",
            T::TABLE,
            T::PARENT_COLUMN
        );
        tx.execute(&close, params![source_parent_id, entity.position()])?;

        // Open a slot in the destination
        let open = format!(
            "UPDATE {} SET position = position + 1 WHERE {} = ?1 AND position >= ?2 AND id != ?3",
            T::TABLE,
            T::PARENT_COLUMN
        );
        tx.execute(&open, params![dest_parent_id, new_order, id])?;

        let place = format!(
            "UPDATE {} SET {} = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
            T::TABLE,
            T::PARENT_COLUMN
        );
        tx.execute(&place, params![dest_parent_id, new_order, now_millis(), id])?;

        reindex::<T>(&tx, source_parent_id)?;
        if dest_parent_id != source_parent_id {
            reindex::<T>(&tx, dest_parent_id)?;
        }

        let moved = require::<T>(&tx, id)?;
        tx.commit()?;

        tracing::info!(
            id,
            from = source_parent_id,
            to = dest_parent_id,
            position = moved.position(),
            "{} moved",
            T::NAME
        );
        Ok(moved)
    }
}
