//! Sibling Positioning Operations
//!
//! Operations for managing positions within one parent. Positions are
//! 1-based and kept contiguous by `reindex`.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::db::now_millis;
use super::sibling_repo::{children, require_parent, SiblingRepository, SiblingTable};
use crate::domain::{DomainError, DomainResult, PositionUpdate};

/// Trait for sibling positioning operations
#[async_trait]
pub trait SiblingPositioningOperations<T> {
    /// Position a new child of `parent_id` would get (used in create)
    async fn next_position(&self, parent_id: u32) -> DomainResult<u32>;

    /// Renumber the children of a parent to 1..n, keeping their order
    async fn reindex(&self, parent_id: u32) -> DomainResult<()>;

    /// Overwrite the positions of the listed children and return the
    /// resulting sequence. Applying the same payload twice changes nothing.
    async fn bulk_set_positions(
        &self,
        parent_id: u32,
        updates: &[PositionUpdate],
    ) -> DomainResult<Vec<T>>;
}

pub(super) fn next_position<T: SiblingTable>(conn: &Connection, parent_id: u32) -> DomainResult<u32> {
    let sql = format!(
        "SELECT COALESCE(MAX(position), 0) + 1 FROM {} WHERE {} = ?1",
        T::TABLE,
        T::PARENT_COLUMN
    );
    let next = conn.query_row(&sql, params![parent_id], |row| row.get(0))?;
    Ok(next)
}

pub(super) fn reindex<T: SiblingTable>(conn: &Connection, parent_id: u32) -> DomainResult<()> {
    let ids: Vec<u32> = {
        let sql = format!(
            "SELECT id FROM {} WHERE {} = ?1 ORDER BY position, id",
            T::TABLE,
            T::PARENT_COLUMN
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params![parent_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<u32>>>()?;
        ids
    };

    let sql = format!(
        "UPDATE {} SET position = ?1, updated_at = ?2 WHERE id = ?3 AND position != ?1",
        T::TABLE
    );
    let now = now_millis();
    for (index, id) in ids.iter().enumerate() {
        conn.execute(&sql, params![index as u32 + 1, now, *id])?;
    }
    Ok(())
}

pub(super) fn apply_positions<T: SiblingTable>(
    conn: &Connection,
    parent_id: u32,
    updates: &[PositionUpdate],
) -> DomainResult<()> {
    require_parent::<T>(conn, parent_id)?;

    let select = format!(
        "SELECT position FROM {} WHERE id = ?1 AND {} = ?2",
        T::TABLE,
        T::PARENT_COLUMN
    );
    let update = format!("UPDATE {} SET position = ?1, updated_at = ?2 WHERE id = ?3", T::TABLE);
    let now = now_millis();

    for entry in updates {
        if entry.position == 0 {
            return Err(DomainError::InvalidInput(format!(
                "{} {}: positions start at 1",
                T::NAME,
                entry.id
            )));
        }
        let current: Option<u32> = conn
            .query_row(&select, params![entry.id, parent_id], |row| row.get(0))
            .optional()?;
        match current {
            None => {
                return Err(DomainError::Conflict(format!(
                    "{} {} is not in {} {}",
                    T::NAME,
                    entry.id,
                    T::PARENT_TABLE,
                    parent_id
                )))
            }
            Some(position) if position == entry.position => {}
            Some(_) => {
                conn.execute(&update, params![entry.position, now, entry.id])?;
            }
        }
    }

    reindex::<T>(conn, parent_id)
}

#[async_trait]
impl<T: SiblingTable> SiblingPositioningOperations<T> for SiblingRepository<T> {
    async fn next_position(&self, parent_id: u32) -> DomainResult<u32> {
        let conn = self.conn.lock().await;
        next_position::<T>(&conn, parent_id)
    }

    async fn reindex(&self, parent_id: u32) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        reindex::<T>(&conn, parent_id)
    }

    async fn bulk_set_positions(
        &self,
        parent_id: u32,
        updates: &[PositionUpdate],
    ) -> DomainResult<Vec<T>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        // Dropping the transaction on error rolls every update back
        apply_positions::<T>(&tx, parent_id, updates)?;
        let siblings = children::<T>(&tx, parent_id)?;
        tx.commit()?;

        tracing::debug!(parent_id, count = updates.len(), "{} positions set", T::NAME);
        Ok(siblings)
    }
}
