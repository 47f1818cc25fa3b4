//! Sibling Repository - Core CRUD Operations
//!
//! One SQLite-backed repository serves both lists (children of boards) and
//! cards (children of lists). Specialized operations are in separate modules:
//! - sibling_hierarchy: children and cross-parent moves
//! - sibling_positioning: position management and bulk updates

use std::marker::PhantomData;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::db::{now_millis, SharedConnection};
use super::sibling_positioning::next_position;
use super::traits::Repository;
use crate::domain::{Card, DomainError, DomainResult, List, Sibling};

/// Table layout of a sibling entity
pub trait SiblingTable: Sibling + Serialize + 'static {
    /// Singular name used in messages
    const NAME: &'static str;
    const TABLE: &'static str;
    const PARENT_TABLE: &'static str;
    const PARENT_COLUMN: &'static str;
    /// Column list matching `from_row`
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn insert(&self, conn: &Connection, position: u32, now: i64) -> rusqlite::Result<usize>;

    /// Write the editable fields; returns the number of rows changed
    fn update_fields(&self, conn: &Connection, now: i64) -> rusqlite::Result<usize>;

    fn title(&self) -> &str;
}

impl SiblingTable for List {
    const NAME: &'static str = "list";
    const TABLE: &'static str = "lists";
    const PARENT_TABLE: &'static str = "boards";
    const PARENT_COLUMN: &'static str = "board_id";
    const COLUMNS: &'static str = "id, board_id, title, position, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(List {
            id: row.get(0)?,
            board_id: row.get(1)?,
            title: row.get(2)?,
            position: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn insert(&self, conn: &Connection, position: u32, now: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO lists (board_id, title, position, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![self.board_id, self.title, position, now],
        )
    }

    fn update_fields(&self, conn: &Connection, now: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE lists SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![self.title, now, self.id],
        )
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl SiblingTable for Card {
    const NAME: &'static str = "card";
    const TABLE: &'static str = "cards";
    const PARENT_TABLE: &'static str = "lists";
    const PARENT_COLUMN: &'static str = "list_id";
    const COLUMNS: &'static str = "id, list_id, title, description, position, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Card {
            id: row.get(0)?,
            list_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            position: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn insert(&self, conn: &Connection, position: u32, now: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO cards (list_id, title, description, position, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.list_id, self.title, self.description, position, now],
        )
    }

    fn update_fields(&self, conn: &Connection, now: i64) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE cards SET title = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![self.title, self.description, now, self.id],
        )
    }

    fn title(&self) -> &str {
        &self.title
    }
}

/// SQLite implementation of the list and card repositories
pub struct SiblingRepository<T> {
    pub(super) conn: SharedConnection,
    _marker: PhantomData<fn() -> T>,
}

impl<T: SiblingTable> SiblingRepository<T> {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            conn,
            _marker: PhantomData,
        }
    }
}

pub(super) fn find<T: SiblingTable>(conn: &Connection, id: u32) -> DomainResult<Option<T>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", T::COLUMNS, T::TABLE);
    let found = conn.query_row(&sql, params![id], T::from_row).optional()?;
    Ok(found)
}

pub(super) fn require<T: SiblingTable>(conn: &Connection, id: u32) -> DomainResult<T> {
    find(conn, id)?.ok_or_else(|| DomainError::NotFound(format!("{} {}", T::NAME, id)))
}

pub(super) fn require_parent<T: SiblingTable>(conn: &Connection, parent_id: u32) -> DomainResult<()> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?1", T::PARENT_TABLE);
    let exists = conn
        .query_row(&sql, params![parent_id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(DomainError::NotFound(format!("{} {}", T::PARENT_TABLE, parent_id)));
    }
    Ok(())
}

/// Children of `parent_id` ordered by position
pub(super) fn children<T: SiblingTable>(conn: &Connection, parent_id: u32) -> DomainResult<Vec<T>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1 ORDER BY position, id",
        T::COLUMNS,
        T::TABLE,
        T::PARENT_COLUMN
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![parent_id], T::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn check_title<T: SiblingTable>(entity: &T) -> DomainResult<()> {
    if entity.title().trim().is_empty() {
        return Err(DomainError::InvalidInput(format!("{} title is empty", T::NAME)));
    }
    Ok(())
}

#[async_trait]
impl<T: SiblingTable> Repository<T> for SiblingRepository<T> {
    /// Insert under `entity.parent_id()`.
    ///
    /// Position 0 appends; an explicit position shifts the siblings at or
    /// after it and is clamped to one past the end.
    async fn create(&self, entity: &T) -> DomainResult<T> {
        check_title(entity)?;
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let parent_id = entity.parent_id();
        require_parent::<T>(&tx, parent_id)?;
        let next = next_position::<T>(&tx, parent_id)?;
        let position = match entity.position() {
            0 => next,
            requested => requested.min(next),
        };
        if position < next {
            let sql = format!(
                "UPDATE {} SET position = position + 1 WHERE {} = ?1 AND position >= ?2",
                T::TABLE,
                T::PARENT_COLUMN
            );
            tx.execute(&sql, params![parent_id, position])?;
        }

        entity.insert(&tx, position, now_millis())?;
        let id = tx.last_insert_rowid() as u32;
        let created = require::<T>(&tx, id)?;
        tx.commit()?;

        tracing::debug!(id, parent_id, position, "{} created", T::NAME);
        Ok(created)
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<T>> {
        let conn = self.conn.lock().await;
        find(&conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<T>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}, position, id",
            T::COLUMNS,
            T::TABLE,
            T::PARENT_COLUMN
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], T::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Title (and description) only; parent and position change through moves
    async fn update(&self, entity: &T) -> DomainResult<T> {
        check_title(entity)?;
        let conn = self.conn.lock().await;
        if entity.update_fields(&conn, now_millis())? == 0 {
            return Err(DomainError::NotFound(format!("{} {}", T::NAME, entity.id())));
        }
        require(&conn, entity.id())
    }

    /// Siblings keep their positions; the client renumbers
    async fn delete(&self, id: u32) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let sql = format!("DELETE FROM {} WHERE id = ?1", T::TABLE);
        if conn.execute(&sql, params![id])? == 0 {
            return Err(DomainError::NotFound(format!("{} {}", T::NAME, id)));
        }
        tracing::info!(id, "{} deleted", T::NAME);
        Ok(())
    }
}
