//! Board Repository
//!
//! SQLite-backed CRUD for boards. Deleting a board cascades to its lists
//! and their cards.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::db::{now_millis, SharedConnection};
use super::traits::Repository;
use crate::domain::{Board, DomainError, DomainResult};

pub struct BoardRepository {
    conn: SharedConnection,
}

impl BoardRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

fn row_to_board(row: &Row<'_>) -> rusqlite::Result<Board> {
    Ok(Board {
        id: row.get(0)?,
        title: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn find(conn: &Connection, id: u32) -> DomainResult<Option<Board>> {
    let board = conn
        .query_row(
            "SELECT id, title, created_at FROM boards WHERE id = ?1",
            params![id],
            row_to_board,
        )
        .optional()?;
    Ok(board)
}

fn check_title(title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::InvalidInput("board title is empty".to_string()));
    }
    Ok(())
}

#[async_trait]
impl Repository<Board> for BoardRepository {
    async fn create(&self, entity: &Board) -> DomainResult<Board> {
        check_title(&entity.title)?;
        let conn = self.conn.lock().await;

        conn.execute(
            "INSERT INTO boards (title, created_at) VALUES (?1, ?2)",
            params![entity.title, now_millis()],
        )?;
        let id = conn.last_insert_rowid() as u32;
        find(&conn, id)?.ok_or_else(|| DomainError::Internal(format!("board {} vanished after insert", id)))
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<Board>> {
        let conn = self.conn.lock().await;
        find(&conn, id)
    }

    async fn list(&self) -> DomainResult<Vec<Board>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT id, title, created_at FROM boards ORDER BY id")?;
        let boards = stmt
            .query_map([], row_to_board)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(boards)
    }

    async fn update(&self, entity: &Board) -> DomainResult<Board> {
        check_title(&entity.title)?;
        let conn = self.conn.lock().await;

        let changed = conn.execute(
            "UPDATE boards SET title = ?1 WHERE id = ?2",
            params![entity.title, entity.id],
        )?;
        if changed == 0 {
            return Err(DomainError::NotFound(format!("board {}", entity.id)));
        }
        find(&conn, entity.id)?.ok_or_else(|| DomainError::NotFound(format!("board {}", entity.id)))
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let conn = self.conn.lock().await;
        let deleted = conn.execute("DELETE FROM boards WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DomainError::NotFound(format!("board {}", id)));
        }
        tracing::info!(board_id = id, "board deleted");
        Ok(())
    }
}
