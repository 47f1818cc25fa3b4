//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations.

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Connection shared by every repository
pub type SharedConnection = Arc<Mutex<Connection>>;

impl From<rusqlite::Error> for DomainError {
    fn from(err: rusqlite::Error) -> Self {
        DomainError::Internal(err.to_string())
    }
}

/// Database state wrapper
pub struct DbState {
    conn: SharedConnection,
}

impl DbState {
    pub fn connection(&self) -> SharedConnection {
        Arc::clone(&self.conn)
    }
}

/// Open (or create) the database at `db_path` and migrate it.
///
/// `:memory:` gives a private in-memory database.
pub fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    run_migrations(&conn)?;
    tracing::info!(path = %db_path.display(), "database ready");

    Ok(DbState {
        conn: Arc::new(Mutex::new(conn)),
    })
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS boards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS lists (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            board_id INTEGER NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS cards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            list_id INTEGER NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_lists_board ON lists(board_id, position);
        CREATE INDEX IF NOT EXISTS idx_cards_list ON cards(list_id, position);",
    )?;

    // Cards gained descriptions after the first release
    if !column_exists(conn, "cards", "description")? {
        conn.execute("ALTER TABLE cards ADD COLUMN description TEXT", [])?;
    }

    Ok(())
}
