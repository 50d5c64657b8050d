#![forbid(unsafe_code)]

mod conflicts;
mod error;
mod import;
mod ops_history;
mod tasks;
mod types;

pub use error::StoreError;
pub use types::*;

use rusqlite::{Connection, Transaction, params};
use std::path::{Path, PathBuf};

const TASK_SEQ_COUNTER: &str = "task_seq";

/// Single-process task store. Every mutating call runs inside one
/// committed rusqlite transaction, so no mutation becomes visible to a
/// reader without having reached storage first.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;
        let db_path = storage_dir.join("taskdeck.db");
        let conn = Connection::open(db_path)?;
        let store = Self { conn, storage_dir };
        store.migrate()?;
        Ok(store)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS meta (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS counters (
              name TEXT PRIMARY KEY,
              value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              description TEXT,
              status TEXT NOT NULL,
              priority TEXT NOT NULL,
              depends_on_json TEXT NOT NULL,
              files_to_edit_json TEXT NOT NULL,
              related_kb_json TEXT NOT NULL,
              estimated_hours REAL,
              actual_hours REAL,
              created_at_ms INTEGER NOT NULL,
              started_at_ms INTEGER,
              completed_at_ms INTEGER
            );

            CREATE TABLE IF NOT EXISTS ops_history (
              seq INTEGER PRIMARY KEY AUTOINCREMENT,
              ts_ms INTEGER NOT NULL,
              operation_type TEXT NOT NULL,
              description TEXT NOT NULL,
              operation_data_json TEXT NOT NULL,
              undone INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status);
            "#,
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
            params!["schema_version", "v1"],
        )?;
        Ok(())
    }

    /// Current value of the task id counter, without consuming it. Used
    /// to compute the ids a batch would receive before anything commits.
    pub(crate) fn counter_value(&self, name: &str) -> Result<i64, StoreError> {
        use rusqlite::OptionalExtension;
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM counters WHERE name=?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .unwrap_or(0))
    }
}

pub(crate) fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis() as i64
}

pub(crate) fn next_counter_tx(tx: &Transaction<'_>, name: &str) -> Result<i64, StoreError> {
    use rusqlite::OptionalExtension;
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE name=?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(name, value) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET value=excluded.value
        "#,
        params![name, next],
    )?;
    Ok(next)
}
