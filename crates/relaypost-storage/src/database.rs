// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use relaypost_core::RelaypostError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database. Cheap to clone via `connection()`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if necessary) the database at `path`, applies
    /// PRAGMAs, and runs all pending migrations.
    pub async fn open(path: &str) -> Result<Self, RelaypostError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RelaypostError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path).await.map_err(map_tr_err)?;

        conn.call(|conn| {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The single background-thread connection all queries go through.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the connection, flushing pending writes.
    pub async fn close(self) -> Result<(), RelaypostError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Converts a tokio-rusqlite error into the workspace storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> RelaypostError {
    RelaypostError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/dir/test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // Settings row is seeded by the migration.
        let count: i64 = db
            .connection()
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();

        // Second open must not re-run migrations destructively.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        db.close().await.unwrap();
    }
}
