// SPDX-FileCopyrightText: 2026 Ravyn Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread, which
//! serializes writers. Do NOT create additional Connection instances for writes.

use ravyn_core::RavynError;
use tracing::debug;

use crate::migrations::run_migrations;

/// PRAGMAs applied to every connection.
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;";

/// Handle to the gateway database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Opens the database in WAL mode, creating it and applying migrations as needed.
    pub async fn open(path: &str) -> Result<Self, RavynError> {
        Self::open_with(path, true).await
    }

    /// Opens the database, choosing the journal mode.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, RavynError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RavynError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations run on a short-lived connection that is closed before
        // the writer connection opens.
        let migrate_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), RavynError> {
            let mut conn = rusqlite::Connection::open(&migrate_path).map_err(storage_err)?;
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.pragma_update(None, "journal_mode", journal)
                .map_err(storage_err)?;
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| RavynError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(storage_err)?;
        conn.call(|conn| conn.execute_batch(CONNECTION_PRAGMAS))
            .await
            .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The serialized connection every query goes through.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL and closes the connection.
    pub async fn close(self) -> Result<(), RavynError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Truncating WAL checkpoint.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), RavynError> {
    conn.call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
        .await
        .map_err(map_tr_err)
}

/// Convert a tokio-rusqlite error into RavynError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RavynError {
    RavynError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(e: rusqlite::Error) -> RavynError {
    RavynError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_schema_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/ravyn.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<_, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(map_tr_err)
            .unwrap();

        for table in ["artifacts", "conversation_entries", "interactions", "settings", "users"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}: {tables:?}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ravyn.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)))
            .await
            .map_err(map_tr_err)
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }
}
