// SPDX-FileCopyrightText: 2026 Kontor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async SQLite database handle.
//!
//! Wraps a `tokio_rusqlite::Connection` so query modules can run blocking
//! rusqlite work off the async runtime via `connection().call(...)`.
//! Opening runs migrations and applies the configured journal mode.

use std::path::Path;

use kontor_config::model::StorageConfig;
use kontor_core::KontorError;
use tracing::info;

use crate::migrations::run_migrations;

/// Convert a tokio_rusqlite error into the workspace storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> KontorError {
    KontorError::Storage { source: Box::new(e) }
}

/// Shared handle to the Kontor SQLite database.
///
/// Cheap to clone; all clones share one background connection task.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at the configured path, apply
    /// pragmas, and run pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, KontorError> {
        if let Some(parent) = Path::new(&config.database_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| KontorError::Storage { source: Box::new(e) })?;
        }

        let conn = tokio_rusqlite::Connection::open(&config.database_path)
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::Error(e)))?;

        let wal = config.wal_mode;
        conn.call(move |conn| {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            run_migrations(conn).map_err(|e| rusqlite::Error::ModuleError(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        info!(path = config.database_path.as_str(), "database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database with the full schema applied. Test use.
    pub async fn open_in_memory() -> Result<Self, KontorError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::Error(e)))?;
        conn.call(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            run_migrations(conn).map_err(|e| rusqlite::Error::ModuleError(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    /// Access the underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing outstanding work.
    pub async fn close(self) -> Result<(), KontorError> {
        self.conn
            .close()
            .await
            .map_err(|e| KontorError::Storage { source: Box::new(e) })
    }
}
