//! Async SQLite executor using a dedicated background thread.
//!
//! All statements are sent to a single background thread via channel and
//! executed in FIFO order. SQLite serializes writes anyway, so one thread
//! is optimal, and callers await results without blocking the Tokio
//! runtime.
//!
//! Only SQL should run inside `call()` - no file I/O, no network, no
//! heavy computation. Those block the single DB thread and starve every
//! other statement.

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

/// Convert a tokio_rusqlite::Error to DatabaseError.
fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => {
            DatabaseError::Connection("Connection closed".to_string())
        }
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Async SQLite database with a dedicated executor thread.
///
/// Cheap to clone; clones share the same executor thread.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    path: String,
}

impl AsyncDatabase {
    /// Open a database at the given path.
    ///
    /// Creates the file and parent directory if needed, enables WAL mode
    /// and foreign keys, and runs any pending migrations before returning.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();

        info!(path = %path_str, "Opening quote database");

        let conn = Connection::open(&path_str)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA cache_size = -64000;
                PRAGMA temp_store = MEMORY;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        conn.call(|conn| {
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        info!(path = %path_str, "Quote database initialized with WAL mode");

        Ok(Self {
            conn,
            path: path_str,
        })
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        conn.call(|conn| {
            // WAL does not apply to in-memory databases
            conn.execute_batch(
                "
                PRAGMA foreign_keys = ON;
                PRAGMA temp_store = MEMORY;
                ",
            )?;
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        Ok(Self {
            conn,
            path: ":memory:".to_string(),
        })
    }

    /// Execute a closure on the database connection.
    ///
    /// The closure runs on the dedicated SQLite thread with a mutable
    /// connection, so it may open transactions. The caller's async task
    /// is parked (not blocked) until the result is ready.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&mut rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Wrap our DatabaseResult inside the tokio_rusqlite Ok variant so
        // both error channels survive the thread hop.
        let outer = self.conn.call(move |conn| Ok(f(conn))).await;

        match outer {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Get the database file path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check that the executor thread is alive and answering queries.
    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.call(|conn| {
            conn.execute_batch("SELECT 1")?;
            Ok(())
        })
        .await?;
        debug!("Database health check passed");
        Ok(())
    }

    /// Close the database connection, waiting for pending statements.
    pub async fn close(self) -> DatabaseResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to close database: {:?}", e)))?;
        info!(path = %self.path, "Database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_runs_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let db = AsyncDatabase::open(&db_path).await.unwrap();
        assert!(db.health_check().await.is_ok());

        let version: i32 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_in_memory_has_schema() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();

        let count: i64 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM quotes", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(db.path(), ":memory:");
    }

    #[tokio::test]
    async fn test_call_supports_transactions() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();

        db.call(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO app_settings (key, value, updated_at) VALUES ('a', '1', 0)",
                [],
            )?;
            tx.execute(
                "INSERT INTO app_settings (key, value, updated_at) VALUES ('b', '2', 0)",
                [],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .unwrap();

        let count: i64 = db
            .call(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM app_settings", [], |row| row.get(0))?)
            })
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_concurrent_calls_serialize() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();

        db.call(|conn| {
            conn.execute(
                "INSERT INTO app_settings (key, value, updated_at) VALUES ('counter', '0', 0)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let mut handles = vec![];
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.call(|conn| {
                    conn.execute(
                        "UPDATE app_settings
                         SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)
                         WHERE key = 'counter'",
                        [],
                    )?;
                    Ok(())
                })
                .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let value: String = db
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT value FROM app_settings WHERE key = 'counter'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(value, "10");
    }
}
