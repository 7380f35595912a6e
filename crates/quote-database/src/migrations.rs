//! Database migrations.
//!
//! Migrations are additive-only, run in order, and tracked in the
//! `migrations` table. New columns are nullable and guarded by an
//! existence check before `ALTER TABLE`, so re-running any migration is
//! a no-op.

use crate::DatabaseResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_initial_schema(conn)?;
    }
    if current_version < 2 {
        migrate_v2_sent_at(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

/// Check whether a column already exists on a table.
///
/// Used to keep additive migrations idempotent across partially-applied
/// databases.
pub fn column_exists(conn: &Connection, table: &str, column: &str) -> DatabaseResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|n| n == column))
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: Initial schema - agents, quotes, illustrations, delivery queues,
/// app settings. Timestamps are Unix seconds throughout.
fn migrate_v1_initial_schema(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: initial schema");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS agents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            agency TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS quotes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company TEXT NOT NULL,
            insured_age INTEGER NOT NULL,
            insured_sex TEXT NOT NULL,
            insured_smoker INTEGER NOT NULL DEFAULT 0,
            payor_age INTEGER,
            payor_sex TEXT,
            payor_smoker INTEGER,
            product TEXT NOT NULL,
            payment_mode TEXT NOT NULL,
            face_amount REAL NOT NULL,
            premium REAL,
            status TEXT NOT NULL DEFAULT 'draft',
            agent_id INTEGER REFERENCES agents(id) ON DELETE SET NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_quotes_status
            ON quotes(status);
        CREATE INDEX IF NOT EXISTS idx_quotes_agent_id
            ON quotes(agent_id);
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS illustrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quote_id INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
            pdf_path TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_illustrations_quote_id
            ON illustrations(quote_id);
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pdf_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quote_id INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
            agent_id INTEGER REFERENCES agents(id) ON DELETE SET NULL,
            pdf_path TEXT NOT NULL,
            recipient_email TEXT NOT NULL,
            recipient_name TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            death_benefit REAL,
            monthly_payment REAL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_pdf_queue_status
            ON pdf_queue(status);
        CREATE INDEX IF NOT EXISTS idx_pdf_queue_quote_id
            ON pdf_queue(quote_id);
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS quick_quote_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quote_id INTEGER REFERENCES quotes(id) ON DELETE SET NULL,
            request_data TEXT NOT NULL,
            pdf_path TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            backend_id INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_quick_quote_queue_status
            ON quick_quote_queue(status);
        CREATE INDEX IF NOT EXISTS idx_quick_quote_queue_backend_id
            ON quick_quote_queue(backend_id);
        ",
    )?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        ",
    )?;

    record_migration(conn, 1, "initial_schema")?;
    Ok(())
}

/// V2: sent_at timestamps on both delivery queues.
fn migrate_v2_sent_at(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: sent_at columns");

    if !column_exists(conn, "pdf_queue", "sent_at")? {
        conn.execute("ALTER TABLE pdf_queue ADD COLUMN sent_at INTEGER", [])?;
    }
    if !column_exists(conn, "quick_quote_queue", "sent_at")? {
        conn.execute(
            "ALTER TABLE quick_quote_queue ADD COLUMN sent_at INTEGER",
            [],
        )?;
    }

    record_migration(conn, 2, "sent_at")?;
    Ok(())
}
