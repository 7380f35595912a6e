//! SQLite storage layer for the Coverdesk quoting subsystem.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Database migrations (additive-only, tracked in a `migrations` table)
//! - Model types for quotes, agents, illustrations and the delivery queues
//! - The delivery-status state machine shared by every queue table
//!
//! # Architecture
//!
//! All SQL runs on a single dedicated thread owned by [`AsyncDatabase`].
//! Statements are sent through a channel and executed in FIFO order, which
//! keeps the Tokio runtime free and gives SQLite the single writer it
//! wants anyway.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let n = db.call(|conn| {
//!     Ok(conn.execute("DELETE FROM pdf_queue WHERE id = ?1", [42])?)
//! }).await?;
//! ```

mod error;
mod executor;
mod migrations;
mod models;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{column_exists, run_migrations};
pub use models::*;

/// Current time as Unix seconds, the timestamp representation used by
/// every table in this schema.
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
