//! Environment-switching database adapter.
//!
//! Presents one `execute`/`query` contract regardless of host
//! environment. On the desktop host, statements cross into the dedicated
//! SQLite executor thread. On a pure browser host no compatible engine
//! exists, so every call fails with an unsupported-environment error -
//! a deliberate capability gate, not a bug.
//!
//! The implementation is chosen once at construction time and injected as
//! `Arc<dyn DatabaseAdapter>`; call sites never branch on the host.

mod adapter;
mod error;
mod sqlite;
mod unsupported;
mod value;

pub use adapter::{DatabaseAdapter, ExecResult, Statement};
pub use error::{AdapterError, AdapterResult};
pub use sqlite::SqliteAdapter;
pub use unsupported::UnsupportedAdapter;
pub use value::{SqlRow, SqlValue};
