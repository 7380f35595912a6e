//! The adapter contract shared by every host environment.

use crate::{AdapterResult, SqlRow, SqlValue};
use async_trait::async_trait;

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Rowid assigned by the last INSERT on this connection.
    pub last_insert_id: i64,
    /// Number of rows changed by the statement.
    pub rows_affected: u64,
}

/// One parameterized statement, used by transactional batches.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Parameterized SQL access, identical on every host.
///
/// Implementations are selected at construction time and injected where
/// needed; callers never branch on the environment.
#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Run a mutating statement.
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> AdapterResult<ExecResult>;

    /// Run a query and collect all result rows.
    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> AdapterResult<Vec<SqlRow>>;

    /// Run a batch of statements atomically.
    ///
    /// Either every statement commits or none does; the per-statement
    /// results are returned in order.
    async fn execute_transaction(
        &self,
        statements: Vec<Statement>,
    ) -> AdapterResult<Vec<ExecResult>>;
}
