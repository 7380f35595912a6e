//! Capability gate for hosts without a local database engine.

use crate::{
    AdapterError, AdapterResult, DatabaseAdapter, ExecResult, SqlRow, SqlValue, Statement,
};
use async_trait::async_trait;
use tracing::warn;

/// Adapter for hosts where no SQLite engine is available (e.g. the quoting
/// UI running in a plain browser). Every call fails immediately; the sync
/// subsystem only runs on the desktop host.
pub struct UnsupportedAdapter {
    environment: String,
}

impl UnsupportedAdapter {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
        }
    }

    fn unsupported(&self) -> AdapterError {
        warn!(environment = %self.environment, "Database call on unsupported host");
        AdapterError::Unsupported {
            environment: self.environment.clone(),
        }
    }
}

#[async_trait]
impl DatabaseAdapter for UnsupportedAdapter {
    async fn execute(&self, _sql: &str, _params: Vec<SqlValue>) -> AdapterResult<ExecResult> {
        Err(self.unsupported())
    }

    async fn query(&self, _sql: &str, _params: Vec<SqlValue>) -> AdapterResult<Vec<SqlRow>> {
        Err(self.unsupported())
    }

    async fn execute_transaction(
        &self,
        _statements: Vec<Statement>,
    ) -> AdapterResult<Vec<ExecResult>> {
        Err(self.unsupported())
    }
}
