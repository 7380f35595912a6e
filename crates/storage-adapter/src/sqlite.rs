//! Desktop adapter backed by the dedicated SQLite executor thread.

use crate::{AdapterResult, DatabaseAdapter, ExecResult, SqlRow, SqlValue, Statement};
use async_trait::async_trait;
use quote_database::AsyncDatabase;
use rusqlite::params_from_iter;
use std::sync::Arc;
use tracing::debug;

/// Adapter for the desktop host.
///
/// Each call is message-passed to the privileged executor thread owned by
/// [`AsyncDatabase`]; the result envelope coming back over the channel is
/// unwrapped into an [`AdapterResult`].
#[derive(Clone)]
pub struct SqliteAdapter {
    db: AsyncDatabase,
}

impl SqliteAdapter {
    pub fn new(db: AsyncDatabase) -> Self {
        Self { db }
    }

    /// The wrapped database handle.
    pub fn database(&self) -> &AsyncDatabase {
        &self.db
    }
}

fn bind_params(params: Vec<SqlValue>) -> Vec<rusqlite::types::Value> {
    params.into_iter().map(rusqlite::types::Value::from).collect()
}

fn run_statement(conn: &rusqlite::Connection, sql: &str, params: Vec<SqlValue>) -> rusqlite::Result<ExecResult> {
    let rows_affected = {
        let mut stmt = conn.prepare_cached(sql)?;
        stmt.execute(params_from_iter(bind_params(params)))? as u64
    };
    Ok(ExecResult {
        last_insert_id: conn.last_insert_rowid(),
        rows_affected,
    })
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> AdapterResult<ExecResult> {
        let sql = sql.to_string();
        let result = self
            .db
            .call(move |conn| Ok(run_statement(conn, &sql, params)?))
            .await?;
        Ok(result)
    }

    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> AdapterResult<Vec<SqlRow>> {
        let sql = sql.to_string();
        let rows = self
            .db
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(&sql)?;
                let columns: Arc<Vec<String>> = Arc::new(
                    stmt.column_names().iter().map(|c| c.to_string()).collect(),
                );
                let mut rows = stmt.query(params_from_iter(bind_params(params)))?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut values = Vec::with_capacity(columns.len());
                    for i in 0..columns.len() {
                        values.push(SqlValue::from(row.get_ref(i)?));
                    }
                    out.push(SqlRow::new(columns.clone(), values));
                }
                Ok(out)
            })
            .await?;
        Ok(rows)
    }

    async fn execute_transaction(
        &self,
        statements: Vec<Statement>,
    ) -> AdapterResult<Vec<ExecResult>> {
        let count = statements.len();
        let results = self
            .db
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut results = Vec::with_capacity(statements.len());
                for st in statements {
                    results.push(run_statement(&tx, &st.sql, st.params)?);
                }
                tx.commit()?;
                Ok(results)
            })
            .await?;
        debug!(statements = count, "Transaction committed");
        Ok(results)
    }
}
