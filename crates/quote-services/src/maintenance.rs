//! Full local reset.

use crate::ServiceResult;
use quote_database::ResetCounts;
use std::sync::Arc;
use storage_adapter::{DatabaseAdapter, Statement};
use tracing::info;

/// Destructive maintenance operations.
pub struct MaintenanceService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl MaintenanceService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    /// Wipe quotes, illustrations and both delivery queues in one
    /// transaction. Children are deleted before their parents so the
    /// reported counts reflect actual rows, not cascade side effects.
    /// Any failure rolls the whole reset back.
    pub async fn reset_all(&self) -> ServiceResult<ResetCounts> {
        let results = self
            .adapter
            .execute_transaction(vec![
                Statement::new("DELETE FROM pdf_queue", vec![]),
                Statement::new("DELETE FROM quick_quote_queue", vec![]),
                Statement::new("DELETE FROM illustrations", vec![]),
                Statement::new("DELETE FROM quotes", vec![]),
            ])
            .await?;

        let counts = ResetCounts {
            pdf_queue: results[0].rows_affected,
            quick_quote_queue: results[1].rows_affected,
            illustrations: results[2].rows_affected,
            quotes: results[3].rows_affected,
        };
        info!(
            quotes = counts.quotes,
            illustrations = counts.illustrations,
            pdf_queue = counts.pdf_queue,
            quick_quote_queue = counts.quick_quote_queue,
            "Local data reset"
        );
        Ok(counts)
    }
}
