//! CRUD and queue services over the local quote store.
//!
//! Every service holds an injected [`storage_adapter::DatabaseAdapter`]
//! and speaks parameterized SQL through it; the adapter decides whether a
//! real engine exists on this host. Status writes on the delivery queues
//! go through the central state machine in `quote-database` - there is no
//! way to write an arbitrary status string from a call site.

mod agents;
mod error;
mod illustrations;
mod maintenance;
mod pdf_queue;
mod quick_quote_queue;
mod quotes;
mod settings;

pub use agents::AgentService;
pub use error::{ServiceError, ServiceResult};
pub use illustrations::IllustrationService;
pub use maintenance::MaintenanceService;
pub use pdf_queue::{EnqueuePdf, PdfQueueService};
pub use quick_quote_queue::QuickQuoteQueueService;
pub use quotes::QuoteService;
pub use settings::SettingsService;

#[cfg(test)]
pub(crate) mod test_support {
    use quote_database::AsyncDatabase;
    use std::sync::Arc;
    use storage_adapter::{DatabaseAdapter, SqliteAdapter};

    pub async fn memory_adapter() -> Arc<dyn DatabaseAdapter> {
        let db = AsyncDatabase::open_in_memory().await.unwrap();
        Arc::new(SqliteAdapter::new(db))
    }
}
